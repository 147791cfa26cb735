/// Subscription requests and their review workflow
///
/// See [`lifecycle`] for the state machine and the atomic approval batch.

pub mod lifecycle;

pub use lifecycle::SubscriptionManager;
