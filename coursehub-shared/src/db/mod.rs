/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// The document store built on top of the pool lives in
/// [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
