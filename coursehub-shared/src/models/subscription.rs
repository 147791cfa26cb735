/// Subscription requests
///
/// A learner pays off-platform, uploads a receipt and waits for an
/// administrator to review the request.
///
/// # State Machine
///
/// ```text
/// pending → approved
/// pending → rejected
/// (any)   → deleted   (record removed, not a status)
/// ```

use super::Entity;
use crate::assets::AssetRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SUBSCRIPTIONS: &str = "subscriptions";

/// Review status of a subscription request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Waiting for review
    Pending,

    /// Payment verified, enrollment granted
    Approved,

    /// Payment not accepted
    Rejected,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Approved => "approved",
            SubscriptionStatus::Rejected => "rejected",
        }
    }

    /// Checks if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Approved | SubscriptionStatus::Rejected)
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: SubscriptionStatus) -> bool {
        matches!(
            (self, target),
            (SubscriptionStatus::Pending, SubscriptionStatus::Approved)
                | (SubscriptionStatus::Pending, SubscriptionStatus::Rejected)
        )
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "approved" => Ok(SubscriptionStatus::Approved),
            "rejected" => Ok(SubscriptionStatus::Rejected),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}

/// A learner's request for access to a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,

    /// Requesting user
    pub user_id: Uuid,

    /// Display name at request time
    pub user_name: String,

    /// Email at request time
    pub user_email: String,

    pub course_id: Uuid,

    /// Course title at request time
    pub course_title: String,

    /// Course price at request time, in minor units
    pub price_cents: i64,

    /// Uploaded payment receipt
    pub receipt: AssetRef,

    pub status: SubscriptionStatus,

    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,

    /// Set only on approval
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,

    /// Set only on rejection
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Entity for Subscription {
    const COLLECTION: &'static str = SUBSCRIPTIONS;
}
