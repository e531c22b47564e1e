//! User subscription attributes.

use serde::{Deserialize, Serialize};

use super::plan_tier::PlanTier;
use crate::domain::foundation::{Timestamp, UserId};

/// An individual login record, joined to billing events by email only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            subscription_plan: None,
            subscription_status: None,
            subscription_id: None,
            current_period_end: None,
        }
    }

    /// Writes the attributes onto this record. Absent optional values keep
    /// what is stored.
    pub fn apply(&mut self, attrs: &SubscriptionAttributes) {
        self.subscription_plan = Some(attrs.plan.clone());
        self.subscription_status = Some(attrs.status.clone());
        if let Some(id) = &attrs.subscription_id {
            self.subscription_id = Some(id.clone());
        }
        if let Some(end) = attrs.current_period_end {
            self.current_period_end = Some(end);
        }
    }
}

/// Subscription values propagated to every user matching a billing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionAttributes {
    /// Lower-cased plan name, e.g. `"pro"`.
    pub plan: String,
    pub status: String,
    pub subscription_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
}

impl SubscriptionAttributes {
    pub fn new(plan: PlanTier, status: impl Into<String>) -> Self {
        Self {
            plan: plan.as_user_plan(),
            status: status.into(),
            subscription_id: None,
            current_period_end: None,
        }
    }

    pub fn with_subscription_id(mut self, id: Option<String>) -> Self {
        self.subscription_id = id;
        self
    }

    pub fn with_period_end(mut self, end: Option<Timestamp>) -> Self {
        self.current_period_end = end;
        self
    }
}
