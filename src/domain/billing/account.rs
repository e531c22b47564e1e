//! Account entity and reconciliation updates.

use serde::{Deserialize, Serialize};

use super::plan_tier::PlanTier;
use crate::domain::foundation::{AccountId, Timestamp};

/// A billing customer entity.
///
/// Created by onboarding; this subsystem only reconciles plan, seats and
/// provider references onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub plan: PlanTier,
    pub seats: i32,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub updated_at: Timestamp,
}

impl Account {
    /// Creates a fresh FREE account with no provider references.
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            plan: PlanTier::Free,
            seats: 0,
            stripe_subscription_id: None,
            stripe_customer_id: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Applies resolved target values.
    ///
    /// Returns true when any field changed. Re-applying the same update is
    /// a no-op, which is what makes duplicate deliveries converge.
    pub fn apply(&mut self, update: &AccountUpdate) -> bool {
        let mut changed = false;

        if self.plan != update.plan {
            self.plan = update.plan;
            changed = true;
        }

        if let Some(seats) = update.seats {
            if self.seats != seats {
                self.seats = seats;
                changed = true;
            }
        }

        match &update.subscription {
            SubscriptionRef::Keep => {}
            SubscriptionRef::Set(id) => {
                if self.stripe_subscription_id.as_deref() != Some(id.as_str()) {
                    self.stripe_subscription_id = Some(id.clone());
                    changed = true;
                }
            }
            SubscriptionRef::Clear => {
                if self.stripe_subscription_id.is_some() {
                    self.stripe_subscription_id = None;
                    changed = true;
                }
            }
        }

        if let Some(customer_id) = &update.customer_id {
            if self.stripe_customer_id.as_ref() != Some(customer_id) {
                self.stripe_customer_id = Some(customer_id.clone());
                changed = true;
            }
        }

        if changed {
            self.updated_at = Timestamp::now();
        }
        changed
    }
}

/// How an update treats the stored external subscription id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubscriptionRef {
    #[default]
    Keep,
    Set(String),
    Clear,
}

impl SubscriptionRef {
    /// `Set` when an id is present, `Keep` otherwise.
    pub fn from_option(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.is_empty() => SubscriptionRef::Set(id),
            _ => SubscriptionRef::Keep,
        }
    }
}

/// Target values resolved from a provider event.
///
/// Values are absolute, never deltas. `None` means "leave as is".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub plan: PlanTier,
    pub seats: Option<i32>,
    pub subscription: SubscriptionRef,
    pub customer_id: Option<String>,
}

impl AccountUpdate {
    pub fn plan(plan: PlanTier) -> Self {
        Self {
            plan,
            seats: None,
            subscription: SubscriptionRef::Keep,
            customer_id: None,
        }
    }

    pub fn with_seats(mut self, seats: Option<i32>) -> Self {
        self.seats = seats;
        self
    }

    pub fn with_subscription(mut self, subscription: SubscriptionRef) -> Self {
        self.subscription = subscription;
        self
    }

    pub fn with_customer(mut self, customer_id: Option<String>) -> Self {
        self.customer_id = customer_id.filter(|id| !id.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(AccountId::new("acc_1").unwrap())
    }

    #[test]
    fn new_account_is_free_without_references() {
        let a = account();
        assert_eq!(a.plan, PlanTier::Free);
        assert_eq!(a.seats, 0);
        assert!(a.stripe_subscription_id.is_none());
    }

    #[test]
    fn apply_sets_all_fields() {
        let mut a = account();
        let update = AccountUpdate::plan(PlanTier::Pro)
            .with_seats(Some(5))
            .with_subscription(SubscriptionRef::Set("sub_1".into()))
            .with_customer(Some("cus_1".into()));

        assert!(a.apply(&update));
        assert_eq!(a.plan, PlanTier::Pro);
        assert_eq!(a.seats, 5);
        assert_eq!(a.stripe_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(a.stripe_customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn reapplying_same_update_is_noop() {
        let mut a = account();
        let update = AccountUpdate::plan(PlanTier::Pro).with_seats(Some(5));

        assert!(a.apply(&update));
        let snapshot = a.clone();
        assert!(!a.apply(&update));
        assert_eq!(a, snapshot);
        assert_eq!(a.seats, 5);
    }

    #[test]
    fn absent_seats_leave_seats_untouched() {
        let mut a = account();
        a.seats = 3;
        a.apply(&AccountUpdate::plan(PlanTier::Pro));
        assert_eq!(a.seats, 3);
    }

    #[test]
    fn clear_removes_subscription_id() {
        let mut a = account();
        a.stripe_subscription_id = Some("sub_1".into());
        let update = AccountUpdate::plan(PlanTier::Free).with_subscription(SubscriptionRef::Clear);

        assert!(a.apply(&update));
        assert!(a.stripe_subscription_id.is_none());
        assert!(!a.apply(&update));
    }

    #[test]
    fn subscription_ref_from_option() {
        assert_eq!(SubscriptionRef::from_option(None), SubscriptionRef::Keep);
        assert_eq!(SubscriptionRef::from_option(Some(String::new())), SubscriptionRef::Keep);
        assert_eq!(
            SubscriptionRef::from_option(Some("sub_1".into())),
            SubscriptionRef::Set("sub_1".into())
        );
    }
}
