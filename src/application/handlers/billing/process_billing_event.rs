//! BillingEventProcessor - the flat branch table behind the webhook router
//! and the dead-letter replay.
//!
//! Each branch is tested against the event type independently and runs in
//! its own failure boundary. A branch never returns an error: whatever went
//! wrong is captured in its [`BranchReport`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::invoice_pipeline::{InvoiceOutcome, InvoicePipeline, PipelineMode};
use super::reconcile_account::{AccountReconciler, ReconcileOutcome};
use super::step_guard::{bounded, step_failure, DEFAULT_STEP_TIMEOUT};
use super::sync_user_subscription::UserSubscriptionSync;
use crate::domain::billing::{
    Account, AccountUpdate, CheckoutSessionObject, InvoiceObject, PipelineStep, PlanResolver,
    PlanTier, StepFailure, StripeEvent, StripeEventType, SubscriptionAttributes,
    SubscriptionObject, SubscriptionRef, WebhookError,
};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::PaymentProvider;

/// Subscription status written to users on checkout completion.
const STATUS_ACTIVE: &str = "active";
/// Subscription status written to users when a subscription is deleted.
const STATUS_CANCELED: &str = "canceled";

/// One independently dispatched handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    CheckoutCompleted,
    SubscriptionChanged,
    SubscriptionDeleted,
    InvoiceFinalized,
}

impl Branch {
    pub const ALL: [Branch; 4] = [
        Branch::CheckoutCompleted,
        Branch::SubscriptionChanged,
        Branch::SubscriptionDeleted,
        Branch::InvoiceFinalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::CheckoutCompleted => "checkout_completed",
            Branch::SubscriptionChanged => "subscription_changed",
            Branch::SubscriptionDeleted => "subscription_deleted",
            Branch::InvoiceFinalized => "invoice_finalized",
        }
    }

    pub fn matches(&self, event_type: StripeEventType) -> bool {
        match self {
            Branch::CheckoutCompleted => event_type == StripeEventType::CheckoutSessionCompleted,
            Branch::SubscriptionChanged => matches!(
                event_type,
                StripeEventType::CustomerSubscriptionCreated
                    | StripeEventType::CustomerSubscriptionUpdated
            ),
            Branch::SubscriptionDeleted => {
                event_type == StripeEventType::CustomerSubscriptionDeleted
            }
            Branch::InvoiceFinalized => event_type == StripeEventType::InvoiceFinalized,
        }
    }

    /// Every branch whose test passes for `event_type`.
    pub fn matching(event_type: StripeEventType) -> Vec<Branch> {
        Branch::ALL
            .into_iter()
            .filter(|b| b.matches(event_type))
            .collect()
    }
}

/// Summary of a branch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOutcome {
    /// Every step succeeded.
    Completed,
    /// Some steps failed; see `failures`.
    CompletedWithFailures,
    /// Nothing actionable (no owning account, already recorded).
    Skipped,
    /// A gating step failed and later steps were not attempted.
    Aborted,
    /// The event object did not match the expected shape.
    Malformed,
}

/// What one branch did with one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchReport {
    pub branch: Branch,
    pub outcome: BranchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<ReconcileOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_updated: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub failures: Vec<StepFailure>,
}

impl BranchReport {
    fn new(branch: Branch) -> Self {
        Self {
            branch,
            outcome: BranchOutcome::Completed,
            account: None,
            users_updated: None,
            invoice: None,
            error: None,
            failures: Vec::new(),
        }
    }

    fn malformed(branch: Branch, error: impl std::fmt::Display) -> Self {
        Self {
            outcome: BranchOutcome::Malformed,
            error: Some(error.to_string()),
            ..Self::new(branch)
        }
    }

    fn finish(mut self) -> Self {
        if self.outcome == BranchOutcome::Completed && !self.failures.is_empty() {
            self.outcome = BranchOutcome::CompletedWithFailures;
        }
        self
    }

    /// True when a re-run has nothing left to fix.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.outcome != BranchOutcome::Malformed
    }
}

/// Runs the reconciliation branches for verified events.
pub struct BillingEventProcessor {
    payment_provider: Arc<dyn PaymentProvider>,
    plan_resolver: Arc<PlanResolver>,
    reconciler: AccountReconciler,
    user_sync: UserSubscriptionSync,
    invoice_pipeline: InvoicePipeline,
    step_timeout: Duration,
}

impl BillingEventProcessor {
    pub fn new(
        payment_provider: Arc<dyn PaymentProvider>,
        plan_resolver: Arc<PlanResolver>,
        reconciler: AccountReconciler,
        user_sync: UserSubscriptionSync,
        invoice_pipeline: InvoicePipeline,
    ) -> Self {
        Self {
            payment_provider,
            plan_resolver,
            reconciler,
            user_sync,
            invoice_pipeline,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Bounds the subscription fetch.
    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn payment_provider(&self) -> &Arc<dyn PaymentProvider> {
        &self.payment_provider
    }

    /// Evaluates every branch against the event; unknown types match none.
    pub async fn process(&self, event: &StripeEvent, mode: PipelineMode) -> Vec<BranchReport> {
        let branches = Branch::matching(event.parsed_type());
        if branches.is_empty() {
            debug!(event_id = %event.id, event_type = %event.event_type, "No branch handles event type");
        }

        let mut reports = Vec::with_capacity(branches.len());
        for branch in branches {
            reports.push(self.run_branch(branch, event, mode).await);
        }
        reports
    }

    pub async fn run_branch(
        &self,
        branch: Branch,
        event: &StripeEvent,
        mode: PipelineMode,
    ) -> BranchReport {
        debug!(event_id = %event.id, branch = branch.as_str(), "Branch dispatched");
        let report = match branch {
            Branch::CheckoutCompleted => self.checkout_completed(event).await,
            Branch::SubscriptionChanged => self.subscription_changed(event).await,
            Branch::SubscriptionDeleted => self.subscription_deleted(event).await,
            Branch::InvoiceFinalized => self.invoice_finalized(event, mode).await,
        };

        if report.outcome == BranchOutcome::Malformed {
            warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                branch = branch.as_str(),
                error = ?report.error,
                "Event object malformed; branch skipped"
            );
        }
        report
    }

    async fn checkout_completed(&self, event: &StripeEvent) -> BranchReport {
        let branch = Branch::CheckoutCompleted;
        let session: CheckoutSessionObject = match event.deserialize_object() {
            Ok(session) => session,
            Err(e) => return BranchReport::malformed(branch, e),
        };
        let mut report = BranchReport::new(branch);

        let plan = self.plan_resolver.resolve(session.price_id());

        let subscription = match session.subscription.as_deref() {
            Some(id) => match self.fetch_subscription(id).await {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        subscription_id = %id,
                        error = %e,
                        "Subscription fetch failed; reconciling without seats or period end"
                    );
                    report
                        .failures
                        .push(step_failure(&e, PipelineStep::SubscriptionFetch));
                    None
                }
            },
            None => None,
        };
        let seats = subscription.as_ref().and_then(|s| self.seat_count(s));
        let period_end = subscription.as_ref().and_then(period_end);

        match session.account_id().and_then(|id| AccountId::new(id).ok()) {
            Some(account_id) => {
                let update = AccountUpdate::plan(plan)
                    .with_seats(seats)
                    .with_subscription(SubscriptionRef::from_option(session.subscription.clone()))
                    .with_customer(session.customer.clone());
                self.note_reconcile(&mut report, event, self.reconciler.reconcile(&account_id, &update).await);
            }
            None => {
                info!(event_id = %event.id, session_id = %session.id, "Checkout session carries no account id");
                report.account = Some(ReconcileOutcome::AccountMissing);
            }
        }

        if let Some(email) = session.billing_email() {
            let attrs = SubscriptionAttributes::new(plan, STATUS_ACTIVE)
                .with_subscription_id(session.subscription.clone())
                .with_period_end(period_end);
            self.sync_users(&mut report, event, email, &attrs).await;
        }

        report.finish()
    }

    async fn subscription_changed(&self, event: &StripeEvent) -> BranchReport {
        let branch = Branch::SubscriptionChanged;
        let subscription: SubscriptionObject = match event.deserialize_object() {
            Ok(subscription) => subscription,
            Err(e) => return BranchReport::malformed(branch, e),
        };
        let mut report = BranchReport::new(branch);

        let plan = self.plan_resolver.resolve_items(subscription.price_ids());
        let update = AccountUpdate::plan(plan)
            .with_seats(self.seat_count(&subscription))
            .with_subscription(SubscriptionRef::Set(subscription.id.clone()))
            .with_customer(subscription.customer.clone());

        if let Some(account) = self.locate(&mut report, event, &subscription).await {
            self.note_reconcile(&mut report, event, self.reconciler.apply(account, &update).await);
        }

        if let Some(email) = subscription.customer_email() {
            let status = subscription.status.as_deref().unwrap_or(STATUS_ACTIVE);
            let attrs = SubscriptionAttributes::new(plan, status)
                .with_subscription_id(Some(subscription.id.clone()))
                .with_period_end(period_end(&subscription));
            self.sync_users(&mut report, event, email, &attrs).await;
        }

        report.finish()
    }

    async fn subscription_deleted(&self, event: &StripeEvent) -> BranchReport {
        let branch = Branch::SubscriptionDeleted;
        let subscription: SubscriptionObject = match event.deserialize_object() {
            Ok(subscription) => subscription,
            Err(e) => return BranchReport::malformed(branch, e),
        };
        let mut report = BranchReport::new(branch);
        let mut superseded = false;

        if let Some(account) = self.locate(&mut report, event, &subscription).await {
            superseded = account
                .stripe_subscription_id
                .as_deref()
                .is_some_and(|current| current != subscription.id);
            if superseded {
                info!(
                    event_id = %event.id,
                    account_id = %account.id,
                    subscription_id = %subscription.id,
                    "Deleted subscription is no longer the account's; account left as is"
                );
                report.account = Some(ReconcileOutcome::Unchanged);
            } else {
                let update = AccountUpdate::plan(PlanTier::Free)
                    .with_subscription(SubscriptionRef::Clear);
                self.note_reconcile(&mut report, event, self.reconciler.apply(account, &update).await);
            }
        }

        if let Some(email) = subscription.customer_email().filter(|_| !superseded) {
            let attrs = SubscriptionAttributes::new(PlanTier::Free, STATUS_CANCELED)
                .with_subscription_id(Some(subscription.id.clone()))
                .with_period_end(period_end(&subscription));
            self.sync_users(&mut report, event, email, &attrs).await;
        }

        report.finish()
    }

    async fn invoice_finalized(&self, event: &StripeEvent, mode: PipelineMode) -> BranchReport {
        let branch = Branch::InvoiceFinalized;
        let invoice: InvoiceObject = match event.deserialize_object() {
            Ok(invoice) => invoice,
            Err(e) => return BranchReport::malformed(branch, e),
        };

        let result = self.invoice_pipeline.run(event, &invoice, mode).await;
        let mut report = BranchReport::new(branch);
        report.outcome = match result.outcome {
            InvoiceOutcome::NoAccount | InvoiceOutcome::AlreadyRecorded => BranchOutcome::Skipped,
            InvoiceOutcome::Aborted => BranchOutcome::Aborted,
            InvoiceOutcome::Processed { .. } => BranchOutcome::Completed,
        };
        report.invoice = Some(result.outcome);
        report.failures = result.failures;
        report.finish()
    }

    async fn fetch_subscription(&self, id: &str) -> Result<SubscriptionObject, WebhookError> {
        bounded(
            PipelineStep::SubscriptionFetch,
            self.step_timeout,
            self.payment_provider.fetch_subscription(id),
        )
        .await
    }

    /// Quantity of the configured per-seat price, when both exist.
    fn seat_count(&self, subscription: &SubscriptionObject) -> Option<i32> {
        self.plan_resolver
            .mappings()
            .seat_price_id()
            .and_then(|price_id| subscription.quantity_for_price(price_id))
            .and_then(|quantity| i32::try_from(quantity).ok())
    }

    async fn locate(
        &self,
        report: &mut BranchReport,
        event: &StripeEvent,
        subscription: &SubscriptionObject,
    ) -> Option<Account> {
        let located = self
            .reconciler
            .locate(
                subscription.account_id(),
                Some(&subscription.id),
                subscription.customer.as_deref(),
            )
            .await;

        match located {
            Ok(Some(account)) => Some(account),
            Ok(None) => {
                warn!(
                    event_id = %event.id,
                    subscription_id = %subscription.id,
                    customer_id = ?subscription.customer,
                    "No account matches subscription; event treated as handled"
                );
                report.account = Some(ReconcileOutcome::AccountMissing);
                None
            }
            Err(e) => {
                warn!(event_id = %event.id, subscription_id = %subscription.id, error = %e, "Account lookup failed");
                report
                    .failures
                    .push(step_failure(&e, PipelineStep::AccountReconcile));
                None
            }
        }
    }

    fn note_reconcile(
        &self,
        report: &mut BranchReport,
        event: &StripeEvent,
        result: Result<ReconcileOutcome, WebhookError>,
    ) {
        match result {
            Ok(outcome) => report.account = Some(outcome),
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Account reconciliation failed");
                report
                    .failures
                    .push(step_failure(&e, PipelineStep::AccountReconcile));
            }
        }
    }

    async fn sync_users(
        &self,
        report: &mut BranchReport,
        event: &StripeEvent,
        email: &str,
        attrs: &SubscriptionAttributes,
    ) {
        match self.user_sync.sync(email, attrs).await {
            Ok(updated) => report.users_updated = Some(updated),
            Err(e) => {
                warn!(event_id = %event.id, email = %email, error = %e, "User subscription sync failed");
                report.failures.push(step_failure(&e, PipelineStep::UserSync));
            }
        }
    }
}

fn period_end(subscription: &SubscriptionObject) -> Option<Timestamp> {
    subscription
        .current_period_end
        .and_then(Timestamp::from_unix_secs)
}
