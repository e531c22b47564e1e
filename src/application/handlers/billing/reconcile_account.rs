//! AccountReconciler - writes resolved plan, seats and provider references
//! onto an Account.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::billing::{Account, AccountUpdate, PipelineStep, WebhookError};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::AccountRepository;

/// What reconciliation did to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Stored values changed.
    Updated,
    /// Stored values already matched; nothing written.
    Unchanged,
    /// No account resolves. Logged and treated as handled.
    AccountMissing,
}

/// Sole writer of account plan state.
///
/// Writes absolute target values and skips the write when they already
/// match, so duplicate deliveries converge instead of accumulating.
#[derive(Clone)]
pub struct AccountReconciler {
    accounts: Arc<dyn AccountRepository>,
}

impl AccountReconciler {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Finds the account an event refers to.
    ///
    /// Tries the explicit account id first, then the stored subscription id,
    /// then the stored customer id.
    pub async fn locate(
        &self,
        account_id: Option<&str>,
        subscription_id: Option<&str>,
        customer_id: Option<&str>,
    ) -> Result<Option<Account>, WebhookError> {
        let lookup_failed = |e: DomainError| WebhookError::downstream(PipelineStep::AccountReconcile, e);

        if let Some(id) = account_id.and_then(|id| AccountId::new(id).ok()) {
            if let Some(account) = self.accounts.find_by_id(&id).await.map_err(lookup_failed)? {
                return Ok(Some(account));
            }
            debug!(account_id = %id, "Explicit account id not found; trying provider references");
        }

        if let Some(sub_id) = subscription_id.filter(|s| !s.is_empty()) {
            if let Some(account) = self
                .accounts
                .find_by_subscription_id(sub_id)
                .await
                .map_err(lookup_failed)?
            {
                return Ok(Some(account));
            }
        }

        if let Some(cus_id) = customer_id.filter(|c| !c.is_empty()) {
            return self
                .accounts
                .find_by_customer_id(cus_id)
                .await
                .map_err(lookup_failed);
        }

        Ok(None)
    }

    /// Loads the account by id and applies the update.
    pub async fn reconcile(
        &self,
        account_id: &AccountId,
        update: &AccountUpdate,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await
            .map_err(|e| WebhookError::downstream(PipelineStep::AccountReconcile, e))?;

        match account {
            Some(account) => self.apply(account, update).await,
            None => {
                warn!(
                    account_id = %account_id,
                    plan = %update.plan,
                    "Account not found; event treated as handled"
                );
                Ok(ReconcileOutcome::AccountMissing)
            }
        }
    }

    /// Applies the update to an already loaded account.
    pub async fn apply(
        &self,
        mut account: Account,
        update: &AccountUpdate,
    ) -> Result<ReconcileOutcome, WebhookError> {
        if !account.apply(update) {
            debug!(account_id = %account.id, "Account already reconciled");
            return Ok(ReconcileOutcome::Unchanged);
        }

        match self.accounts.update(&account).await {
            Ok(()) => {
                info!(
                    account_id = %account.id,
                    plan = %account.plan,
                    seats = account.seats,
                    subscription_id = ?account.stripe_subscription_id,
                    "Account reconciled"
                );
                Ok(ReconcileOutcome::Updated)
            }
            Err(e) if e.code == ErrorCode::AccountNotFound => {
                warn!(account_id = %account.id, "Account disappeared before update; treated as handled");
                Ok(ReconcileOutcome::AccountMissing)
            }
            Err(e) => Err(WebhookError::downstream(PipelineStep::AccountReconcile, e)),
        }
    }
}
