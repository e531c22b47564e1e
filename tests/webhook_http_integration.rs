//! End-to-end tests for the Stripe webhook endpoint.
//!
//! Drives the assembled axum router with signed requests over in-memory
//! stores, a mock payment provider, a mock renderer and a recording mailer.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use billing_reconciler::adapters::document::MockInvoiceRenderer;
use billing_reconciler::adapters::email::MockMailer;
use billing_reconciler::adapters::memory::{
    InMemoryAccountRepository, InMemoryDeadLetterRepository, InMemoryEventLogRepository,
    InMemoryInvoiceRepository, InMemoryUserRepository,
};
use billing_reconciler::adapters::storage::InMemoryObjectStorage;
use billing_reconciler::adapters::stripe::MockPaymentProvider;
use billing_reconciler::application::ReplayFailedStepsCommand;
use billing_reconciler::bootstrap::{Application, Collaborators, Stores};
use billing_reconciler::domain::billing::{
    signature_header, Account, PipelineStep, PlanTier, PriceMappings, User,
};
use billing_reconciler::domain::foundation::{AccountId, UserId};
use billing_reconciler::ports::PaymentProvider;

const SECRET: &str = "whsec_integration";
const WEBHOOK_PATH: &str = "/api/webhooks/stripe";

// ════════════════════════════════════════════════════════════════════════════════
// Test Harness
// ════════════════════════════════════════════════════════════════════════════════

struct Harness {
    app: Application,
    accounts: Arc<InMemoryAccountRepository>,
    users: Arc<InMemoryUserRepository>,
    invoices: Arc<InMemoryInvoiceRepository>,
    event_logs: Arc<InMemoryEventLogRepository>,
    dead_letters: Arc<InMemoryDeadLetterRepository>,
    renderer: Arc<MockInvoiceRenderer>,
    storage: Arc<InMemoryObjectStorage>,
    mailer: Arc<MockMailer>,
}

impl Harness {
    async fn new() -> Self {
        Self::build(true).await
    }

    async fn unconfigured() -> Self {
        Self::build(false).await
    }

    async fn build(configured: bool) -> Self {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        accounts.insert(Account::new(account_id())).await;

        let users = Arc::new(InMemoryUserRepository::new());
        for id in ["user_1", "user_2"] {
            users
                .insert(User::new(UserId::new(id).unwrap(), "a@b.com"))
                .await;
        }

        let invoices = Arc::new(InMemoryInvoiceRepository::new());
        let event_logs = Arc::new(InMemoryEventLogRepository::new());
        let dead_letters = Arc::new(InMemoryDeadLetterRepository::new());
        let renderer = Arc::new(MockInvoiceRenderer::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let mailer = Arc::new(MockMailer::new());

        let payment_provider: Option<Arc<dyn PaymentProvider>> = if configured {
            Some(Arc::new(MockPaymentProvider::new(SECRET)))
        } else {
            None
        };

        let app = Application::assemble(
            Collaborators {
                stores: Stores {
                    accounts: accounts.clone(),
                    users: users.clone(),
                    invoices: invoices.clone(),
                    event_logs: event_logs.clone(),
                    dead_letters: dead_letters.clone(),
                },
                payment_provider,
                renderer: renderer.clone(),
                storage: storage.clone(),
                mailer: mailer.clone(),
            },
            PriceMappings::new()
                .with_prices(PlanTier::Pro, ["price_pro"])
                .with_prices(PlanTier::Enterprise, ["price_ent"])
                .with_seat_price("price_seat"),
            Duration::from_secs(5),
        );

        Self {
            app,
            accounts,
            users,
            invoices,
            event_logs,
            dead_letters,
            renderer,
            storage,
            mailer,
        }
    }

    fn router(&self) -> Router {
        self.app.router()
    }

    async fn deliver(&self, event: Value) -> (StatusCode, Value) {
        let payload = serde_json::to_vec(&event).unwrap();
        let signature = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload);
        self.send(payload, Some(signature)).await
    }

    async fn send(&self, payload: Vec<u8>, signature: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(WEBHOOK_PATH)
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header("Stripe-Signature", signature);
        }

        let response = self
            .router()
            .oneshot(request.body(Body::from(payload)).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn account(&self) -> Account {
        self.accounts.get(&account_id()).await.unwrap()
    }
}

fn account_id() -> AccountId {
    AccountId::new("acc_1").unwrap()
}

fn event(id: &str, event_type: &str, object: Value) -> Value {
    json!({
        "id": id,
        "type": event_type,
        "created": 1_700_000_000,
        "livemode": false,
        "data": { "object": object }
    })
}

fn checkout_event() -> Value {
    event(
        "evt_checkout",
        "checkout.session.completed",
        json!({
            "id": "cs_1",
            "customer": "cus_1",
            "customer_email": "a@b.com",
            "metadata": { "accountId": "acc_1", "priceId": "price_pro" }
        }),
    )
}

fn invoice_event(object: Value) -> Value {
    event("evt_invoice", "invoice.finalized", object)
}

fn invoice_for_account() -> Value {
    json!({
        "id": "in_1",
        "number": "INV-0001",
        "customer_email": "a@b.com",
        "amount_due": 4900,
        "currency": "usd",
        "metadata": { "accountId": "acc_1" }
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Authentication and Routing
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn non_post_is_method_not_allowed() {
    let h = Harness::new().await;

    let response = h
        .router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(WEBHOOK_PATH)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unconfigured_provider_is_rejected() {
    let h = Harness::unconfigured().await;

    let (status, body) = h.deliver(checkout_event()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "PROVIDER_NOT_CONFIGURED");
    assert_eq!(h.account().await.plan, PlanTier::Free);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let h = Harness::new().await;
    let payload = serde_json::to_vec(&checkout_event()).unwrap();

    let (status, body) = h.send(payload, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "MISSING_SIGNATURE");
}

#[tokio::test]
async fn tampered_body_is_rejected_without_mutation() {
    let h = Harness::new().await;
    let payload = serde_json::to_vec(&checkout_event()).unwrap();
    let signature = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload);
    let tampered = String::from_utf8(payload)
        .unwrap()
        .replace("price_pro", "price_ent")
        .into_bytes();

    let (status, body) = h.send(tampered, Some(signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_SIGNATURE");
    assert_eq!(h.accounts.write_count().await, 0);
    assert!(h.users.all().await.iter().all(|u| u.subscription_plan.is_none()));
    assert!(h.dead_letters.all().await.is_empty());
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let h = Harness::new().await;
    let payload = serde_json::to_vec(&checkout_event()).unwrap();
    let signature = signature_header("whsec_other", chrono::Utc::now().timestamp(), &payload);

    let (status, _) = h.send(payload, Some(signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.accounts.write_count().await, 0);
}

#[tokio::test]
async fn stale_signature_is_rejected() {
    let h = Harness::new().await;
    let payload = serde_json::to_vec(&checkout_event()).unwrap();
    let stale = chrono::Utc::now().timestamp() - 3_600;
    let signature = signature_header(SECRET, stale, &payload);

    let (status, body) = h.send(payload, Some(signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged() {
    let h = Harness::new().await;

    let (status, body) = h
        .deliver(event("evt_x", "charge.refunded", json!({ "id": "ch_1" })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(body["event_type"], "charge.refunded");
    assert_eq!(body["branches"], json!([]));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let h = Harness::new().await;

    let response = h
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout and Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn checkout_upgrades_account_and_users() {
    let h = Harness::new().await;

    let (status, body) = h.deliver(checkout_event()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_id"], "evt_checkout");
    assert_eq!(body["branches"][0]["branch"], "checkout_completed");
    assert_eq!(body["branches"][0]["outcome"], "completed");

    assert_eq!(h.account().await.plan, PlanTier::Pro);
    let users = h.users.all().await;
    assert_eq!(users.len(), 2);
    for user in users {
        assert_eq!(user.subscription_plan.as_deref(), Some("pro"));
        assert_eq!(user.subscription_status.as_deref(), Some("active"));
    }
}

#[tokio::test]
async fn redelivered_checkout_converges() {
    let h = Harness::new().await;

    h.deliver(checkout_event()).await;
    let first = h.account().await;
    h.deliver(checkout_event()).await;
    let second = h.account().await;

    assert_eq!(first.plan, second.plan);
    assert_eq!(first.seats, second.seats);
    assert_eq!(first.stripe_customer_id, second.stripe_customer_id);
    assert_eq!(h.accounts.write_count().await, 1);
}

#[tokio::test]
async fn subscription_update_sets_seat_count() {
    let h = Harness::new().await;
    let update = event(
        "evt_sub",
        "customer.subscription.updated",
        json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "metadata": { "accountId": "acc_1" },
            "items": { "object": "list", "data": [
                { "price": { "id": "price_pro" }, "quantity": 1 },
                { "price": { "id": "price_seat" }, "quantity": 5 },
                { "price": { "id": "price_addon" }, "quantity": 2 }
            ]}
        }),
    );

    let (status, _) = h.deliver(update).await;

    assert_eq!(status, StatusCode::OK);
    let account = h.account().await;
    assert_eq!(account.seats, 5);
    assert_eq!(account.plan, PlanTier::Pro);
    assert_eq!(account.stripe_subscription_id.as_deref(), Some("sub_1"));
}

#[tokio::test]
async fn subscription_deletion_downgrades_to_free() {
    let h = Harness::new().await;
    let update = event(
        "evt_sub",
        "customer.subscription.updated",
        json!({
            "id": "sub_1",
            "metadata": { "accountId": "acc_1" },
            "items": { "data": [{ "price": { "id": "price_ent" }, "quantity": 1 }] }
        }),
    );
    h.deliver(update).await;
    assert_eq!(h.account().await.plan, PlanTier::Enterprise);

    let deleted = event(
        "evt_del",
        "customer.subscription.deleted",
        json!({ "id": "sub_1", "status": "canceled", "metadata": { "customerEmail": "a@b.com" } }),
    );
    let (status, _) = h.deliver(deleted).await;

    assert_eq!(status, StatusCode::OK);
    let account = h.account().await;
    assert_eq!(account.plan, PlanTier::Free);
    assert!(account.stripe_subscription_id.is_none());
    for user in h.users.all().await {
        assert_eq!(user.subscription_status.as_deref(), Some("canceled"));
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Invoices
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn invoice_is_rendered_stored_persisted_and_emailed() {
    let h = Harness::new().await;

    let (status, body) = h.deliver(invoice_event(invoice_for_account())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branches"][0]["invoice"]["status"], "processed");
    let invoices = h.invoices.all().await;
    assert_eq!(invoices.len(), 1);
    assert!(invoices[0].pdf_url.is_some());
    assert_eq!(h.storage.keys().await.len(), 1);
    assert_eq!(h.event_logs.entries().await.len(), 1);
    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].attachments.len(), 1);
}

#[tokio::test]
async fn invoice_without_owner_writes_nothing() {
    let h = Harness::new().await;
    let orphan = json!({ "id": "in_9", "subscription": "sub_9", "customer_email": "a@b.com" });

    let (status, body) = h.deliver(invoice_event(orphan)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branches"][0]["invoice"]["status"], "no_account");
    assert_eq!(h.invoices.count().await, 0);
    assert!(h.storage.keys().await.is_empty());
    assert!(h.mailer.sent().await.is_empty());
    assert!(h.event_logs.entries().await.is_empty());
    assert_eq!(h.accounts.write_count().await, 0);
    assert!(h.dead_letters.all().await.is_empty());
}

#[tokio::test]
async fn render_failure_produces_nothing() {
    let h = Harness::new().await;
    h.renderer.set_failing(true).await;

    let (status, body) = h.deliver(invoice_event(invoice_for_account())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branches"][0]["outcome"], "aborted");
    assert_eq!(h.invoices.count().await, 0);
    assert!(h.storage.keys().await.is_empty());
    assert!(h.mailer.sent().await.is_empty());
    let letters = h.dead_letters.all().await;
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].step, PipelineStep::InvoiceRender);
}

#[tokio::test]
async fn upload_failure_still_persists_and_emails() {
    let h = Harness::new().await;
    h.storage.set_failing(true).await;

    let (status, body) = h.deliver(invoice_event(invoice_for_account())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branches"][0]["outcome"], "completed_with_failures");
    let invoices = h.invoices.all().await;
    assert_eq!(invoices.len(), 1);
    assert!(invoices[0].pdf_url.is_none());
    assert_eq!(h.mailer.sent().await.len(), 1);
    assert_eq!(h.dead_letters.all().await[0].step, PipelineStep::InvoiceUpload);
}

#[tokio::test]
async fn redelivered_invoice_keeps_one_record() {
    let h = Harness::new().await;

    h.deliver(invoice_event(invoice_for_account())).await;
    let (status, body) = h.deliver(invoice_event(invoice_for_account())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branches"][0]["invoice"]["status"], "already_recorded");
    assert_eq!(h.invoices.count().await, 1);
    assert_eq!(h.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn redelivered_invoice_without_document_is_not_emailed_twice() {
    let h = Harness::new().await;
    h.storage.set_failing(true).await;

    h.deliver(invoice_event(invoice_for_account())).await;
    let (status, body) = h.deliver(invoice_event(invoice_for_account())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branches"][0]["invoice"]["status"], "already_recorded");
    assert_eq!(h.invoices.count().await, 1);
    assert_eq!(h.mailer.sent().await.len(), 1);
    assert_eq!(h.dead_letters.all().await.len(), 1);
}

#[tokio::test]
async fn replay_fills_missing_document() {
    let h = Harness::new().await;
    h.storage.set_failing(true).await;
    h.deliver(invoice_event(invoice_for_account())).await;
    h.storage.set_failing(false).await;

    let summary = h
        .app
        .replay_handler()
        .unwrap()
        .handle(ReplayFailedStepsCommand::default())
        .await
        .unwrap();

    assert_eq!(summary.resolved, 1);
    assert!(h.invoices.all().await[0].pdf_url.is_some());
    assert_eq!(h.mailer.sent().await.len(), 1);
    assert_eq!(h.dead_letters.pending_count().await, 0);
}
