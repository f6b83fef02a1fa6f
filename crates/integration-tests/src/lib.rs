//! Integration tests for iShop.
//!
//! Each test starts the full storefront router on an ephemeral port, with
//! either an in-memory `SQLite` catalog and ledger or the flat-file catalog
//! and purchase log under a temporary directory. The payment provider and
//! the game database are replaced by recording fakes, so no external
//! service is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ishop-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Client, Response, redirect::Policy};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ishop_core::{AccountId, CharacterId, GrantFailurePolicy, ItemId, PurchaseId, PurchaseMode};
use ishop_storefront::accounts::{AccountError, AccountIdentity, AccountStore, GrantOutcome};
use ishop_storefront::catalog::{CatalogStore, FileCatalog, Item, SqliteCatalog};
use ishop_storefront::config::StorefrontConfig;
use ishop_storefront::db;
use ishop_storefront::payments::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway};
use ishop_storefront::purchases::{
    FilePurchaseLedger, Purchase, PurchaseLedger, SqlitePurchaseLedger,
};
use ishop_storefront::services::AdminCredentials;
use ishop_storefront::state::{AppState, Backends};

/// Session secret accepted by the configuration checks.
pub const SESSION_SECRET: &str =
    "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6-dF8+gH1=jK3~lM5?nP7<qR9>sT2|vW4.";
/// Admin password used by every test server.
pub const ADMIN_PASSWORD: &str = "letmein-integration";
/// Game account accepted by [`FakeAccounts`].
pub const ACCOUNT_LOGIN: &str = "alice";
pub const ACCOUNT_PASSWORD: &str = "secret";
pub const ACCOUNT_ID: i64 = 7;
pub const CHARACTER_ID: i64 = 42;
/// Hosted checkout URL prefix returned by [`FakeGateway`].
pub const CHECKOUT_URL: &str = "https://checkout.stripe.test/c/pay/";

/// Payment provider double that records every checkout request.
///
/// Sessions it created can be read back; they report `paid` unless the
/// gateway was built with `unpaid`.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<CheckoutRequest>>,
    pub sessions: Mutex<HashMap<String, CheckoutSession>>,
    pub fail: bool,
    pub unpaid: bool,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail {
            return Err(PaymentError::Api {
                status: 402,
                message: "card_declined".to_owned(),
            });
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        let session = CheckoutSession {
            url: Some(format!("{CHECKOUT_URL}{id}")),
            id: id.clone(),
            payment_status: Some("unpaid".to_owned()),
            item_id: Some(request.item_id.to_string()),
            client_reference_id: request.client_reference_id.clone(),
        };
        self.sessions.lock().unwrap().insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError> {
        let Some(mut session) = self.sessions.lock().unwrap().get(id).cloned() else {
            return Err(PaymentError::Api {
                status: 404,
                message: format!("No such checkout.session: '{id}'"),
            });
        };
        session.url = None;
        session.payment_status = Some(if self.unpaid { "unpaid" } else { "paid" }.to_owned());
        Ok(session)
    }
}

/// What [`FakeAccounts`] answers to a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrantBehaviour {
    #[default]
    Grant,
    NoCharacter,
    Fail,
}

/// Game database double with a single account.
#[derive(Default)]
pub struct FakeAccounts {
    pub behaviour: GrantBehaviour,
    pub grants: Mutex<Vec<(AccountId, ItemId)>>,
}

impl FakeAccounts {
    pub fn grants(&self) -> Vec<(AccountId, ItemId)> {
        self.grants.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountStore for FakeAccounts {
    async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<AccountIdentity>, AccountError> {
        Ok((login == ACCOUNT_LOGIN && password == ACCOUNT_PASSWORD).then(|| AccountIdentity {
            id: AccountId::new(ACCOUNT_ID),
            login: login.to_owned(),
        }))
    }

    async fn grant_item(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<GrantOutcome, AccountError> {
        self.grants.lock().unwrap().push((account_id, item_id.clone()));
        match self.behaviour {
            GrantBehaviour::Grant => Ok(GrantOutcome::Granted {
                character_id: CharacterId::new(CHARACTER_ID),
            }),
            GrantBehaviour::NoCharacter => Ok(GrantOutcome::NoCharacter),
            GrantBehaviour::Fail => Err(AccountError::Database(sqlx::Error::PoolTimedOut)),
        }
    }
}

/// Which catalog and ledger the test server stores into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Sqlite,
    File,
}

/// Knobs for a test server.
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub mode: PurchaseMode,
    pub policy: GrantFailurePolicy,
    pub grant: GrantBehaviour,
    pub gateway_fails: bool,
    pub backend: Backend,
    pub verify_payments: bool,
    pub sessions_unpaid: bool,
}

impl TestOptions {
    pub const fn new(mode: PurchaseMode) -> Self {
        Self {
            mode,
            policy: GrantFailurePolicy::Open,
            grant: GrantBehaviour::Grant,
            gateway_fails: false,
            backend: Backend::Sqlite,
            verify_payments: false,
            sessions_unpaid: false,
        }
    }

    #[must_use]
    pub const fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Verify checkout sessions with the provider on return.
    #[must_use]
    pub const fn verify_payments(mut self) -> Self {
        self.verify_payments = true;
        self
    }

    /// Sessions read back from the provider report `unpaid`.
    #[must_use]
    pub const fn sessions_unpaid(mut self) -> Self {
        self.sessions_unpaid = true;
        self
    }

    #[must_use]
    pub const fn policy(mut self, policy: GrantFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn grant(mut self, grant: GrantBehaviour) -> Self {
        self.grant = grant;
        self
    }

    #[must_use]
    pub const fn gateway_fails(mut self) -> Self {
        self.gateway_fails = true;
        self
    }
}

/// Where a test server keeps its catalog and ledger.
pub enum Storage {
    Sqlite(SqlitePool),
    File { dir: PathBuf },
}

/// A running storefront and a cookie-keeping client that does not follow
/// redirects.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub storage: Storage,
    pub catalog: Arc<dyn CatalogStore>,
    pub ledger: Arc<dyn PurchaseLedger>,
    pub gateway: Arc<FakeGateway>,
    pub accounts: Arc<FakeAccounts>,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Start a server whose catalog holds `sword1 / Sword / 9.99`.
    pub async fn start(options: TestOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let mode = options.mode.to_string();
        let policy = match options.policy {
            GrantFailurePolicy::Open => "open",
            GrantFailurePolicy::Closed => "closed",
        };
        let vars: HashMap<&str, String> = [
            ("PURCHASE_MODE", mode),
            ("STRIPE_VERIFY_PAYMENTS", options.verify_payments.to_string()),
            ("GRANT_FAILURE_POLICY", policy.to_owned()),
            ("STOREFRONT_SESSION_SECRET", SESSION_SECRET.to_owned()),
            ("STRIPE_SECRET_KEY", "sk_test_51HqLyjWDarjtT1zdp7dcXUK".to_owned()),
            ("STOREFRONT_PORT", addr.port().to_string()),
            ("STOREFRONT_BASE_URL", base_url.clone()),
            ("CATALOG_DATABASE_URL", "sqlite::memory:".to_owned()),
            (
                "CATALOG_BACKEND",
                match options.backend {
                    Backend::Sqlite => "sqlite",
                    Backend::File => "file",
                }
                .to_owned(),
            ),
        ]
        .into_iter()
        .collect();
        let config = StorefrontConfig::from_lookup(&|key| vars.get(key).cloned()).unwrap();

        let (storage, catalog, ledger): (Storage, Arc<dyn CatalogStore>, Arc<dyn PurchaseLedger>) =
            match options.backend {
                Backend::Sqlite => {
                    let pool = db::create_catalog_pool("sqlite::memory:").await.unwrap();
                    db::migrate(&pool).await.unwrap();
                    (
                        Storage::Sqlite(pool.clone()),
                        Arc::new(SqliteCatalog::new(pool.clone())),
                        Arc::new(SqlitePurchaseLedger::new(pool)),
                    )
                }
                Backend::File => {
                    let dir = std::env::temp_dir()
                        .join(format!("ishop-it-{}", PurchaseId::generate()));
                    (
                        Storage::File { dir: dir.clone() },
                        Arc::new(FileCatalog::new(dir.join("items.json"))),
                        Arc::new(FilePurchaseLedger::new(dir.join("purchases.jsonl"))),
                    )
                }
            };
        catalog
            .create(&item("sword1", "Sword", "9.99"))
            .await
            .unwrap();

        let gateway = Arc::new(FakeGateway {
            fail: options.gateway_fails,
            unpaid: options.sessions_unpaid,
            ..FakeGateway::default()
        });
        let accounts = Arc::new(FakeAccounts {
            behaviour: options.grant,
            ..FakeAccounts::default()
        });

        let catalog_pool = match &storage {
            Storage::Sqlite(pool) => Some(pool.clone()),
            Storage::File { .. } => None,
        };
        let backends = Backends {
            catalog: Arc::clone(&catalog),
            ledger: Arc::clone(&ledger),
            gateway: gateway.clone(),
            accounts: options
                .mode
                .requires_account()
                .then(|| accounts.clone() as Arc<dyn AccountStore>),
            catalog_pool,
            game_pool: None,
        };
        let admin = AdminCredentials::from_password(ADMIN_PASSWORD).unwrap();
        let app = ishop_storefront::app(AppState::new(config, backends, admin)).unwrap();

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap();

        Self {
            client,
            base_url,
            storage,
            catalog,
            ledger,
            gateway,
            accounts,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client.post(self.url(path)).form(form).send().await.unwrap()
    }

    pub async fn login_account(&self) {
        let response = self
            .post_form("/login", &[("login", ACCOUNT_LOGIN), ("password", ACCOUNT_PASSWORD)])
            .await;
        assert_eq!(location(&response), "/");
    }

    pub async fn login_admin(&self) {
        let response = self.post_form("/admin/login", &[("password", ADMIN_PASSWORD)]).await;
        assert_eq!(location(&response), "/admin");
    }

    /// Current state of every ledger record, oldest first.
    pub async fn purchases(&self) -> Vec<Purchase> {
        let ids: Vec<String> = match &self.storage {
            Storage::Sqlite(pool) => {
                sqlx::query_scalar("SELECT id FROM purchases ORDER BY created_at")
                    .fetch_all(pool)
                    .await
                    .unwrap()
            }
            Storage::File { dir } => {
                let raw = std::fs::read_to_string(dir.join("purchases.jsonl")).unwrap_or_default();
                let mut ids = Vec::new();
                for line in raw.lines() {
                    let snapshot: Purchase = serde_json::from_str(line).unwrap();
                    let id = snapshot.id.to_string();
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                ids
            }
        };

        let mut purchases = Vec::new();
        for id in ids {
            let purchase = self.ledger.get(id.parse().unwrap()).await.unwrap().unwrap();
            purchases.push(purchase);
        }
        purchases
    }

    /// Statuses of all ledger records, oldest first.
    pub async fn purchase_statuses(&self) -> Vec<String> {
        self.purchases()
            .await
            .iter()
            .map(|p| p.status.as_str().to_owned())
            .collect()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
        if let Storage::File { dir } = &self.storage {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

/// `Location` header of a redirect response.
pub fn location(response: &Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    response.headers()[reqwest::header::LOCATION]
        .to_str()
        .unwrap()
        .to_owned()
}

pub fn item(id: &str, name: &str, price: &str) -> Item {
    Item {
        id: ItemId::parse(id).unwrap(),
        name: name.to_owned(),
        price: price.parse().unwrap(),
    }
}
