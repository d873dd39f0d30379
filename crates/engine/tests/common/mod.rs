//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

use coatbook_core::invoice::{Address, BankDetails, Contact, InvoiceDraft, LineItem, Party};
use coatbook_core::tenancy::{ActingContext, Role};
use coatbook_engine::ports::StoreResult;
use coatbook_engine::{ComplianceService, MemoryPorts, MemoryStore, StoreError, UnitOfWork, WriteSet};
use coatbook_shared::AppConfig;
use coatbook_shared::types::{ClientId, InvoiceId, TenantId, UserId};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap()
}

pub fn emitter() -> Party {
    Party {
        name: "Atelier Poudre & Fils".to_string(),
        tax_id: Some("73282932000074".to_string()),
        vat_number: Some("FR44732829320".to_string()),
        address: Address {
            street: "12 rue des Forges".to_string(),
            postal_code: "69007".to_string(),
            city: "Lyon".to_string(),
            country_code: "FR".to_string(),
        },
        contact: Contact {
            email: Some("compta@atelier-poudre.fr".to_string()),
            phone: None,
        },
        bank: Some(BankDetails {
            iban: "FR76 3000 6000 0112 3456 7890 189".to_string(),
            bic: "AGRIFRPP".to_string(),
        }),
        account_code: None,
    }
}

pub fn customer() -> Party {
    Party {
        name: "Garage Martin".to_string(),
        tax_id: None,
        vat_number: None,
        address: Address {
            street: "3 avenue Jean Jaurès".to_string(),
            postal_code: "69100".to_string(),
            city: "Villeurbanne".to_string(),
            country_code: "FR".to_string(),
        },
        contact: Contact::default(),
        bank: None,
        account_code: Some("CMARTIN".to_string()),
    }
}

/// 150.00 + 4 x 45.00 at 20%: 330.00 HT, 66.00 TVA, 396.00 TTC.
pub fn sample_lines() -> Vec<LineItem> {
    vec![
        LineItem::new("Cadre vélo thermolaqué", dec!(1), dec!(150), dec!(20)),
        LineItem::new("Jantes thermolaquées", dec!(4), dec!(45), dec!(20)),
    ]
}

pub fn sample_draft() -> InvoiceDraft {
    InvoiceDraft {
        lines: sample_lines(),
        ..InvoiceDraft::default()
    }
}

/// Commits into a memory store, failing on demand with a backend error.
pub struct FlakyCommits {
    inner: Arc<MemoryStore>,
    failures: AtomicUsize,
}

impl FlakyCommits {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` commits fail.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl UnitOfWork for FlakyCommits {
    async fn commit(&self, writes: WriteSet) -> StoreResult<()> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.commit(writes).await
    }
}

/// One tenant with an emitter profile and one client, over in-memory ports.
pub struct Fixture {
    pub ports: MemoryPorts,
    pub commits: Arc<FlakyCommits>,
    pub service: Arc<ComplianceService>,
    pub tenant: TenantId,
    pub client: ClientId,
    pub ctx: ActingContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(&AppConfig::default())
    }

    pub fn with_config(config: &AppConfig) -> Self {
        init_tracing();
        let ports = MemoryPorts::new(at(2025, 3, 14));
        let commits = Arc::new(FlakyCommits::new(ports.store.clone()));
        let mut wired = ports.ports();
        wired.store = commits.clone();
        let service = Arc::new(ComplianceService::new(wired, config).with_page_size(2));
        let tenant = TenantId::new();
        let client = ClientId::new();
        ports.directory.set_emitter(tenant, emitter());
        ports.directory.set_client(tenant, client, customer());
        Self {
            ctx: ActingContext::new(tenant, UserId::new(), Role::Owner),
            ports,
            commits,
            service,
            tenant,
            client,
        }
    }

    /// Another tenant sharing the same stores, with its own client.
    pub fn other_tenant(&self) -> (ClientId, ActingContext) {
        let tenant = TenantId::new();
        let client = ClientId::new();
        self.ports.directory.set_emitter(tenant, emitter());
        self.ports.directory.set_client(tenant, client, customer());
        (client, ActingContext::new(tenant, UserId::new(), Role::Owner))
    }

    pub fn as_role(&self, role: Role) -> ActingContext {
        ActingContext::new(self.tenant, UserId::new(), role)
    }

    pub async fn draft(&self) -> InvoiceId {
        self.service
            .create_draft(&self.ctx, self.client, sample_draft())
            .await
            .unwrap()
            .id()
    }

    pub async fn issued(&self) -> InvoiceId {
        let id = self.draft().await;
        self.service.issue_invoice(&self.ctx, id).await.unwrap();
        id
    }
}
