//! In-memory adapters for every port.
//!
//! Useful for tests and embedders that keep state in process. Data is not
//! persisted across restarts.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use dashmap::DashMap;

use coatbook_core::invoice::{Invoice, InvoiceKind, Party, Payment};
use coatbook_core::ledger::{bank_order_key, sales_order_key};
use coatbook_core::numbering::DocumentNumber;
use coatbook_shared::types::{ClientId, DocumentId, InvoiceId, PageRequest, PaymentId, TenantId};

use crate::ports::{
    AuditEntry, AuditSink, Clock, DocumentArchive, GeneratedDocument, InvoiceRepository,
    PartyDirectory, PaymentRepository, RateLimitCounter, SequenceCounter, StoreError, StoreResult,
    UnitOfWork, WindowHit, WriteSet,
};
use crate::service::Ports;

fn page_of<T>(mut items: Vec<T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(offset..).take(limit).collect()
}

type NumberKey = (TenantId, InvoiceKind, DocumentNumber);

#[derive(Debug, Default)]
struct StoreState {
    invoices: HashMap<InvoiceId, Invoice>,
    numbers: HashMap<NumberKey, InvoiceId>,
    payments: HashMap<PaymentId, Payment>,
    counters: HashMap<(TenantId, InvoiceKind, i32), u64>,
    documents: HashMap<DocumentId, GeneratedDocument>,
}

impl StoreState {
    fn number_key(invoice: &Invoice) -> Option<NumberKey> {
        invoice
            .number()
            .map(|number| (invoice.tenant_id(), invoice.kind(), number.clone()))
    }

    /// Checks that `invoice` may hold its number. `pending` holds numbers
    /// taken earlier in the same write set.
    fn check_number(
        &self,
        invoice: &Invoice,
        pending: &mut HashSet<NumberKey>,
    ) -> StoreResult<()> {
        let Some(key) = Self::number_key(invoice) else {
            return Ok(());
        };
        let taken = self
            .numbers
            .get(&key)
            .is_some_and(|owner| *owner != invoice.id());
        if taken || !pending.insert(key) {
            return Err(StoreError::Duplicate(
                invoice.number().map(ToString::to_string).unwrap_or_default(),
            ));
        }
        Ok(())
    }

    fn check(&self, writes: &WriteSet) -> StoreResult<()> {
        if let Some(claim) = &writes.claim {
            let key = (claim.tenant_id, claim.kind, claim.number.year());
            let current = self.counters.get(&key).copied().unwrap_or(0);
            if current.checked_add(1) != Some(claim.number.sequence()) {
                return Err(StoreError::Duplicate(claim.number.to_string()));
            }
        }

        let mut pending = HashSet::new();
        for (invoice, expected) in &writes.updates {
            let stored = self.invoices.get(&invoice.id()).ok_or(StoreError::NotFound)?;
            if stored.version() != *expected {
                return Err(StoreError::VersionConflict(invoice.id()));
            }
            self.check_number(invoice, &mut pending)?;
        }
        let mut new_ids = HashSet::new();
        for invoice in &writes.inserts {
            if self.invoices.contains_key(&invoice.id()) || !new_ids.insert(invoice.id()) {
                return Err(StoreError::Duplicate(invoice.id().to_string()));
            }
            self.check_number(invoice, &mut pending)?;
        }
        let mut new_payments = HashSet::new();
        for payment in &writes.payments {
            if self.payments.contains_key(&payment.id()) || !new_payments.insert(payment.id()) {
                return Err(StoreError::Duplicate(payment.id().to_string()));
            }
        }
        let mut new_documents = HashSet::new();
        for document in &writes.documents {
            if self.documents.contains_key(&document.id) || !new_documents.insert(document.id) {
                return Err(StoreError::Duplicate(document.id.to_string()));
            }
        }
        Ok(())
    }

    fn apply(&mut self, writes: WriteSet) {
        if let Some(claim) = writes.claim {
            self.counters.insert(
                (claim.tenant_id, claim.kind, claim.number.year()),
                claim.number.sequence(),
            );
        }
        for invoice in writes
            .updates
            .into_iter()
            .map(|(invoice, _)| invoice)
            .chain(writes.inserts)
        {
            if let Some(key) = Self::number_key(&invoice) {
                self.numbers.insert(key, invoice.id());
            }
            self.invoices.insert(invoice.id(), invoice);
        }
        for payment in writes.payments {
            self.payments.insert(payment.id(), payment);
        }
        for document in writes.documents {
            self.documents.insert(document.id, document);
        }
    }
}

/// Documents, payments, counters and artifacts behind a single lock.
///
/// Every write set is checked in full before any of it is applied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().invoices.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().invoices.is_empty()
    }

    /// Last committed counter value of a numbering sequence.
    #[must_use]
    pub fn counter_value(&self, tenant_id: TenantId, kind: InvoiceKind, year: i32) -> u64 {
        self.state()
            .counters
            .get(&(tenant_id, kind, year))
            .copied()
            .unwrap_or(0)
    }

    /// Payments of a tenant, in bank journal order.
    #[must_use]
    pub fn payments(&self, tenant_id: TenantId) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .state()
            .payments
            .values()
            .filter(|p| p.tenant_id() == tenant_id)
            .cloned()
            .collect();
        payments.sort_by_cached_key(bank_order_key);
        payments
    }

    /// Artifacts of a tenant, oldest first.
    #[must_use]
    pub fn documents(&self, tenant_id: TenantId) -> Vec<GeneratedDocument> {
        let mut docs: Vec<GeneratedDocument> = self
            .state()
            .documents
            .values()
            .filter(|doc| doc.tenant_id == tenant_id)
            .cloned()
            .collect();
        docs.sort_by_key(|doc| (doc.created_at, doc.id));
        docs
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn get(&self, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        Ok(self.state().invoices.get(&id).cloned())
    }

    async fn insert(&self, invoice: &Invoice) -> StoreResult<()> {
        self.commit(WriteSet::default().insert(invoice.clone())).await
    }

    async fn update(&self, invoice: &Invoice, expected_version: u64) -> StoreResult<()> {
        self.commit(WriteSet::default().update(invoice.clone(), expected_version))
            .await
    }

    async fn list_emitted_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Vec<Invoice>> {
        let mut docs: Vec<Invoice> = self
            .state()
            .invoices
            .values()
            .filter(|doc| {
                doc.tenant_id() == tenant_id
                    && doc.issue_date().is_some_and(|date| from <= date && date <= to)
            })
            .cloned()
            .collect();
        docs.sort_by_cached_key(sales_order_key);
        Ok(page_of(docs, page))
    }

    async fn credit_notes_of(
        &self,
        tenant_id: TenantId,
        source_id: InvoiceId,
    ) -> StoreResult<Vec<Invoice>> {
        let mut notes: Vec<Invoice> = self
            .state()
            .invoices
            .values()
            .filter(|doc| {
                doc.tenant_id() == tenant_id
                    && doc.kind() == InvoiceKind::CreditNote
                    && doc.reversal().is_some_and(|link| link.invoice_id == source_id)
            })
            .cloned()
            .collect();
        notes.sort_by_key(|doc| (doc.created_at(), doc.id()));
        Ok(notes)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn list_completed_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Vec<Payment>> {
        let payments = self
            .payments(tenant_id)
            .into_iter()
            .filter(|p| {
                let date = p.paid_at().date_naive();
                p.is_completed() && from <= date && date <= to
            })
            .collect();
        Ok(page_of(payments, page))
    }

    async fn list_by_invoice(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> StoreResult<Vec<Payment>> {
        Ok(self
            .payments(tenant_id)
            .into_iter()
            .filter(|p| p.invoice_id() == invoice_id)
            .collect())
    }
}

#[async_trait]
impl SequenceCounter for MemoryStore {
    async fn current(&self, tenant_id: TenantId, kind: InvoiceKind, year: i32) -> StoreResult<u64> {
        Ok(self.counter_value(tenant_id, kind, year))
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn commit(&self, writes: WriteSet) -> StoreResult<()> {
        let mut state = self.state();
        state.check(&writes)?;
        state.apply(writes);
        Ok(())
    }
}

#[async_trait]
impl DocumentArchive for MemoryStore {
    async fn put(&self, document: GeneratedDocument) -> StoreResult<()> {
        self.commit(WriteSet::default().document(document)).await
    }
}

/// Party records.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    emitters: DashMap<TenantId, Party>,
    clients: DashMap<(TenantId, ClientId), Party>,
}

impl MemoryDirectory {
    /// Sets the tenant's legal profile.
    pub fn set_emitter(&self, tenant_id: TenantId, party: Party) {
        self.emitters.insert(tenant_id, party);
    }

    /// Adds or replaces a client record.
    pub fn set_client(&self, tenant_id: TenantId, client_id: ClientId, party: Party) {
        self.clients.insert((tenant_id, client_id), party);
    }
}

#[async_trait]
impl PartyDirectory for MemoryDirectory {
    async fn client(&self, tenant_id: TenantId, client_id: ClientId) -> StoreResult<Option<Party>> {
        Ok(self
            .clients
            .get(&(tenant_id, client_id))
            .map(|party| party.clone()))
    }

    async fn emitter(&self, tenant_id: TenantId) -> StoreResult<Option<Party>> {
        Ok(self.emitters.get(&tenant_id).map(|party| party.clone()))
    }
}

/// Audit entries in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    entries: tokio::sync::Mutex<Vec<AuditEntry>>,
}

impl MemoryAudit {
    /// Snapshot of all entries.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(&self, entry: AuditEntry) -> StoreResult<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Clock stopped at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add_signed(by).unwrap_or(*now);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-window counters keyed by string.
#[derive(Debug, Default)]
pub struct MemoryRateLimiter {
    windows: DashMap<String, (DateTime<Utc>, u64)>,
}

#[async_trait]
impl RateLimitCounter for MemoryRateLimiter {
    async fn hit(&self, key: &str, window_secs: u64, now: DateTime<Utc>) -> StoreResult<WindowHit> {
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let mut slot = self.windows.entry(key.to_string()).or_insert((now, 0));
        let (start, count) = &mut *slot;
        let mut resets_at = start.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now >= resets_at {
            *start = now;
            *count = 0;
            resets_at = now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
        *count += 1;
        Ok(WindowHit {
            count: *count,
            resets_at,
        })
    }
}

/// Every in-memory adapter, with handles for inspection.
#[derive(Debug, Clone)]
pub struct MemoryPorts {
    /// Documents, payments, counters and artifacts.
    pub store: Arc<MemoryStore>,
    /// Party records.
    pub directory: Arc<MemoryDirectory>,
    /// Audit trail.
    pub audit: Arc<MemoryAudit>,
    /// Clock.
    pub clock: Arc<FixedClock>,
    /// Rate limit windows.
    pub rate_limiter: Arc<MemoryRateLimiter>,
}

impl MemoryPorts {
    /// Empty stores and a clock stopped at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            store: Arc::default(),
            directory: Arc::default(),
            audit: Arc::default(),
            clock: Arc::new(FixedClock::new(now)),
            rate_limiter: Arc::default(),
        }
    }

    /// The adapters as engine ports.
    #[must_use]
    pub fn ports(&self) -> Ports {
        Ports {
            invoices: self.store.clone(),
            payments: self.store.clone(),
            counter: self.store.clone(),
            store: self.store.clone(),
            directory: self.directory.clone(),
            archive: self.store.clone(),
            audit: self.audit.clone(),
            clock: self.clock.clone(),
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}
