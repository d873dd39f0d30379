//! Collaborators consumed by the engine.
//!
//! Persistence, identity and time live outside this crate. Every port is an
//! object-safe async trait so adapters can be swapped behind an `Arc`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use coatbook_core::error::{ComplianceError, DomainInvariantError};
use coatbook_core::invoice::{Invoice, InvoiceKind, Party, Payment};
use coatbook_core::numbering::DocumentNumber;
use coatbook_shared::types::{ClientId, DocumentId, InvoiceId, PageRequest, TenantId, UserId};

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Stored version differs from the expected one.
    #[error("Version conflict on invoice {0}")]
    VersionConflict(InvoiceId),

    /// A unique key is already taken.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// The record to update does not exist.
    #[error("Not found")]
    NotFound,

    /// Backend failure.
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for ComplianceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict(id) => {
                DomainInvariantError::ConcurrentModification(id).into()
            }
            StoreError::Duplicate(key) => DomainInvariantError::DuplicateNumber(key).into(),
            StoreError::NotFound | StoreError::Backend(_) => Self::Persistence(err.to_string()),
        }
    }
}

/// Invoice and credit note storage.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Fetches a document by id, whatever its tenant.
    ///
    /// Callers compare the owning tenant before using the result.
    async fn get(&self, id: InvoiceId) -> StoreResult<Option<Invoice>>;

    /// Stores a new draft.
    async fn insert(&self, invoice: &Invoice) -> StoreResult<()>;

    /// Replaces a draft if its stored version equals `expected_version`.
    async fn update(&self, invoice: &Invoice, expected_version: u64) -> StoreResult<()>;

    /// One page of a tenant's documents emitted between `from` and `to`
    /// inclusive, in sales journal order (`ledger::sales_order_key`).
    async fn list_emitted_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Vec<Invoice>>;

    /// Credit notes issued against a source invoice.
    async fn credit_notes_of(
        &self,
        tenant_id: TenantId,
        source_id: InvoiceId,
    ) -> StoreResult<Vec<Invoice>>;
}

/// Payment storage. Payments are written through [`UnitOfWork::commit`].
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// One page of a tenant's completed payments made between `from` and
    /// `to` inclusive, in bank journal order (`ledger::bank_order_key`).
    async fn list_completed_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Vec<Payment>>;

    /// Payments of one invoice.
    async fn list_by_invoice(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> StoreResult<Vec<Payment>>;
}

/// Per tenant, kind and year numbering counter.
///
/// The counter only moves inside [`UnitOfWork::commit`], together with the
/// document that takes the number.
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    /// Last committed value. Zero before the first document.
    async fn current(&self, tenant_id: TenantId, kind: InvoiceKind, year: i32) -> StoreResult<u64>;
}

/// A document number reserved for one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberClaim {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Sequence the number belongs to.
    pub kind: InvoiceKind,
    /// The number. Its counter must be exactly one above the committed value.
    pub number: DocumentNumber,
}

/// Writes that land together or not at all.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    /// Number taken by the commit.
    pub claim: Option<NumberClaim>,
    /// Replaced documents with the version they were read at.
    pub updates: Vec<(Invoice, u64)>,
    /// New documents.
    pub inserts: Vec<Invoice>,
    /// New payments.
    pub payments: Vec<Payment>,
    /// Generated artifacts.
    pub documents: Vec<GeneratedDocument>,
}

impl WriteSet {
    /// Takes a number.
    #[must_use]
    pub fn claim(mut self, claim: NumberClaim) -> Self {
        self.claim = Some(claim);
        self
    }

    /// Replaces a document read at `expected_version`.
    #[must_use]
    pub fn update(mut self, invoice: Invoice, expected_version: u64) -> Self {
        self.updates.push((invoice, expected_version));
        self
    }

    /// Stores a new document.
    #[must_use]
    pub fn insert(mut self, invoice: Invoice) -> Self {
        self.inserts.push(invoice);
        self
    }

    /// Stores a new payment.
    #[must_use]
    pub fn payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    /// Archives an artifact.
    #[must_use]
    pub fn document(mut self, document: GeneratedDocument) -> Self {
        self.documents.push(document);
        self
    }
}

/// Transactional boundary of the storage backend.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Applies every write of the set or none of them.
    ///
    /// Fails with `VersionConflict` if an updated document moved, and with
    /// `Duplicate` if the claimed number or an id is already taken.
    async fn commit(&self, writes: WriteSet) -> StoreResult<()>;
}

/// Live party records, snapshotted at issuance.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// A client of the tenant.
    async fn client(&self, tenant_id: TenantId, client_id: ClientId) -> StoreResult<Option<Party>>;

    /// The tenant's own legal profile.
    async fn emitter(&self, tenant_id: TenantId) -> StoreResult<Option<Party>>;
}

/// Kind of generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Factur-X XML.
    FacturX,
    /// FEC ledger export.
    LedgerExport,
}

/// A generated, write-once artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// Artifact id.
    pub id: DocumentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Artifact kind.
    pub kind: DocumentKind,
    /// Documents the artifact was generated from.
    pub source_ids: Vec<InvoiceId>,
    /// Content.
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub hash: String,
    /// Generation time.
    pub created_at: DateTime<Utc>,
}

/// Write-once artifact store for documents not tied to a commit.
#[async_trait]
pub trait DocumentArchive: Send + Sync {
    /// Stores an artifact. Fails with `Duplicate` if the id exists.
    async fn put(&self, document: GeneratedDocument) -> StoreResult<()>;
}

/// One audit trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Tenant the action happened in.
    pub tenant_id: TenantId,
    /// Acting user.
    pub actor: UserId,
    /// Action name, e.g. `invoice.issued`.
    pub action: String,
    /// Affected entity.
    pub entity_id: Uuid,
    /// State before the action.
    pub before: Option<serde_json::Value>,
    /// State after the action.
    pub after: Option<serde_json::Value>,
    /// When it happened, from the injected clock.
    pub at: DateTime<Utc>,
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends an entry.
    async fn record(&self, entry: AuditEntry) -> StoreResult<()>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Hit count within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the window, this one included.
    pub count: u64,
    /// When the window ends.
    pub resets_at: DateTime<Utc>,
}

/// Fixed-window counter shared by every engine instance.
#[async_trait]
pub trait RateLimitCounter: Send + Sync {
    /// Records a hit for `key` and returns the window count.
    async fn hit(&self, key: &str, window_secs: u64, now: DateTime<Utc>) -> StoreResult<WindowHit>;
}
