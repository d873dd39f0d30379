//! Compliance operations over the storage ports.
//!
//! Every entry point checks the acting tenant before touching any other
//! component. Mutations of one tenant's documents are serialised by a
//! per-tenant lock held for the whole unit of work. Each operation gathers
//! its writes (number claim, documents, payment, artifact) into one
//! [`WriteSet`] committed atomically, and every invoice update carries the
//! version it was read at. The audit entry is appended once the commit
//! succeeded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use coatbook_core::document::FacturXBuilder;
use coatbook_core::error::{ComplianceError, DomainInvariantError, IsolationError, ValidationError};
use coatbook_core::integrity;
use coatbook_core::invoice::{Invoice, InvoiceDraft, InvoiceKind, LineItem, Payment, SaleNature};
use coatbook_core::ledger::{LedgerExport, LedgerWriter, bank_order_key, sales_order_key};
use coatbook_core::numbering::NumberFormat;
use coatbook_core::tenancy::{Access, ActingContext, DenialReason, Permission, authorize};
use coatbook_core::workflow::{
    CreditNoteRequest, CreditNoteService, InvoiceStatus, LifecycleService, PaymentStatus,
};
use coatbook_shared::AppConfig;
use coatbook_shared::config::LedgerConfig;
use coatbook_shared::types::{ClientId, DocumentId, InvoiceId, PageRequest, PaymentId, TenantId};

use crate::ports::{
    AuditEntry, AuditSink, Clock, DocumentArchive, DocumentKind, GeneratedDocument,
    InvoiceRepository, PartyDirectory, PaymentRepository, RateLimitCounter, SequenceCounter,
    UnitOfWork, WriteSet,
};
use crate::sequencer::Sequencer;
use crate::throttle::ExportThrottle;

/// The collaborators the service runs on.
#[derive(Clone)]
pub struct Ports {
    /// Invoice and credit note storage.
    pub invoices: Arc<dyn InvoiceRepository>,
    /// Payment storage.
    pub payments: Arc<dyn PaymentRepository>,
    /// Numbering counters.
    pub counter: Arc<dyn SequenceCounter>,
    /// Atomic commit of an operation's writes.
    pub store: Arc<dyn UnitOfWork>,
    /// Party records.
    pub directory: Arc<dyn PartyDirectory>,
    /// Artifact archive.
    pub archive: Arc<dyn DocumentArchive>,
    /// Audit trail.
    pub audit: Arc<dyn AuditSink>,
    /// Clock.
    pub clock: Arc<dyn Clock>,
    /// Shared rate-limit windows.
    pub rate_limiter: Arc<dyn RateLimitCounter>,
}

/// An issued invoice or credit note with its structured document.
#[derive(Debug, Clone)]
pub struct IssuedDocument {
    /// The frozen document.
    pub invoice: Invoice,
    /// Its legal number.
    pub number: String,
    /// Factur-X XML.
    pub xml: Vec<u8>,
    /// SHA-256 of `xml`.
    pub hash: String,
    /// Archive id of the XML.
    pub document_id: DocumentId,
}

/// State of an invoice after a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    /// The recorded payment.
    pub payment_id: PaymentId,
    /// New invoice status.
    pub status: InvoiceStatus,
    /// New payment status.
    pub payment_status: PaymentStatus,
    /// Cumulative amount paid.
    pub amount_paid: Decimal,
    /// Amount still due once partial credit notes are deducted.
    pub outstanding: Decimal,
}

/// Which documents a ledger export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerSelection {
    /// Documents emitted and payments made within the inclusive range.
    DateRange {
        /// First day.
        from: NaiveDate,
        /// Last day.
        to: NaiveDate,
    },
    /// The listed documents and their payments.
    Invoices(Vec<InvoiceId>),
}

/// Result of a ledger export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerExportOutcome {
    /// An export with at least one entry.
    Generated {
        /// Archive id.
        document_id: DocumentId,
        /// File content.
        bytes: Vec<u8>,
        /// SHA-256 of `bytes`.
        hash: String,
        /// Entries in the sales journal.
        sales_entries: u64,
        /// Entries in the bank journal.
        bank_entries: u64,
    },
    /// Nothing to export. Not archived.
    Empty {
        /// Why nothing was exported.
        reason: String,
    },
}

/// Changes to a draft. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    /// Version the caller read.
    pub version: u64,
    /// Replacement lines.
    pub lines: Option<Vec<LineItem>>,
    /// New client.
    pub client_id: Option<ClientId>,
    /// New due date, or `Some(None)` to clear it.
    pub due_date: Option<Option<NaiveDate>>,
    /// New payment terms.
    pub payment_terms: Option<Option<String>>,
    /// New VAT exemption reason.
    pub exemption_reason: Option<Option<String>>,
    /// Services or goods.
    pub nature: Option<SaleNature>,
}

/// Exclusive hold on one tenant's documents.
///
/// Releasing it drops the tenant's map entry unless another task holds or
/// waits for the same lock.
struct TenantUnit<'a> {
    locks: &'a DashMap<TenantId, Arc<Mutex<()>>>,
    tenant_id: TenantId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TenantUnit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.tenant_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Entry point for every compliance operation.
pub struct ComplianceService {
    ports: Ports,
    ledger: LedgerConfig,
    sequencer: Sequencer,
    throttle: ExportThrottle,
    tenant_locks: DashMap<TenantId, Arc<Mutex<()>>>,
    page_size: u32,
}

fn snapshot<T: Serialize>(value: &T) -> Result<serde_json::Value, ComplianceError> {
    serde_json::to_value(value).map_err(|e| ComplianceError::Persistence(e.to_string()))
}

impl ComplianceService {
    /// Creates the service.
    #[must_use]
    pub fn new(ports: Ports, config: &AppConfig) -> Self {
        Self {
            sequencer: Sequencer::new(
                ports.counter.clone(),
                NumberFormat::from_config(&config.numbering),
            ),
            throttle: ExportThrottle::new(ports.rate_limiter.clone(), config.throttle.clone()),
            ledger: config.ledger.clone(),
            ports,
            tenant_locks: DashMap::new(),
            page_size: PageRequest::default().per_page,
        }
    }

    /// Sets how many records are read per page during exports.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Pure tenant check, logged on denial.
    pub fn authorize_access(
        &self,
        resource_tenant: Option<TenantId>,
        acting_tenant: Option<TenantId>,
    ) -> Access {
        let access = authorize(resource_tenant, acting_tenant);
        if let Access::Denied(reason) = access {
            warn!(
                target: "security",
                resource_tenant = ?resource_tenant,
                acting_tenant = ?acting_tenant,
                reason = reason.as_str(),
                "Access denied"
            );
        }
        access
    }

    /// Tenants with a mutation in flight or queued.
    #[must_use]
    pub fn locked_tenants(&self) -> usize {
        self.tenant_locks.len()
    }

    async fn lock_tenant(&self, tenant_id: TenantId) -> TenantUnit<'_> {
        let lock = Arc::clone(&self.tenant_locks.entry(tenant_id).or_default());
        TenantUnit {
            locks: &self.tenant_locks,
            tenant_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    fn denied(ctx: &ActingContext, err: IsolationError) -> ComplianceError {
        warn!(
            target: "security",
            tenant_id = %ctx.tenant_id,
            user_id = %ctx.user_id,
            reason = err.reason().as_str(),
            "Access denied"
        );
        err.into()
    }

    fn ensure_context(ctx: &ActingContext, permission: Permission) -> Result<(), ComplianceError> {
        ctx.ensure_tenant(ctx.tenant_id)
            .map_err(|e| Self::denied(ctx, e))?;
        ctx.ensure_permission(permission)
    }

    /// Loads a document of the caller's tenant.
    ///
    /// Unknown ids and other tenants' ids fail the same way.
    async fn load(
        &self,
        ctx: &ActingContext,
        id: InvoiceId,
        permission: Permission,
    ) -> Result<Invoice, ComplianceError> {
        ctx.ensure_tenant(ctx.tenant_id)
            .map_err(|e| Self::denied(ctx, e))?;
        let Some(invoice) = self.ports.invoices.get(id).await? else {
            return Err(Self::denied(ctx, IsolationError::new(DenialReason::NotFound)));
        };
        ctx.ensure_tenant(invoice.tenant_id())
            .map_err(|e| Self::denied(ctx, e))?;
        ctx.ensure_permission(permission)?;
        Ok(invoice)
    }

    async fn audit(
        &self,
        ctx: &ActingContext,
        action: &str,
        entity_id: Uuid,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<(), ComplianceError> {
        self.ports
            .audit
            .record(AuditEntry {
                tenant_id: ctx.tenant_id,
                actor: ctx.user_id,
                action: action.to_string(),
                entity_id,
                before,
                after,
                at,
            })
            .await?;
        Ok(())
    }

    fn artifact(
        tenant_id: TenantId,
        kind: DocumentKind,
        source_ids: Vec<InvoiceId>,
        bytes: Vec<u8>,
        hash: String,
        created_at: DateTime<Utc>,
    ) -> GeneratedDocument {
        GeneratedDocument {
            id: DocumentId::new(),
            tenant_id,
            kind,
            source_ids,
            bytes,
            hash,
            created_at,
        }
    }

    /// Creates a draft invoice for a client of the caller's tenant.
    pub async fn create_draft(
        &self,
        ctx: &ActingContext,
        client_id: ClientId,
        draft: InvoiceDraft,
    ) -> Result<Invoice, ComplianceError> {
        Self::ensure_context(ctx, Permission::EditDraft)?;
        if self
            .ports
            .directory
            .client(ctx.tenant_id, client_id)
            .await?
            .is_none()
        {
            return Err(Self::denied(ctx, IsolationError::new(DenialReason::NotFound)));
        }

        let now = self.ports.clock.now();
        let invoice = Invoice::draft(ctx.tenant_id, client_id, draft, now)?;
        self.ports.invoices.insert(&invoice).await?;
        self.audit(
            ctx,
            "invoice.draft_created",
            invoice.id().into_inner(),
            None,
            Some(snapshot(&invoice)?),
            now,
        )
        .await?;

        info!(
            tenant_id = %ctx.tenant_id,
            invoice_id = %invoice.id(),
            "Draft created"
        );
        Ok(invoice)
    }

    /// Edits a draft read at `update.version`.
    pub async fn update_draft(
        &self,
        ctx: &ActingContext,
        invoice_id: InvoiceId,
        update: DraftUpdate,
    ) -> Result<Invoice, ComplianceError> {
        let _unit = self.lock_tenant(ctx.tenant_id).await;

        let mut invoice = self.load(ctx, invoice_id, Permission::EditDraft).await?;
        if invoice.version() != update.version {
            return Err(DomainInvariantError::ConcurrentModification(invoice_id).into());
        }
        let before = snapshot(&invoice)?;

        if let Some(client_id) = update.client_id {
            if self
                .ports
                .directory
                .client(ctx.tenant_id, client_id)
                .await?
                .is_none()
            {
                return Err(Self::denied(ctx, IsolationError::new(DenialReason::NotFound)));
            }
            invoice.set_client(client_id)?;
        }
        if let Some(lines) = update.lines {
            invoice.set_lines(lines)?;
        }
        if let Some(due_date) = update.due_date {
            invoice.set_due_date(due_date)?;
        }
        if let Some(terms) = update.payment_terms {
            invoice.set_payment_terms(terms)?;
        }
        if let Some(reason) = update.exemption_reason {
            invoice.set_exemption_reason(reason)?;
        }
        if let Some(nature) = update.nature {
            invoice.set_nature(nature)?;
        }

        self.ports.invoices.update(&invoice, update.version).await?;
        let now = self.ports.clock.now();
        self.audit(
            ctx,
            "invoice.draft_updated",
            invoice.id().into_inner(),
            Some(before),
            Some(snapshot(&invoice)?),
            now,
        )
        .await?;
        Ok(invoice)
    }

    /// Discards a draft.
    pub async fn cancel_draft(
        &self,
        ctx: &ActingContext,
        invoice_id: InvoiceId,
    ) -> Result<Invoice, ComplianceError> {
        let _unit = self.lock_tenant(ctx.tenant_id).await;

        let mut invoice = self.load(ctx, invoice_id, Permission::EditDraft).await?;
        let expected = invoice.version();
        let before = snapshot(&invoice)?;
        let now = self.ports.clock.now();

        let action = LifecycleService::cancel(&invoice, ctx.user_id, now)?;
        invoice.apply(&action)?;
        self.ports.invoices.update(&invoice, expected).await?;
        self.audit(
            ctx,
            action.name(),
            invoice.id().into_inner(),
            Some(before),
            Some(snapshot(&invoice)?),
            now,
        )
        .await?;

        info!(
            tenant_id = %ctx.tenant_id,
            invoice_id = %invoice.id(),
            "Draft cancelled"
        );
        Ok(invoice)
    }

    /// Issues a draft: snapshots the parties, takes the number and produces
    /// the Factur-X document.
    ///
    /// The number is reserved only after every check passed and consumed by
    /// the same commit that freezes the invoice and archives its XML.
    pub async fn issue_invoice(
        &self,
        ctx: &ActingContext,
        invoice_id: InvoiceId,
    ) -> Result<IssuedDocument, ComplianceError> {
        let _unit = self.lock_tenant(ctx.tenant_id).await;

        let mut invoice = self.load(ctx, invoice_id, Permission::IssueInvoice).await?;
        let expected = invoice.version();
        let before = snapshot(&invoice)?;

        let emitter = self
            .ports
            .directory
            .emitter(ctx.tenant_id)
            .await?
            .ok_or(ValidationError::MissingParty("emitter"))?;
        let recipient = self
            .ports
            .directory
            .client(ctx.tenant_id, invoice.client_id())
            .await?
            .ok_or(ValidationError::MissingParty("recipient"))?;

        let now = self.ports.clock.now();
        LifecycleService::check_issuable(&invoice, &emitter, &recipient, now.date_naive())?;

        let claim = self
            .sequencer
            .reserve(ctx.tenant_id, InvoiceKind::Invoice, now.year())
            .await?;
        let number = claim.number.clone();
        let action =
            LifecycleService::issue(&invoice, number.clone(), emitter, recipient, ctx.user_id, now)?;
        invoice.apply(&action)?;

        let xml = FacturXBuilder::build(&invoice)?;
        let hash = integrity::hash(&xml);
        let document = Self::artifact(
            ctx.tenant_id,
            DocumentKind::FacturX,
            vec![invoice.id()],
            xml.clone(),
            hash.clone(),
            now,
        );
        let document_id = document.id;

        self.ports
            .store
            .commit(
                WriteSet::default()
                    .claim(claim)
                    .update(invoice.clone(), expected)
                    .document(document),
            )
            .await?;
        self.audit(
            ctx,
            action.name(),
            invoice.id().into_inner(),
            Some(before),
            Some(snapshot(&invoice)?),
            now,
        )
        .await?;

        info!(
            tenant_id = %ctx.tenant_id,
            invoice_id = %invoice.id(),
            number = %number,
            total_ttc = %invoice.totals().total_ttc,
            "Invoice issued"
        );
        Ok(IssuedDocument {
            number: number.to_string(),
            invoice,
            xml,
            hash,
            document_id,
        })
    }

    async fn credited_total(
        &self,
        tenant_id: TenantId,
        source_id: InvoiceId,
    ) -> Result<Decimal, ComplianceError> {
        Ok(self
            .ports
            .invoices
            .credit_notes_of(tenant_id, source_id)
            .await?
            .iter()
            .map(|note| note.totals().total_ttc)
            .sum())
    }

    /// Issues a credit note against an issued invoice.
    ///
    /// A full credit note also moves the source to `refunded`, in the same
    /// commit that stores the note.
    pub async fn create_credit_note(
        &self,
        ctx: &ActingContext,
        source_id: InvoiceId,
        request: CreditNoteRequest,
    ) -> Result<IssuedDocument, ComplianceError> {
        let _unit = self.lock_tenant(ctx.tenant_id).await;

        let mut source = self
            .load(ctx, source_id, Permission::IssueCreditNote)
            .await?;
        let expected = source.version();
        let before = snapshot(&source)?;

        let already_credited = self.credited_total(ctx.tenant_id, source_id).await?;
        CreditNoteService::check(&source, already_credited, &request)?;

        let now = self.ports.clock.now();
        let claim = self
            .sequencer
            .reserve(ctx.tenant_id, InvoiceKind::CreditNote, now.year())
            .await?;
        let number = claim.number.clone();
        let output = CreditNoteService::create(
            &source,
            already_credited,
            &request,
            number.clone(),
            ctx.user_id,
            now,
        )?;
        let note = output.credit_note;

        let xml = FacturXBuilder::build(&note)?;
        let hash = integrity::hash(&xml);
        let document = Self::artifact(
            ctx.tenant_id,
            DocumentKind::FacturX,
            vec![note.id(), source.id()],
            xml.clone(),
            hash.clone(),
            now,
        );
        let document_id = document.id;

        let mut writes = WriteSet::default()
            .claim(claim)
            .insert(note.clone())
            .document(document);
        if let Some(action) = &output.source_action {
            source.apply(action)?;
            writes = writes.update(source.clone(), expected);
        }
        self.ports.store.commit(writes).await?;

        if let Some(action) = &output.source_action {
            self.audit(
                ctx,
                action.name(),
                source.id().into_inner(),
                Some(before),
                Some(snapshot(&source)?),
                now,
            )
            .await?;
        }
        self.audit(
            ctx,
            "credit_note.issued",
            note.id().into_inner(),
            None,
            Some(snapshot(&note)?),
            now,
        )
        .await?;

        info!(
            tenant_id = %ctx.tenant_id,
            source_id = %source.id(),
            credit_note_id = %note.id(),
            number = %number,
            total_ttc = %note.totals().total_ttc,
            full = output.source_action.is_some(),
            "Credit note issued"
        );
        Ok(IssuedDocument {
            number: number.to_string(),
            invoice: note,
            xml,
            hash,
            document_id,
        })
    }

    /// Records a completed payment and moves the invoice status.
    ///
    /// Partial credit notes already issued lower the amount still due. The
    /// payment and the new invoice state are committed together.
    pub async fn record_payment_completed(
        &self,
        ctx: &ActingContext,
        invoice_id: InvoiceId,
        amount: Decimal,
        paid_at: DateTime<Utc>,
        reference: &str,
    ) -> Result<PaymentOutcome, ComplianceError> {
        let _unit = self.lock_tenant(ctx.tenant_id).await;

        let mut invoice = self.load(ctx, invoice_id, Permission::RecordPayment).await?;
        let expected = invoice.version();
        let before = snapshot(&invoice)?;

        let already_credited = self.credited_total(ctx.tenant_id, invoice_id).await?;
        let payment = Payment::completed(ctx.tenant_id, invoice_id, amount, paid_at, reference)?;
        let action = LifecycleService::record_payment(&invoice, &payment, already_credited)?;
        invoice.apply(&action)?;

        self.ports
            .store
            .commit(
                WriteSet::default()
                    .update(invoice.clone(), expected)
                    .payment(payment.clone()),
            )
            .await?;
        let now = self.ports.clock.now();
        self.audit(
            ctx,
            action.name(),
            invoice.id().into_inner(),
            Some(before),
            Some(snapshot(&invoice)?),
            now,
        )
        .await?;

        info!(
            tenant_id = %ctx.tenant_id,
            invoice_id = %invoice.id(),
            payment_id = %payment.id(),
            amount = %payment.amount(),
            status = invoice.status().as_str(),
            "Payment recorded"
        );
        Ok(PaymentOutcome {
            payment_id: payment.id(),
            status: invoice.status(),
            payment_status: invoice.payment_status(),
            amount_paid: invoice.amount_paid(),
            outstanding: LifecycleService::amount_due(&invoice, already_credited),
        })
    }

    /// Generates the FEC export of a selection.
    ///
    /// A date range is streamed into the writer one page at a time: sales
    /// documents first, then payments with the invoices they settle looked
    /// up per page. A failed read is an error, never an empty export.
    pub async fn export_ledger(
        &self,
        ctx: &ActingContext,
        selection: LedgerSelection,
    ) -> Result<LedgerExportOutcome, ComplianceError> {
        Self::ensure_context(ctx, Permission::ExportLedger)?;
        let now = self.ports.clock.now();
        self.throttle.check(ctx, now).await?;

        let mut writer = LedgerWriter::new(&self.ledger);
        let source_ids = match &selection {
            LedgerSelection::DateRange { from, to } => {
                let written = self.write_sales_between(ctx, *from, *to, &mut writer).await?;
                self.write_bank_between(ctx, *from, *to, &mut writer).await?;
                written
            }
            LedgerSelection::Invoices(ids) => self.write_selected(ctx, ids, &mut writer).await?,
        };
        let export = LedgerExport::from(writer);

        if export.is_empty() {
            info!(
                tenant_id = %ctx.tenant_id,
                "Ledger export empty"
            );
            return Ok(LedgerExportOutcome::Empty {
                reason: "no issued document or completed payment in selection".to_string(),
            });
        }

        let hash = integrity::hash(&export.bytes);
        let document = Self::artifact(
            ctx.tenant_id,
            DocumentKind::LedgerExport,
            source_ids,
            export.bytes.clone(),
            hash.clone(),
            now,
        );
        let document_id = document.id;
        self.ports.archive.put(document).await?;

        info!(
            tenant_id = %ctx.tenant_id,
            document_id = %document_id,
            sales_entries = export.sales_entries,
            bank_entries = export.bank_entries,
            "Ledger exported"
        );
        Ok(LedgerExportOutcome::Generated {
            document_id,
            bytes: export.bytes,
            hash,
            sales_entries: export.sales_entries,
            bank_entries: export.bank_entries,
        })
    }

    async fn write_sales_between(
        &self,
        ctx: &ActingContext,
        from: NaiveDate,
        to: NaiveDate,
        writer: &mut LedgerWriter<'_>,
    ) -> Result<Vec<InvoiceId>, ComplianceError> {
        let mut written = Vec::new();
        let mut page = PageRequest::first(self.page_size);
        loop {
            let batch = self
                .ports
                .invoices
                .list_emitted_between(ctx.tenant_id, from, to, page)
                .await?;
            let last = page.is_last(batch.len());
            for invoice in batch.iter().filter(|i| i.tenant_id() == ctx.tenant_id) {
                if writer.push_invoice(invoice)? {
                    written.push(invoice.id());
                }
            }
            if last {
                return Ok(written);
            }
            page = page.next();
        }
    }

    async fn write_bank_between(
        &self,
        ctx: &ActingContext,
        from: NaiveDate,
        to: NaiveDate,
        writer: &mut LedgerWriter<'_>,
    ) -> Result<(), ComplianceError> {
        let mut page = PageRequest::first(self.page_size);
        loop {
            let batch = self
                .ports
                .payments
                .list_completed_between(ctx.tenant_id, from, to, page)
                .await?;
            let last = page.is_last(batch.len());

            let mut settled: HashMap<InvoiceId, Option<Invoice>> = HashMap::new();
            for id in batch.iter().map(Payment::invoice_id) {
                if settled.contains_key(&id) {
                    continue;
                }
                let invoice = self
                    .ports
                    .invoices
                    .get(id)
                    .await?
                    .filter(|i| i.tenant_id() == ctx.tenant_id);
                settled.insert(id, invoice);
            }
            for payment in batch.iter().filter(|p| p.tenant_id() == ctx.tenant_id) {
                let invoice = settled.get(&payment.invoice_id()).and_then(Option::as_ref);
                writer.push_payment(payment, invoice)?;
            }

            if last {
                return Ok(());
            }
            page = page.next();
        }
    }

    /// Writes the listed documents and their payments.
    ///
    /// Any id that is unknown or belongs to another tenant denies the whole
    /// export.
    async fn write_selected(
        &self,
        ctx: &ActingContext,
        ids: &[InvoiceId],
        writer: &mut LedgerWriter<'_>,
    ) -> Result<Vec<InvoiceId>, ComplianceError> {
        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(ids.len());
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let invoice = self
                .ports
                .invoices
                .get(id)
                .await?
                .filter(|i| i.tenant_id() == ctx.tenant_id)
                .ok_or_else(|| Self::denied(ctx, IsolationError::new(DenialReason::NotFound)))?;
            selected.push(invoice);
        }
        selected.sort_by_cached_key(sales_order_key);

        let mut written = Vec::new();
        for invoice in &selected {
            if writer.push_invoice(invoice)? {
                written.push(invoice.id());
            }
        }

        let mut payments = Vec::new();
        for invoice in &selected {
            payments.extend(
                self.ports
                    .payments
                    .list_by_invoice(ctx.tenant_id, invoice.id())
                    .await?,
            );
        }
        payments.sort_by_cached_key(bank_order_key);
        let by_id: HashMap<InvoiceId, &Invoice> = selected.iter().map(|i| (i.id(), i)).collect();
        for payment in &payments {
            writer.push_payment(payment, by_id.get(&payment.invoice_id()).copied())?;
        }
        Ok(written)
    }
}
