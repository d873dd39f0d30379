//! Whole-period FEC export.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use coatbook_shared::config::LedgerConfig;
use coatbook_shared::types::{InvoiceId, PaymentId};

use crate::error::ValidationError;
use crate::invoice::{Invoice, Payment};
use crate::ledger::writer::{Journal, LedgerWriter};

/// A generated export with its entry counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerExport {
    /// File content.
    pub bytes: Vec<u8>,
    /// Entries written to the sales journal.
    pub sales_entries: u64,
    /// Entries written to the bank journal.
    pub bank_entries: u64,
}

impl LedgerExport {
    /// Returns true if no entry was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sales_entries == 0 && self.bank_entries == 0
    }
}

impl From<LedgerWriter<'_>> for LedgerExport {
    fn from(writer: LedgerWriter<'_>) -> Self {
        let sales_entries = writer.entry_count(Journal::Sales);
        let bank_entries = writer.entry_count(Journal::Bank);
        Self {
            bytes: writer.finish(),
            sales_entries,
            bank_entries,
        }
    }
}

/// Position of a document in the sales journal: emission date, number, id.
///
/// Storage adapters that stream documents into a [`LedgerWriter`] return
/// them in this order.
#[must_use]
pub fn sales_order_key(invoice: &Invoice) -> (Option<NaiveDate>, Option<String>, InvoiceId) {
    (
        invoice.issue_date(),
        invoice.number().map(ToString::to_string),
        invoice.id(),
    )
}

/// Position of a payment in the bank journal: payment time, reference, id.
#[must_use]
pub fn bank_order_key(payment: &Payment) -> (DateTime<Utc>, String, PaymentId) {
    (payment.paid_at(), payment.reference().to_string(), payment.id())
}

/// Builds FEC exports from invoices, credit notes and payments.
pub struct LedgerExportBuilder;

impl LedgerExportBuilder {
    /// Builds the export bytes.
    ///
    /// Sales entries come first, ordered by emission date then number, then
    /// bank entries ordered by payment date then reference. Input order does
    /// not matter.
    pub fn build(
        config: &LedgerConfig,
        invoices: &[Invoice],
        payments: &[Payment],
    ) -> Result<Vec<u8>, ValidationError> {
        Self::export(config, invoices, payments).map(|export| export.bytes)
    }

    /// Builds the export and reports how many entries it holds.
    pub fn export(
        config: &LedgerConfig,
        invoices: &[Invoice],
        payments: &[Payment],
    ) -> Result<LedgerExport, ValidationError> {
        Self::export_with_references(config, invoices, payments, &[])
    }

    /// Like [`Self::export`], resolving payments also against `references`.
    ///
    /// Reference invoices only provide the piece data of bank entries; they
    /// never produce sales entries themselves.
    pub fn export_with_references(
        config: &LedgerConfig,
        invoices: &[Invoice],
        payments: &[Payment],
        references: &[Invoice],
    ) -> Result<LedgerExport, ValidationError> {
        let by_id: HashMap<InvoiceId, &Invoice> = references
            .iter()
            .chain(invoices)
            .map(|i| (i.id(), i))
            .collect();

        let mut sales: Vec<&Invoice> = invoices.iter().collect();
        sales.sort_by_cached_key(|i| sales_order_key(i));

        let mut bank: Vec<&Payment> = payments.iter().collect();
        bank.sort_by_cached_key(|p| bank_order_key(p));

        let mut writer = LedgerWriter::new(config);
        for invoice in sales {
            writer.push_invoice(invoice)?;
        }
        for payment in bank {
            let invoice = by_id.get(&payment.invoice_id()).copied();
            writer.push_payment(payment, invoice)?;
        }

        Ok(writer.into())
    }
}
