//! Incremental FEC writer.
//!
//! Output is UTF-8 with a leading BOM, tab-separated, CRLF-terminated.
//! Each push computes every line of the entry before appending any, so a
//! rejected document leaves the output and the entry counters untouched.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use coatbook_shared::config::{AccountConfig, JournalConfig, LedgerConfig};

use crate::error::ValidationError;
use crate::invoice::{Invoice, InvoiceKind, Party, Payment, SaleNature};
use crate::ledger::entry::{EntrySide, FEC_COLUMNS, JournalLine};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const CRLF: &str = "\r\n";

/// Which journal an entry lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Journal {
    /// Sales journal (invoices and credit notes).
    Sales,
    /// Bank journal (payments).
    Bank,
}

/// Writes journal entries one document at a time.
pub struct LedgerWriter<'a> {
    config: &'a LedgerConfig,
    out: Vec<u8>,
    sales_entries: u64,
    bank_entries: u64,
}

impl<'a> LedgerWriter<'a> {
    /// Starts an export: BOM and header row.
    #[must_use]
    pub fn new(config: &'a LedgerConfig) -> Self {
        let mut out = Vec::with_capacity(16 * 1024);
        out.extend_from_slice(BOM);
        out.extend_from_slice(FEC_COLUMNS.join("\t").as_bytes());
        out.extend_from_slice(CRLF.as_bytes());
        Self {
            config,
            out,
            sales_entries: 0,
            bank_entries: 0,
        }
    }

    /// Number of entries written to a journal.
    #[must_use]
    pub fn entry_count(&self, journal: Journal) -> u64 {
        match journal {
            Journal::Sales => self.sales_entries,
            Journal::Bank => self.bank_entries,
        }
    }

    /// Returns true while nothing but the header was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sales_entries == 0 && self.bank_entries == 0
    }

    /// Writes the sales entry of an invoice or credit note.
    ///
    /// Returns `Ok(false)` for documents that are not issued or carry no
    /// number: those never reach the books.
    pub fn push_invoice(&mut self, invoice: &Invoice) -> Result<bool, ValidationError> {
        let (Some(number), Some(date)) = (invoice.number(), invoice.issue_date()) else {
            return Ok(false);
        };
        if !invoice.is_issued() {
            return Ok(false);
        }
        self.ensure_currency(invoice)?;
        let recipient = invoice
            .recipient()
            .ok_or(ValidationError::MissingParty("recipient"))?;

        let number = number.to_string();
        let (label, flip) = match invoice.kind() {
            InvoiceKind::Invoice => (format!("Facture {number} {}", recipient.name), false),
            InvoiceKind::CreditNote => (format!("Avoir {number} {}", recipient.name), true),
        };
        let side = |natural: EntrySide| if flip { natural.opposite() } else { natural };

        let totals = invoice.totals();
        let revenue = match invoice.nature() {
            SaleNature::Services => &self.config.services_revenue_account,
            SaleNature::Goods => &self.config.goods_revenue_account,
        };

        let mut legs: Vec<(&AccountConfig, Option<(String, String)>, EntrySide, Decimal)> = vec![
            (
                &self.config.receivable_account,
                auxiliary(recipient),
                side(EntrySide::Debit),
                totals.total_ttc,
            ),
            (revenue, None, side(EntrySide::Credit), totals.total_ht),
        ];
        if !totals.total_tva.is_zero() {
            for subtotal in invoice.tax_breakdown() {
                if subtotal.amount.is_zero() {
                    continue;
                }
                let account = self
                    .config
                    .vat_account(subtotal.rate)
                    .ok_or(ValidationError::UnsupportedTaxRate(subtotal.rate))?;
                legs.push((account, None, side(EntrySide::Credit), subtotal.amount));
            }
        }

        let entry_number = self.sales_entries + 1;
        let journal = &self.config.sales_journal;
        let lines: Vec<JournalLine> = legs
            .into_iter()
            .map(|(account, aux, side, amount)| {
                journal_line(
                    journal,
                    entry_number,
                    date,
                    account,
                    aux,
                    &number,
                    date,
                    &label,
                    side,
                    amount,
                )
            })
            .collect();

        self.append(&lines);
        self.sales_entries = entry_number;
        Ok(true)
    }

    /// Writes the bank entry of a completed payment.
    ///
    /// Returns `Ok(false)` for payments that are not completed or whose
    /// invoice is unknown or carries no number.
    pub fn push_payment(
        &mut self,
        payment: &Payment,
        invoice: Option<&Invoice>,
    ) -> Result<bool, ValidationError> {
        if !payment.is_completed() {
            return Ok(false);
        }
        let Some(invoice) = invoice.filter(|i| i.id() == payment.invoice_id()) else {
            return Ok(false);
        };
        let (Some(number), Some(invoice_date)) = (invoice.number(), invoice.issue_date()) else {
            return Ok(false);
        };
        self.ensure_currency(invoice)?;

        let number = number.to_string();
        let date = payment.paid_at().date_naive();
        let label = format!("Règlement {number} {}", payment.reference());
        let aux = invoice.recipient().and_then(auxiliary);

        let entry_number = self.bank_entries + 1;
        let journal = &self.config.bank_journal;
        let lines = [
            journal_line(
                journal,
                entry_number,
                date,
                &self.config.bank_account,
                None,
                &number,
                invoice_date,
                &label,
                EntrySide::Debit,
                payment.amount(),
            ),
            journal_line(
                journal,
                entry_number,
                date,
                &self.config.receivable_account,
                aux,
                &number,
                invoice_date,
                &label,
                EntrySide::Credit,
                payment.amount(),
            ),
        ];

        self.append(&lines);
        self.bank_entries = entry_number;
        Ok(true)
    }

    /// Returns the export bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    fn ensure_currency(&self, invoice: &Invoice) -> Result<(), ValidationError> {
        let code = invoice.currency().code();
        if code.eq_ignore_ascii_case(&self.config.functional_currency) {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedCurrency {
                currency: code.to_string(),
                functional: self.config.functional_currency.clone(),
            })
        }
    }

    fn append(&mut self, lines: &[JournalLine]) {
        for line in lines {
            self.out.extend_from_slice(line.to_record().as_bytes());
            self.out.extend_from_slice(CRLF.as_bytes());
        }
    }
}

fn auxiliary(party: &Party) -> Option<(String, String)> {
    party
        .account_code
        .as_ref()
        .filter(|code| !code.trim().is_empty())
        .map(|code| (code.clone(), party.name.clone()))
}

#[allow(clippy::too_many_arguments)]
fn journal_line(
    journal: &JournalConfig,
    entry_number: u64,
    entry_date: NaiveDate,
    account: &AccountConfig,
    auxiliary: Option<(String, String)>,
    piece_ref: &str,
    piece_date: NaiveDate,
    label: &str,
    side: EntrySide,
    amount: Decimal,
) -> JournalLine {
    JournalLine {
        journal_code: journal.code.clone(),
        journal_label: journal.label.clone(),
        entry_number,
        entry_date,
        account_number: account.number.clone(),
        account_label: account.label.clone(),
        auxiliary,
        piece_ref: piece_ref.to_string(),
        piece_date,
        label: label.to_string(),
        side,
        amount,
        valid_date: entry_date,
    }
}
