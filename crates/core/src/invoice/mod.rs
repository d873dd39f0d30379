//! Invoice and credit note model.
//!
//! - `types` - Parties, line items, totals, payments
//! - `model` - The `Invoice` aggregate and its draft-only editing API
//! - `totals` - Totals and per-rate tax breakdown
//! - `validation` - Party, bank and line item checks

pub mod model;
pub mod totals;
pub mod types;
pub mod validation;

#[cfg(test)]
mod totals_props;

pub use model::{Invoice, InvoiceDraft};
pub use totals::tax_breakdown;
pub use types::{
    Address, BankDetails, Contact, InvoiceKind, LineItem, Party, Payment, PaymentRecordStatus,
    ReversalLink, SaleNature, TaxSubtotal, Totals,
};
