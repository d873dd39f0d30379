//! Invoice lifecycle management.
//!
//! This module implements the invoice state machine and the credit note
//! workflow that reverses issued invoices.
//!
//! # Modules
//!
//! - `types` - Lifecycle domain types (InvoiceStatus, LifecycleAction)
//! - `service` - State transition logic
//! - `credit_note` - Credit note creation

pub mod credit_note;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use credit_note::{CreditNoteOutput, CreditNoteRequest, CreditNoteScope, CreditNoteService};
pub use service::LifecycleService;
pub use types::{InvoiceStatus, LifecycleAction, PaymentStatus};
