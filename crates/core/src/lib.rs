//! Compliance rules and export builders for Coatbook.
//!
//! This crate contains pure business logic with no I/O, no clock and no
//! logging. Every operation takes its inputs explicitly and returns either a
//! value or an action for the caller to persist.
//!
//! # Modules
//!
//! - `tenancy` - Tenant isolation guard and role permissions
//! - `numbering` - Legal document numbers
//! - `invoice` - Invoice aggregate, totals and validation
//! - `workflow` - Lifecycle transitions and credit notes
//! - `document` - Factur-X (CII EN16931) XML generation
//! - `ledger` - FEC accounting export
//! - `integrity` - Artifact hashes

pub mod allocation;
pub mod document;
pub mod error;
pub mod integrity;
pub mod invoice;
pub mod ledger;
pub mod numbering;
pub mod tenancy;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ComplianceError, DomainInvariantError, IsolationError, ValidationError};
pub use invoice::{Invoice, InvoiceDraft, InvoiceKind, LineItem, Party, Payment};
pub use numbering::{DocumentNumber, NumberFormat};
pub use tenancy::{ActingContext, Permission, Role};
pub use workflow::{InvoiceStatus, LifecycleAction, PaymentStatus};
