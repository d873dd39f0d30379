//! Async orchestration of Coatbook compliance operations.
//!
//! `coatbook-core` holds the rules; this crate runs them against storage,
//! identity and time collaborators expressed as ports.
//!
//! # Modules
//!
//! - `ports` - Repository, counter, unit of work, archive, audit, clock and
//!   rate-limit traits
//! - `memory` - In-memory adapters for every port
//! - `sequencer` - Document numbering over the counter port
//! - `throttle` - Ledger export throttling
//! - `service` - `ComplianceService`, the external operations
//! - `telemetry` - Tracing subscriber setup

pub mod memory;
pub mod ports;
pub mod sequencer;
pub mod service;
pub mod telemetry;
pub mod throttle;

pub use memory::{MemoryPorts, MemoryStore};
pub use ports::{DocumentKind, GeneratedDocument, NumberClaim, StoreError, UnitOfWork, WriteSet};
pub use sequencer::Sequencer;
pub use service::{
    ComplianceService, DraftUpdate, IssuedDocument, LedgerExportOutcome, LedgerSelection,
    PaymentOutcome, Ports,
};
pub use throttle::ExportThrottle;
