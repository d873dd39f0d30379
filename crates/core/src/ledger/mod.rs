//! French accounting ledger export (FEC).
//!
//! - `entry`: the 18-column record layout
//! - `writer`: incremental, per-document entry writer
//! - `export`: whole-period export with deterministic ordering

pub mod entry;
pub mod export;
pub mod writer;

#[cfg(test)]
mod export_props;

pub use entry::{EntrySide, FEC_COLUMNS, JournalLine};
pub use export::{LedgerExport, LedgerExportBuilder, bank_order_key, sales_order_key};
pub use writer::{Journal, LedgerWriter};
