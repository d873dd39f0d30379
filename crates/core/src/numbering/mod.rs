//! Document numbering.
//!
//! Numbers look like `FC-2025-0001`: prefix per document kind, emission
//! year, zero-padded counter. The counter itself lives behind the storage
//! port; this module only formats and parses.

mod format;

pub use format::{DocumentNumber, NumberFormat};
