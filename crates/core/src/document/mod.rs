//! Structured electronic invoice documents (Factur-X / CII, EN 16931).

pub mod escape;
pub mod facturx;
mod xml;

#[cfg(test)]
mod facturx_props;

pub use facturx::{EN16931_GUIDELINE, FacturXBuilder};
