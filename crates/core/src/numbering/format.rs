use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use coatbook_shared::config::NumberingConfig;

use crate::error::ValidationError;
use crate::invoice::InvoiceKind;

/// A legal document number.
///
/// Padding is presentation only: two numbers are equal when prefix, year and
/// counter match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNumber {
    prefix: String,
    year: i32,
    sequence: u64,
    width: usize,
}

impl DocumentNumber {
    /// Creates a number. `sequence` starts at 1.
    pub fn new(
        prefix: impl Into<String>,
        year: i32,
        sequence: u64,
        width: usize,
    ) -> Result<Self, ValidationError> {
        let prefix = prefix.into();
        if sequence == 0
            || prefix.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
            || !(1000..=9999).contains(&year)
        {
            return Err(ValidationError::InvalidDocumentNumber(format!(
                "{prefix}-{year}-{sequence}"
            )));
        }
        Ok(Self {
            prefix,
            year,
            sequence,
            width,
        })
    }

    /// Parses `PREFIX-YYYY-NNNN`. The counter may be wider than four digits.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDocumentNumber(s.to_string());
        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(year), Some(counter)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if year.len() != 4
            || !year.bytes().all(|b| b.is_ascii_digit())
            || counter.is_empty()
            || !counter.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let sequence: u64 = counter.parse().map_err(|_| invalid())?;
        Self::new(prefix, year, sequence, counter.len()).map_err(|_| invalid())
    }

    /// Document kind prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Emission year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Counter value.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl PartialEq for DocumentNumber {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix && self.year == other.year && self.sequence == other.sequence
    }
}

impl Eq for DocumentNumber {}

impl Hash for DocumentNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prefix.hash(state);
        self.year.hash(state);
        self.sequence.hash(state);
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:0width$}",
            self.prefix,
            self.year,
            self.sequence,
            width = self.width
        )
    }
}

/// Maps document kinds to prefixes and pads counters.
#[derive(Debug, Clone)]
pub struct NumberFormat {
    invoice_prefix: String,
    credit_note_prefix: String,
    width: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::from_config(&NumberingConfig::default())
    }
}

impl NumberFormat {
    /// Builds the format from configuration.
    #[must_use]
    pub fn from_config(config: &NumberingConfig) -> Self {
        Self {
            invoice_prefix: config.invoice_prefix.clone(),
            credit_note_prefix: config.credit_note_prefix.clone(),
            width: config.counter_width,
        }
    }

    /// Prefix used for a document kind.
    #[must_use]
    pub fn prefix(&self, kind: InvoiceKind) -> &str {
        match kind {
            InvoiceKind::Invoice => &self.invoice_prefix,
            InvoiceKind::CreditNote => &self.credit_note_prefix,
        }
    }

    /// Formats the `sequence`-th number of `kind` in `year`.
    pub fn number(
        &self,
        kind: InvoiceKind,
        year: i32,
        sequence: u64,
    ) -> Result<DocumentNumber, ValidationError> {
        DocumentNumber::new(self.prefix(kind), year, sequence, self.width)
    }
}
