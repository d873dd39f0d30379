//! Journal lines of the FEC export.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use coatbook_shared::types::money::format_amount_comma;

/// The 18 mandatory FEC columns, in order.
pub const FEC_COLUMNS: [&str; 18] = [
    "JournalCode",
    "JournalLib",
    "EcritureNum",
    "EcritureDate",
    "CompteNum",
    "CompteLib",
    "CompAuxNum",
    "CompAuxLib",
    "PieceRef",
    "PieceDate",
    "EcritureLib",
    "Debit",
    "Credit",
    "EcritureLet",
    "DateLet",
    "ValidDate",
    "Montantdevise",
    "Idevise",
];

/// Side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    /// Debit.
    Debit,
    /// Credit.
    Credit,
}

impl EntrySide {
    /// The other side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// One row of the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// `JournalCode`.
    pub journal_code: String,
    /// `JournalLib`.
    pub journal_label: String,
    /// `EcritureNum`, sequential per journal.
    pub entry_number: u64,
    /// `EcritureDate`.
    pub entry_date: NaiveDate,
    /// `CompteNum`.
    pub account_number: String,
    /// `CompteLib`.
    pub account_label: String,
    /// `CompAuxNum` and `CompAuxLib`.
    pub auxiliary: Option<(String, String)>,
    /// `PieceRef`.
    pub piece_ref: String,
    /// `PieceDate`.
    pub piece_date: NaiveDate,
    /// `EcritureLib`.
    pub label: String,
    /// Debit or credit.
    pub side: EntrySide,
    /// Always positive, two decimals.
    pub amount: Decimal,
    /// `ValidDate`.
    pub valid_date: NaiveDate,
}

impl JournalLine {
    /// Debit column value.
    #[must_use]
    pub fn debit(&self) -> Decimal {
        match self.side {
            EntrySide::Debit => self.amount,
            EntrySide::Credit => Decimal::ZERO,
        }
    }

    /// Credit column value.
    #[must_use]
    pub fn credit(&self) -> Decimal {
        match self.side {
            EntrySide::Debit => Decimal::ZERO,
            EntrySide::Credit => self.amount,
        }
    }

    /// The tab-separated record, without line terminator.
    #[must_use]
    pub fn to_record(&self) -> String {
        let (aux_number, aux_label) = self
            .auxiliary
            .as_ref()
            .map_or(("", ""), |(n, l)| (n.as_str(), l.as_str()));
        let fields: [String; 18] = [
            sanitize(&self.journal_code),
            sanitize(&self.journal_label),
            self.entry_number.to_string(),
            format_date(self.entry_date),
            sanitize(&self.account_number),
            sanitize(&self.account_label),
            sanitize(aux_number),
            sanitize(aux_label),
            sanitize(&self.piece_ref),
            format_date(self.piece_date),
            sanitize(&self.label),
            format_amount_comma(self.debit()),
            format_amount_comma(self.credit()),
            String::new(),
            String::new(),
            format_date(self.valid_date),
            String::new(),
            String::new(),
        ];
        fields.join("\t")
    }
}

/// `YYYYMMDD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Replaces the field and record separators with spaces.
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\t' | '\r' | '\n') { ' ' } else { c })
        .collect()
}
