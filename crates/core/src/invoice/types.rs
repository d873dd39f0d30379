//! Invoice value types: parties, line items, totals, payments.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use coatbook_shared::types::money::round_amount;
use coatbook_shared::types::{InvoiceId, PaymentId, TenantId};

use crate::error::ValidationError;

/// UN/ECE recommendation 20 code for "one unit".
pub const DEFAULT_UNIT_CODE: &str = "C62";

/// Kind of sales document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Commercial invoice.
    Invoice,
    /// Credit note (avoir) reversing an invoice.
    CreditNote,
}

impl InvoiceKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::CreditNote => "credit_note",
        }
    }

    /// UNTDID 1001 document type code.
    #[must_use]
    pub fn type_code(&self) -> &'static str {
        match self {
            Self::Invoice => "380",
            Self::CreditNote => "381",
        }
    }
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being sold. Picks the revenue account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleNature {
    /// Coating work and other services.
    #[default]
    Services,
    /// Resold goods.
    Goods,
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street line.
    pub street: String,
    /// Postal code.
    pub postal_code: String,
    /// City.
    pub city: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
}

/// Contact channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// E-mail address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
}

/// Bank account receiving transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    /// IBAN, with or without spaces.
    pub iban: String,
    /// BIC / SWIFT code.
    pub bic: String,
}

/// A legal party (seller or buyer) as frozen on the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Legal name.
    pub name: String,
    /// SIRET.
    pub tax_id: Option<String>,
    /// Intra-community VAT number.
    pub vat_number: Option<String>,
    /// Postal address.
    pub address: Address,
    /// Contact channels.
    #[serde(default)]
    pub contact: Contact,
    /// Bank details. Emitter only.
    pub bank: Option<BankDetails>,
    /// Auxiliary ledger account of a customer.
    pub account_code: Option<String>,
}

/// One billed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Description of the goods or service.
    pub designation: String,
    /// Billed quantity.
    pub quantity: Decimal,
    /// Unit price excluding tax.
    pub unit_price_ht: Decimal,
    /// VAT rate in percent.
    pub tax_rate: Decimal,
    /// UN/ECE rec 20 unit code.
    #[serde(default = "default_unit_code")]
    pub unit_code: String,
    /// `round(quantity * unit_price_ht, 2)`.
    pub line_total_ht: Decimal,
}

fn default_unit_code() -> String {
    DEFAULT_UNIT_CODE.to_string()
}

impl LineItem {
    /// Creates a line item and computes its total.
    #[must_use]
    pub fn new(
        designation: impl Into<String>,
        quantity: Decimal,
        unit_price_ht: Decimal,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            designation: designation.into(),
            quantity,
            unit_price_ht,
            tax_rate,
            unit_code: default_unit_code(),
            line_total_ht: round_amount(quantity * unit_price_ht),
        }
    }

    /// Overrides the unit code.
    #[must_use]
    pub fn with_unit_code(mut self, unit_code: impl Into<String>) -> Self {
        self.unit_code = unit_code.into();
        self
    }
}

/// Derived document totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line totals excluding tax.
    pub total_ht: Decimal,
    /// Total VAT.
    pub total_tva: Decimal,
    /// Total including tax.
    pub total_ttc: Decimal,
}

/// VAT subtotal for one rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSubtotal {
    /// VAT rate in percent.
    pub rate: Decimal,
    /// Taxable basis at this rate.
    pub basis: Decimal,
    /// VAT amount at this rate.
    pub amount: Decimal,
}

/// Reference from a credit note to the invoice it reverses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalLink {
    /// Source invoice.
    pub invoice_id: InvoiceId,
    /// Source invoice number.
    pub number: String,
    /// Source emission date.
    pub issue_date: NaiveDate,
}

/// Settlement state of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    /// Awaiting the provider.
    Pending,
    /// Funds received.
    Completed,
    /// Provider reported a failure.
    Failed,
}

/// A payment against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    tenant_id: TenantId,
    invoice_id: InvoiceId,
    amount: Decimal,
    status: PaymentRecordStatus,
    paid_at: DateTime<Utc>,
    reference: String,
}

impl Payment {
    /// Creates a payment record.
    pub fn new(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        amount: Decimal,
        status: PaymentRecordStatus,
        paid_at: DateTime<Utc>,
        reference: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePaymentAmount);
        }
        if reference.trim().is_empty() {
            return Err(ValidationError::PaymentReferenceRequired);
        }
        Ok(Self {
            id: PaymentId::new(),
            tenant_id,
            invoice_id,
            amount: round_amount(amount),
            status,
            paid_at,
            reference,
        })
    }

    /// Creates a completed payment record.
    pub fn completed(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        amount: Decimal,
        paid_at: DateTime<Utc>,
        reference: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::new(
            tenant_id,
            invoice_id,
            amount,
            PaymentRecordStatus::Completed,
            paid_at,
            reference,
        )
    }

    /// Payment id.
    #[must_use]
    pub fn id(&self) -> PaymentId {
        self.id
    }

    /// Owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Paid invoice.
    #[must_use]
    pub fn invoice_id(&self) -> InvoiceId {
        self.invoice_id
    }

    /// Amount received.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Record status.
    #[must_use]
    pub fn status(&self) -> PaymentRecordStatus {
        self.status
    }

    /// Returns true once the funds are received.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentRecordStatus::Completed
    }

    /// When the funds were received.
    #[must_use]
    pub fn paid_at(&self) -> DateTime<Utc> {
        self.paid_at
    }

    /// Bank or provider reference.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }
}
