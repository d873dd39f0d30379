//! Input validation for parties and line items.

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::invoice::types::{BankDetails, LineItem, Party};

use coatbook_shared::types::money::round_amount;

/// VAT rates accepted on a line, in percent.
#[must_use]
pub fn supported_tax_rates() -> [Decimal; 5] {
    [
        Decimal::ZERO,
        Decimal::new(21, 1),
        Decimal::new(55, 1),
        Decimal::new(10, 0),
        Decimal::new(20, 0),
    ]
}

/// Returns true if `rate` is a supported VAT rate, whatever its scale.
#[must_use]
pub fn is_supported_tax_rate(rate: Decimal) -> bool {
    supported_tax_rates()
        .iter()
        .any(|r| r.normalize() == rate.normalize())
}

/// Validates every line. Does not require the list to be non-empty.
pub fn validate_line_items(lines: &[LineItem]) -> Result<(), ValidationError> {
    for (idx, line) in lines.iter().enumerate() {
        let pos = idx + 1;
        if line.designation.trim().is_empty() {
            return Err(ValidationError::EmptyDesignation { line: pos });
        }
        if line.quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity { line: pos });
        }
        if line.unit_price_ht < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitPrice { line: pos });
        }
        if !is_supported_tax_rate(line.tax_rate) {
            return Err(ValidationError::UnsupportedTaxRate(line.tax_rate));
        }
        let expected = round_amount(line.quantity * line.unit_price_ht);
        if line.line_total_ht != expected {
            return Err(ValidationError::LineTotalMismatch {
                line: pos,
                expected,
                actual: line.line_total_ht,
            });
        }
    }
    Ok(())
}

/// Validates a party snapshot. `role` names the party in errors.
pub fn validate_party(party: &Party, role: &'static str) -> Result<(), ValidationError> {
    let required = [
        ("name", &party.name),
        ("street", &party.address.street),
        ("postal code", &party.address.postal_code),
        ("city", &party.address.city),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyPartyField { party: role, field });
        }
    }
    validate_country_code(&party.address.country_code)?;
    if let Some(tax_id) = &party.tax_id {
        validate_siret(tax_id)?;
    }
    if let Some(vat) = &party.vat_number {
        validate_vat_number(vat)?;
    }
    if let Some(email) = &party.contact.email {
        validate_email(email)?;
    }
    if let Some(bank) = &party.bank {
        validate_bank_details(bank)?;
    }
    Ok(())
}

/// Two uppercase ASCII letters.
pub fn validate_country_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCountryCode(code.to_string()))
    }
}

/// SIRET: 14 digits, spaces ignored.
pub fn validate_siret(siret: &str) -> Result<(), ValidationError> {
    let digits = compact(siret);
    if digits.len() == 14 && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTaxId(siret.to_string()))
    }
}

/// Country prefix then 2 to 13 alphanumerics, spaces ignored.
pub fn validate_vat_number(vat: &str) -> Result<(), ValidationError> {
    let compacted = compact(vat).to_ascii_uppercase();
    let bytes = compacted.as_bytes();
    let ok = bytes.len() >= 4
        && bytes.len() <= 15
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_alphanumeric);
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidVatNumber(vat.to_string()))
    }
}

/// Local part, `@`, dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEmail(email.to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let ok = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    if ok { Ok(()) } else { Err(invalid()) }
}

/// IBAN (ISO 13616 mod-97) and BIC.
pub fn validate_bank_details(bank: &BankDetails) -> Result<(), ValidationError> {
    validate_iban(&bank.iban)?;
    validate_bic(&bank.bic)
}

/// ISO 13616: country, check digits, BBAN; remainder mod 97 must be 1.
pub fn validate_iban(iban: &str) -> Result<(), ValidationError> {
    let iban = compact(iban).to_ascii_uppercase();
    let bytes = iban.as_bytes();
    if bytes.len() < 15
        || bytes.len() > 34
        || !bytes[..2].iter().all(u8::is_ascii_uppercase)
        || !bytes[2..4].iter().all(u8::is_ascii_digit)
        || !bytes.iter().all(u8::is_ascii_alphanumeric)
    {
        return Err(ValidationError::InvalidIban);
    }

    let rearranged = bytes[4..].iter().chain(&bytes[..4]);
    let mut remainder: u32 = 0;
    for &b in rearranged {
        let value = if b.is_ascii_digit() {
            u32::from(b - b'0')
        } else {
            u32::from(b - b'A') + 10
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }

    if remainder == 1 {
        Ok(())
    } else {
        Err(ValidationError::InvalidIban)
    }
}

/// Bank code (4 letters), country (2 letters), location (2), optional branch (3).
pub fn validate_bic(bic: &str) -> Result<(), ValidationError> {
    let bytes = bic.as_bytes();
    let ok = (bytes.len() == 8 || bytes.len() == 11)
        && bytes[..6].iter().all(u8::is_ascii_uppercase)
        && bytes[6..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidBic(bic.to_string()))
    }
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
