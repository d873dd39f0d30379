//! Fixtures shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

use coatbook_shared::types::{ClientId, TenantId, UserId};

use crate::invoice::{Address, BankDetails, Contact, Invoice, InvoiceDraft, LineItem, Party};
use crate::numbering::DocumentNumber;
use crate::workflow::LifecycleService;

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap()
}

pub fn emitter() -> Party {
    Party {
        name: "Atelier Poudre & Fils".to_string(),
        tax_id: Some("73282932000074".to_string()),
        vat_number: Some("FR44732829320".to_string()),
        address: Address {
            street: "12 rue des Forges".to_string(),
            postal_code: "69007".to_string(),
            city: "Lyon".to_string(),
            country_code: "FR".to_string(),
        },
        contact: Contact {
            email: Some("compta@atelier-poudre.fr".to_string()),
            phone: Some("+33 4 78 00 00 00".to_string()),
        },
        bank: Some(BankDetails {
            iban: "FR76 3000 6000 0112 3456 7890 189".to_string(),
            bic: "AGRIFRPP".to_string(),
        }),
        account_code: None,
    }
}

pub fn recipient() -> Party {
    Party {
        name: "Garage Martin".to_string(),
        tax_id: None,
        vat_number: None,
        address: Address {
            street: "3 avenue Jean Jaurès".to_string(),
            postal_code: "69100".to_string(),
            city: "Villeurbanne".to_string(),
            country_code: "FR".to_string(),
        },
        contact: Contact::default(),
        bank: None,
        account_code: Some("CMARTIN".to_string()),
    }
}

/// Draft of 4 x 45.00 at 20%: 180.00 HT, 36.00 TVA, 216.00 TTC.
pub fn draft_invoice() -> Invoice {
    draft_with(vec![LineItem::new("Jantes thermolaquées", dec!(4), dec!(45), dec!(20))])
}

pub fn draft_with(lines: Vec<LineItem>) -> Invoice {
    Invoice::draft(
        TenantId::new(),
        ClientId::new(),
        InvoiceDraft {
            lines,
            ..InvoiceDraft::default()
        },
        at(2025, 3, 1),
    )
    .unwrap()
}

pub fn issue(mut invoice: Invoice, number: &str, issued_at: DateTime<Utc>) -> Invoice {
    let action = LifecycleService::issue(
        &invoice,
        DocumentNumber::parse(number).unwrap(),
        emitter(),
        recipient(),
        UserId::new(),
        issued_at,
    )
    .unwrap();
    invoice.apply(&action).unwrap();
    invoice
}
