//! Property-based tests for the Factur-X builder.

use coatbook_shared::types::{ClientId, TenantId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::document::escape::escape_xml;
use crate::document::facturx::FacturXBuilder;
use crate::invoice::{Invoice, InvoiceDraft, LineItem, Party};
use crate::numbering::DocumentNumber;
use crate::test_support::{at, draft_with, emitter, issue, recipient};
use crate::workflow::{CreditNoteRequest, CreditNoteScope, CreditNoteService, LifecycleService};

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 &<>\"'éà\\x00\\x01\\x08]{1,40}"
        .prop_filter("needs a visible character", |s| !s.trim().is_empty())
}

/// The text a parser reads back: forbidden control characters are dropped.
fn readable(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Texts of every `child` element directly under a `parent` element.
fn texts(doc: &roxmltree::Document<'_>, parent: &str, child: &str) -> Vec<String> {
    doc.descendants()
        .filter(|n| n.tag_name().name() == parent)
        .flat_map(|p| p.children().filter(move |c| c.tag_name().name() == child))
        .map(|c| c.text().unwrap_or_default().to_string())
        .collect()
}

fn party(base: Party, name: &str, street: &str, city: &str) -> Party {
    let mut party = base;
    party.name = name.to_string();
    party.address.street = street.to_string();
    party.address.city = city.to_string();
    party
}

#[derive(Debug)]
struct FreeText {
    designation: String,
    seller: (String, String, String),
    buyer: (String, String, String),
    terms: String,
    exemption: String,
}

fn arb_free_text() -> impl Strategy<Value = FreeText> {
    (
        arb_text(),
        (arb_text(), arb_text(), arb_text()),
        (arb_text(), arb_text(), arb_text()),
        arb_text(),
        arb_text(),
    )
        .prop_map(|(designation, seller, buyer, terms, exemption)| FreeText {
            designation,
            seller,
            buyer,
            terms,
            exemption,
        })
}

/// An issued invoice with a standard and an exempt line carrying `text`.
fn issued_with(text: &FreeText) -> Invoice {
    let mut invoice = Invoice::draft(
        TenantId::new(),
        ClientId::new(),
        InvoiceDraft {
            lines: vec![
                LineItem::new(text.designation.clone(), Decimal::ONE, Decimal::TEN, Decimal::new(20, 0)),
                LineItem::new("Export", Decimal::ONE, Decimal::TEN, Decimal::ZERO),
            ],
            payment_terms: Some(text.terms.clone()),
            exemption_reason: Some(text.exemption.clone()),
            ..InvoiceDraft::default()
        },
        at(2025, 6, 1),
    )
    .unwrap();
    let (name, street, city) = &text.seller;
    let seller = party(emitter(), name, street, city);
    let (name, street, city) = &text.buyer;
    let buyer = party(recipient(), name, street, city);
    let action = LifecycleService::issue(
        &invoice,
        DocumentNumber::parse("FC-2025-0001").unwrap(),
        seller,
        buyer,
        UserId::new(),
        at(2025, 6, 1),
    )
    .unwrap();
    invoice.apply(&action).unwrap();
    invoice
}

fn assert_parties(doc: &roxmltree::Document<'_>, text: &FreeText) {
    for (tag, (name, street, city)) in [
        ("SellerTradeParty", &text.seller),
        ("BuyerTradeParty", &text.buyer),
    ] {
        assert_eq!(texts(doc, tag, "Name"), [readable(name)]);
        let address: Vec<_> = doc
            .descendants()
            .filter(|n| n.tag_name().name() == tag)
            .flat_map(|p| p.descendants())
            .filter(|n| n.tag_name().name() == "PostalTradeAddress")
            .collect();
        assert_eq!(address.len(), 1);
        let line = address[0]
            .children()
            .find(|c| c.tag_name().name() == "LineOne")
            .and_then(|c| c.text())
            .unwrap_or_default();
        let town = address[0]
            .children()
            .find(|c| c.tag_name().name() == "CityName")
            .and_then(|c| c.text())
            .unwrap_or_default();
        assert_eq!(line, readable(street));
        assert_eq!(town, readable(city));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Same frozen invoice, same bytes.
    #[test]
    fn prop_build_deterministic(designation in arb_text(), qty in 1i64..1000, price in 0i64..100_000) {
        let line = LineItem::new(designation, Decimal::new(qty, 1), Decimal::new(price, 2), Decimal::new(20, 0));
        let invoice = issue(draft_with(vec![line]), "FC-2025-0001", at(2025, 6, 1));
        prop_assert_eq!(
            FacturXBuilder::build(&invoice).unwrap(),
            FacturXBuilder::build(&invoice).unwrap()
        );
    }

    /// Free text always lands escaped and without forbidden characters.
    #[test]
    fn prop_designation_escaped(designation in arb_text()) {
        let line = LineItem::new(designation.clone(), Decimal::ONE, Decimal::TEN, Decimal::new(20, 0));
        let invoice = issue(draft_with(vec![line]), "FC-2025-0001", at(2025, 6, 1));
        let doc = String::from_utf8(FacturXBuilder::build(&invoice).unwrap()).unwrap();

        let expected = format!("<ram:Name>{}</ram:Name>", escape_xml(&designation));
        prop_assert!(doc.contains(&expected));
        prop_assert!(!doc.chars().any(|c| c < ' ' && c != '\n' && c != '\t' && c != '\r'));
    }

    /// Escaped text never contains a raw markup character.
    #[test]
    fn prop_escape_removes_markup(text in arb_text()) {
        let escaped = escape_xml(&text);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
        prop_assert!(!escaped.contains('\''));
        prop_assert_eq!(escaped.matches('&').count(), escaped.matches(';').count());
    }

    /// Hostile free text still yields well-formed XML that reads back as written.
    #[test]
    fn prop_free_text_reads_back(text in arb_free_text(), reason in arb_text()) {
        let invoice = issued_with(&text);
        let bytes = FacturXBuilder::build(&invoice).unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| TestCaseError::fail(format!("malformed XML: {e}")))?;

        prop_assert_eq!(
            texts(&doc, "SpecifiedTradeProduct", "Name"),
            [readable(&text.designation), "Export".to_string()]
        );
        prop_assert_eq!(texts(&doc, "SpecifiedTradePaymentTerms", "Description"), [readable(&text.terms)]);
        prop_assert_eq!(texts(&doc, "ApplicableTradeTax", "ExemptionReason"), [readable(&text.exemption)]);
        assert_parties(&doc, &text);

        let request = CreditNoteRequest { scope: CreditNoteScope::Full, reason: reason.clone() };
        let note = CreditNoteService::create(
            &invoice,
            Decimal::ZERO,
            &request,
            DocumentNumber::parse("AV-2025-0001").unwrap(),
            UserId::new(),
            at(2025, 6, 2),
        )
        .unwrap()
        .credit_note;
        let xml = String::from_utf8(FacturXBuilder::build(&note).unwrap()).unwrap();
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| TestCaseError::fail(format!("malformed XML: {e}")))?;

        prop_assert_eq!(texts(&doc, "IncludedNote", "Content"), [readable(reason.trim())]);
        prop_assert_eq!(texts(&doc, "ApplicableTradeTax", "ExemptionReason"), [readable(&text.exemption)]);
        assert_parties(&doc, &text);
    }
}
