//! Factur-X (CII D16B) invoice XML builder, EN 16931 profile.
//!
//! The output depends only on the frozen invoice: no timestamps, fixed
//! element order, amounts with exactly two decimals. Building the same
//! issued invoice twice yields identical bytes.

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;

use coatbook_shared::types::money::{format_amount, format_fixed};

use crate::document::xml::XmlWriter;
use crate::error::ValidationError;
use crate::invoice::{Invoice, InvoiceKind, LineItem, Party, TaxSubtotal};

/// Guideline identifier of the EN 16931 (COMFORT) profile.
pub const EN16931_GUIDELINE: &str = "urn:cen.eu:en16931:2017";

const NS_RSM: &str = "urn:un:unece:uncefact:data:standard:CrossIndustryInvoice:100";
const NS_RAM: &str =
    "urn:un:unece:uncefact:data:standard:ReusableAggregateBusinessInformationEntity:100";
const NS_QDT: &str = "urn:un:unece:uncefact:data:standard:QualifiedDataType:100";
const NS_UDT: &str = "urn:un:unece:uncefact:data:standard:UnqualifiedDataType:100";

/// UNTDID 4461: SEPA credit transfer.
const PAYMENT_MEANS_SEPA_TRANSFER: &str = "58";

/// Builds Factur-X XML documents.
pub struct FacturXBuilder;

impl FacturXBuilder {
    /// Builds the XML of an issued invoice or credit note.
    ///
    /// Fails without producing output on a missing number, emission date or
    /// party snapshot, on empty lines, or on totals inconsistent with the
    /// lines.
    pub fn build(invoice: &Invoice) -> Result<Vec<u8>, ValidationError> {
        let number = invoice.number().ok_or(ValidationError::MissingNumber)?;
        let issue_date = invoice
            .issue_date()
            .ok_or(ValidationError::MissingIssueDate)?;
        let emitter = invoice
            .emitter()
            .ok_or(ValidationError::MissingParty("emitter"))?;
        let recipient = invoice
            .recipient()
            .ok_or(ValidationError::MissingParty("recipient"))?;
        if invoice.lines().is_empty() {
            return Err(ValidationError::EmptyLineItems);
        }
        invoice.check_totals()?;

        let currency = invoice.currency().code();
        let mut w = XmlWriter::new();
        w.open_with(
            "rsm:CrossIndustryInvoice",
            &[
                ("xmlns:rsm", NS_RSM),
                ("xmlns:ram", NS_RAM),
                ("xmlns:qdt", NS_QDT),
                ("xmlns:udt", NS_UDT),
            ],
        );

        w.open("rsm:ExchangedDocumentContext");
        w.open("ram:GuidelineSpecifiedDocumentContextParameter");
        w.leaf("ram:ID", EN16931_GUIDELINE);
        w.close("ram:GuidelineSpecifiedDocumentContextParameter");
        w.close("rsm:ExchangedDocumentContext");

        w.open("rsm:ExchangedDocument");
        w.leaf("ram:ID", &number.to_string());
        w.leaf("ram:TypeCode", invoice.kind().type_code());
        write_date(&mut w, "ram:IssueDateTime", "udt:DateTimeString", issue_date);
        if let Some(reason) = invoice.credit_reason() {
            w.open("ram:IncludedNote");
            w.leaf("ram:Content", reason);
            w.close("ram:IncludedNote");
        }
        w.close("rsm:ExchangedDocument");

        w.open("rsm:SupplyChainTradeTransaction");
        for (idx, line) in invoice.lines().iter().enumerate() {
            write_line(&mut w, idx + 1, line, invoice.exemption_reason().is_some());
        }

        w.open("ram:ApplicableHeaderTradeAgreement");
        write_party(&mut w, "ram:SellerTradeParty", emitter);
        write_party(&mut w, "ram:BuyerTradeParty", recipient);
        w.close("ram:ApplicableHeaderTradeAgreement");

        w.empty("ram:ApplicableHeaderTradeDelivery");

        w.open("ram:ApplicableHeaderTradeSettlement");
        w.leaf("ram:InvoiceCurrencyCode", currency);
        if let Some(bank) = &emitter.bank {
            w.open("ram:SpecifiedTradeSettlementPaymentMeans");
            w.leaf("ram:TypeCode", PAYMENT_MEANS_SEPA_TRANSFER);
            w.open("ram:PayeePartyCreditorFinancialAccount");
            w.leaf("ram:IBANID", &compact(&bank.iban));
            w.close("ram:PayeePartyCreditorFinancialAccount");
            w.open("ram:PayeeSpecifiedCreditorFinancialInstitution");
            w.leaf("ram:BICID", &bank.bic);
            w.close("ram:PayeeSpecifiedCreditorFinancialInstitution");
            w.close("ram:SpecifiedTradeSettlementPaymentMeans");
        }
        for subtotal in invoice.tax_breakdown() {
            write_tax(&mut w, &subtotal, invoice.exemption_reason());
        }
        if invoice.payment_terms().is_some() || invoice.due_date().is_some() {
            w.open("ram:SpecifiedTradePaymentTerms");
            if let Some(terms) = invoice.payment_terms() {
                w.leaf("ram:Description", terms);
            }
            if let Some(due) = invoice.due_date() {
                write_date(&mut w, "ram:DueDateDateTime", "udt:DateTimeString", due);
            }
            w.close("ram:SpecifiedTradePaymentTerms");
        }

        let totals = invoice.totals();
        w.open("ram:SpecifiedTradeSettlementHeaderMonetarySummation");
        w.leaf("ram:LineTotalAmount", &format_amount(totals.total_ht));
        w.leaf("ram:TaxBasisTotalAmount", &format_amount(totals.total_ht));
        w.leaf_with(
            "ram:TaxTotalAmount",
            &[("currencyID", currency)],
            &format_amount(totals.total_tva),
        );
        w.leaf("ram:GrandTotalAmount", &format_amount(totals.total_ttc));
        w.leaf("ram:DuePayableAmount", &format_amount(totals.total_ttc));
        w.close("ram:SpecifiedTradeSettlementHeaderMonetarySummation");

        if invoice.kind() == InvoiceKind::CreditNote
            && let Some(link) = invoice.reversal()
        {
            w.open("ram:InvoiceReferencedDocument");
            w.leaf("ram:IssuerAssignedID", &link.number);
            write_date(
                &mut w,
                "ram:FormattedIssueDateTime",
                "qdt:DateTimeString",
                link.issue_date,
            );
            w.close("ram:InvoiceReferencedDocument");
        }
        w.close("ram:ApplicableHeaderTradeSettlement");

        w.close("rsm:SupplyChainTradeTransaction");
        w.close("rsm:CrossIndustryInvoice");
        Ok(w.finish())
    }

    /// Builds many documents in parallel. Results keep the input order.
    #[must_use]
    pub fn build_batch(invoices: &[Invoice]) -> Vec<Result<Vec<u8>, ValidationError>> {
        invoices.par_iter().map(Self::build).collect()
    }
}

/// UNTDID 5305 category of a rate.
fn tax_category(rate: Decimal, exempt: bool) -> &'static str {
    if rate > Decimal::ZERO {
        "S"
    } else if exempt {
        "E"
    } else {
        "Z"
    }
}

fn format_rate(rate: Decimal) -> String {
    format_fixed(rate, 2)
}

/// At least two decimals, more only when the value carries them.
fn format_quantity(quantity: Decimal) -> String {
    let mut q = quantity.normalize();
    if q.scale() < 2 {
        q.rescale(2);
    }
    q.to_string()
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn write_date(w: &mut XmlWriter, outer: &str, inner: &str, date: NaiveDate) {
    w.open(outer);
    w.leaf_with(inner, &[("format", "102")], &date.format("%Y%m%d").to_string());
    w.close(outer);
}

fn write_line(w: &mut XmlWriter, position: usize, line: &LineItem, exempt: bool) {
    w.open("ram:IncludedSupplyChainTradeLineItem");
    w.open("ram:AssociatedDocumentLineDocument");
    w.leaf("ram:LineID", &position.to_string());
    w.close("ram:AssociatedDocumentLineDocument");

    w.open("ram:SpecifiedTradeProduct");
    w.leaf("ram:Name", &line.designation);
    w.close("ram:SpecifiedTradeProduct");

    w.open("ram:SpecifiedLineTradeAgreement");
    w.open("ram:NetPriceProductTradePrice");
    w.leaf("ram:ChargeAmount", &format_amount(line.unit_price_ht));
    w.close("ram:NetPriceProductTradePrice");
    w.close("ram:SpecifiedLineTradeAgreement");

    w.open("ram:SpecifiedLineTradeDelivery");
    w.leaf_with(
        "ram:BilledQuantity",
        &[("unitCode", line.unit_code.as_str())],
        &format_quantity(line.quantity),
    );
    w.close("ram:SpecifiedLineTradeDelivery");

    w.open("ram:SpecifiedLineTradeSettlement");
    w.open("ram:ApplicableTradeTax");
    w.leaf("ram:TypeCode", "VAT");
    w.leaf("ram:CategoryCode", tax_category(line.tax_rate, exempt));
    w.leaf("ram:RateApplicablePercent", &format_rate(line.tax_rate));
    w.close("ram:ApplicableTradeTax");
    w.open("ram:SpecifiedTradeSettlementLineMonetarySummation");
    w.leaf("ram:LineTotalAmount", &format_amount(line.line_total_ht));
    w.close("ram:SpecifiedTradeSettlementLineMonetarySummation");
    w.close("ram:SpecifiedLineTradeSettlement");
    w.close("ram:IncludedSupplyChainTradeLineItem");
}

fn write_party(w: &mut XmlWriter, tag: &str, party: &Party) {
    w.open(tag);
    w.leaf("ram:Name", &party.name);
    if let Some(siret) = &party.tax_id {
        w.open("ram:SpecifiedLegalOrganization");
        w.leaf_with("ram:ID", &[("schemeID", "0002")], &compact(siret));
        w.close("ram:SpecifiedLegalOrganization");
    }
    if let Some(phone) = &party.contact.phone {
        w.open("ram:DefinedTradeContact");
        w.open("ram:TelephoneUniversalCommunication");
        w.leaf("ram:CompleteNumber", phone);
        w.close("ram:TelephoneUniversalCommunication");
        w.close("ram:DefinedTradeContact");
    }
    w.open("ram:PostalTradeAddress");
    w.leaf("ram:PostcodeCode", &party.address.postal_code);
    w.leaf("ram:LineOne", &party.address.street);
    w.leaf("ram:CityName", &party.address.city);
    w.leaf("ram:CountryID", &party.address.country_code);
    w.close("ram:PostalTradeAddress");
    if let Some(email) = &party.contact.email {
        w.open("ram:URIUniversalCommunication");
        w.leaf_with("ram:URIID", &[("schemeID", "EM")], email);
        w.close("ram:URIUniversalCommunication");
    }
    if let Some(vat) = &party.vat_number {
        w.open("ram:SpecifiedTaxRegistration");
        w.leaf_with("ram:ID", &[("schemeID", "VA")], &compact(vat));
        w.close("ram:SpecifiedTaxRegistration");
    }
    w.close(tag);
}

fn write_tax(w: &mut XmlWriter, subtotal: &TaxSubtotal, exemption_reason: Option<&str>) {
    let category = tax_category(subtotal.rate, exemption_reason.is_some());
    w.open("ram:ApplicableTradeTax");
    w.leaf("ram:CalculatedAmount", &format_amount(subtotal.amount));
    w.leaf("ram:TypeCode", "VAT");
    if category == "E"
        && let Some(reason) = exemption_reason
    {
        w.leaf("ram:ExemptionReason", reason);
    }
    w.leaf("ram:BasisAmount", &format_amount(subtotal.basis));
    w.leaf("ram:CategoryCode", category);
    w.leaf("ram:RateApplicablePercent", &format_rate(subtotal.rate));
    w.close("ram:ApplicableTradeTax");
}
