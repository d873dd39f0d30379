//! Gap-free document numbering over the counter port.

use std::sync::Arc;

use tracing::debug;

use coatbook_core::error::ComplianceError;
use coatbook_core::invoice::InvoiceKind;
use coatbook_core::numbering::NumberFormat;
use coatbook_shared::types::TenantId;

use crate::ports::{NumberClaim, SequenceCounter};

/// Reserves legal document numbers.
///
/// A reservation reads the committed counter and proposes the next value.
/// The counter only moves when the claim is committed together with the
/// document, so a failed issuance leaves no hole. Two reservations of the
/// same number cannot both commit.
#[derive(Clone)]
pub struct Sequencer {
    counter: Arc<dyn SequenceCounter>,
    format: NumberFormat,
}

impl Sequencer {
    /// Creates a sequencer.
    #[must_use]
    pub fn new(counter: Arc<dyn SequenceCounter>, format: NumberFormat) -> Self {
        Self { counter, format }
    }

    /// Next number of `kind` for the tenant in `year`.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the counter cannot be read.
    pub async fn reserve(
        &self,
        tenant_id: TenantId,
        kind: InvoiceKind,
        year: i32,
    ) -> Result<NumberClaim, ComplianceError> {
        let current = self
            .counter
            .current(tenant_id, kind, year)
            .await
            .map_err(|e| ComplianceError::Persistence(e.to_string()))?;
        let sequence = current
            .checked_add(1)
            .ok_or_else(|| ComplianceError::Persistence("numbering counter exhausted".into()))?;
        let number = self.format.number(kind, year, sequence)?;
        debug!(
            tenant_id = %tenant_id,
            kind = kind.as_str(),
            number = %number,
            "Document number reserved"
        );
        Ok(NumberClaim {
            tenant_id,
            kind,
            number,
        })
    }
}
