//! Ledger export throttling over the shared rate-limit counter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use coatbook_core::error::ComplianceError;
use coatbook_core::tenancy::ActingContext;
use coatbook_shared::config::ThrottleConfig;

use crate::ports::RateLimitCounter;

/// Per tenant and user export budget.
#[derive(Clone)]
pub struct ExportThrottle {
    counter: Arc<dyn RateLimitCounter>,
    config: ThrottleConfig,
}

impl ExportThrottle {
    /// Creates a throttle.
    #[must_use]
    pub fn new(counter: Arc<dyn RateLimitCounter>, config: ThrottleConfig) -> Self {
        Self { counter, config }
    }

    fn key(ctx: &ActingContext) -> String {
        format!("ledger_export:{}:{}", ctx.tenant_id, ctx.user_id)
    }

    /// Consumes one export from the caller's budget.
    ///
    /// # Errors
    ///
    /// Returns `Throttled` once the window budget is spent, `Persistence`
    /// if the counter is unreachable.
    pub async fn check(&self, ctx: &ActingContext, now: DateTime<Utc>) -> Result<(), ComplianceError> {
        let hit = self
            .counter
            .hit(&Self::key(ctx), self.config.window_secs, now)
            .await
            .map_err(|e| ComplianceError::Persistence(e.to_string()))?;
        if hit.count <= self.config.max_exports_per_window {
            return Ok(());
        }
        let retry_after_secs = u64::try_from((hit.resets_at - now).num_seconds())
            .unwrap_or(0)
            .max(1);
        warn!(
            tenant_id = %ctx.tenant_id,
            user_id = %ctx.user_id,
            retry_after_secs,
            "Ledger export throttled"
        );
        Err(ComplianceError::Throttled { retry_after_secs })
    }
}
