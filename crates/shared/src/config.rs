//! Application configuration management.
//!
//! Every value has a default matching French bookkeeping practice for a
//! small workshop, so an empty environment still yields a usable config.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Document numbering configuration.
    #[serde(default)]
    pub numbering: NumberingConfig,
    /// Ledger export configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Export throttling configuration.
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

/// Document numbering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    /// Prefix of invoice numbers.
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    /// Prefix of credit note numbers.
    #[serde(default = "default_credit_note_prefix")]
    pub credit_note_prefix: String,
    /// Minimum number of digits of the counter part.
    #[serde(default = "default_counter_width")]
    pub counter_width: usize,
}

fn default_invoice_prefix() -> String {
    "FC".to_string()
}

fn default_credit_note_prefix() -> String {
    "AV".to_string()
}

fn default_counter_width() -> usize {
    4
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            invoice_prefix: default_invoice_prefix(),
            credit_note_prefix: default_credit_note_prefix(),
            counter_width: default_counter_width(),
        }
    }
}

/// A journal of the ledger export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JournalConfig {
    /// Journal code (`JournalCode` column).
    pub code: String,
    /// Journal label (`JournalLib` column).
    pub label: String,
}

impl JournalConfig {
    fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

/// A general-ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountConfig {
    /// Account number (`CompteNum` column).
    pub number: String,
    /// Account label (`CompteLib` column).
    pub label: String,
}

impl AccountConfig {
    fn new(number: &str, label: &str) -> Self {
        Self {
            number: number.to_string(),
            label: label.to_string(),
        }
    }
}

/// VAT-collected account for one tax rate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VatAccountConfig {
    /// Tax rate in percent.
    pub rate: Decimal,
    /// The account receiving VAT collected at this rate.
    #[serde(flatten)]
    pub account: AccountConfig,
}

/// Ledger export configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Functional currency of the books (ISO 4217).
    #[serde(default = "default_functional_currency")]
    pub functional_currency: String,
    /// Sales journal.
    #[serde(default = "default_sales_journal")]
    pub sales_journal: JournalConfig,
    /// Bank journal.
    #[serde(default = "default_bank_journal")]
    pub bank_journal: JournalConfig,
    /// Customer receivable account.
    #[serde(default = "default_receivable_account")]
    pub receivable_account: AccountConfig,
    /// Revenue account for service invoices.
    #[serde(default = "default_services_revenue_account")]
    pub services_revenue_account: AccountConfig,
    /// Revenue account for goods invoices.
    #[serde(default = "default_goods_revenue_account")]
    pub goods_revenue_account: AccountConfig,
    /// Bank account.
    #[serde(default = "default_bank_account")]
    pub bank_account: AccountConfig,
    /// VAT-collected accounts by rate.
    #[serde(default = "default_vat_accounts")]
    pub vat_accounts: Vec<VatAccountConfig>,
}

fn default_functional_currency() -> String {
    "EUR".to_string()
}

fn default_sales_journal() -> JournalConfig {
    JournalConfig::new("VT", "Ventes")
}

fn default_bank_journal() -> JournalConfig {
    JournalConfig::new("BQ", "Banque")
}

fn default_receivable_account() -> AccountConfig {
    AccountConfig::new("411000", "Clients")
}

fn default_services_revenue_account() -> AccountConfig {
    AccountConfig::new("706000", "Prestations de services")
}

fn default_goods_revenue_account() -> AccountConfig {
    AccountConfig::new("707000", "Ventes de marchandises")
}

fn default_bank_account() -> AccountConfig {
    AccountConfig::new("512000", "Banque")
}

fn default_vat_accounts() -> Vec<VatAccountConfig> {
    vec![
        VatAccountConfig {
            rate: Decimal::new(20, 0),
            account: AccountConfig::new("445710", "TVA collectée 20%"),
        },
        VatAccountConfig {
            rate: Decimal::new(10, 0),
            account: AccountConfig::new("445711", "TVA collectée 10%"),
        },
        VatAccountConfig {
            rate: Decimal::new(55, 1),
            account: AccountConfig::new("445712", "TVA collectée 5,5%"),
        },
        VatAccountConfig {
            rate: Decimal::new(21, 1),
            account: AccountConfig::new("445713", "TVA collectée 2,1%"),
        },
    ]
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            functional_currency: default_functional_currency(),
            sales_journal: default_sales_journal(),
            bank_journal: default_bank_journal(),
            receivable_account: default_receivable_account(),
            services_revenue_account: default_services_revenue_account(),
            goods_revenue_account: default_goods_revenue_account(),
            bank_account: default_bank_account(),
            vat_accounts: default_vat_accounts(),
        }
    }
}

impl LedgerConfig {
    /// Looks up the VAT-collected account for a rate.
    #[must_use]
    pub fn vat_account(&self, rate: Decimal) -> Option<&AccountConfig> {
        self.vat_accounts
            .iter()
            .find(|entry| entry.rate.normalize() == rate.normalize())
            .map(|entry| &entry.account)
    }
}

/// Export throttling configuration, applied per tenant and user.
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum ledger exports per window.
    #[serde(default = "default_max_exports")]
    pub max_exports_per_window: u64,
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_exports() -> u64 {
    30
}

fn default_window_secs() -> u64 {
    60
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_exports_per_window: default_max_exports(),
            window_secs: default_window_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COATBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.numbering.invoice_prefix, "FC");
        assert_eq!(config.numbering.credit_note_prefix, "AV");
        assert_eq!(config.numbering.counter_width, 4);
        assert_eq!(config.ledger.sales_journal.code, "VT");
        assert_eq!(config.ledger.bank_journal.code, "BQ");
        assert_eq!(config.ledger.receivable_account.number, "411000");
        assert_eq!(config.throttle.max_exports_per_window, 30);
    }

    #[test]
    fn test_vat_account_lookup_ignores_scale() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.vat_account(dec!(20.00)).unwrap().number, "445710");
        assert_eq!(ledger.vat_account(dec!(5.5)).unwrap().number, "445712");
        assert_eq!(ledger.vat_account(dec!(2.10)).unwrap().number, "445713");
        assert!(ledger.vat_account(dec!(19.6)).is_none());
    }

    #[test]
    fn test_load_reads_environment_overrides() {
        temp_env::with_vars(
            [
                ("COATBOOK__NUMBERING__INVOICE_PREFIX", Some("INV")),
                ("COATBOOK__LEDGER__FUNCTIONAL_CURRENCY", Some("CHF")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.numbering.invoice_prefix, "INV");
                assert_eq!(config.numbering.credit_note_prefix, "AV");
                assert_eq!(config.ledger.functional_currency, "CHF");
                assert_eq!(config.ledger.vat_accounts.len(), 4);
            },
        );
    }
}
