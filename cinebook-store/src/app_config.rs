use serde::Deserialize;
use std::env;

use cinebook_core::payment::GatewayConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub business_rules: BusinessRules,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a pending booking keeps its seats before the sweeper may
    /// release them.
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_minutes: u64,
    /// Post-start window during which a show still counts as running.
    #[serde(default = "default_show_runtime")]
    pub show_runtime_hours: u64,
    /// Bounded retries for optimistic seat-grid transactions.
    #[serde(default = "default_txn_retries")]
    pub max_txn_retries: u32,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_hold_ttl() -> u64 {
    15
}

fn default_show_runtime() -> u64 {
    4
}

fn default_txn_retries() -> u32 {
    3
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_ttl_minutes: default_hold_ttl(),
            show_runtime_hours: default_show_runtime(),
            max_txn_retries: default_txn_retries(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file is optional.
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. `CINEBOOK__GATEWAY__KEY_SECRET=...`
            .add_source(config::Environment::with_prefix("CINEBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinebook_core::payment::GatewayKind;

    #[test]
    fn defaults_fill_missing_rules() {
        let rules = BusinessRules::default();
        assert_eq!(rules.hold_ttl_minutes, 15);
        assert_eq!(rules.show_runtime_hours, 4);
        assert_eq!(rules.max_txn_retries, 3);
    }

    #[test]
    fn deserializes_a_full_document() {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [business_rules]
                hold_ttl_minutes = 10

                [gateway]
                provider = "razorpay"
                key_id = "rzp_test_key"
                key_secret = "rzp_test_secret"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.business_rules.hold_ttl_minutes, 10);
        assert_eq!(cfg.business_rules.max_txn_retries, 3);
        assert_eq!(cfg.gateway.provider, GatewayKind::Razorpay);
        assert_eq!(cfg.gateway.key_secret.as_deref(), Some("rzp_test_secret"));
    }
}
