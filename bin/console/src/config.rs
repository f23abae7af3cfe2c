//! Console configuration.
//!
//! Loaded via the `config` crate from `FRONTDESK_*` environment variables.
//! Nested fields use `__`, e.g. `FRONTDESK_DESK__DISPATCH__TYPING_DELAY_MS`.

use frontdesk_conversation::DeskConfig;
use frontdesk_core::ContactId;
use serde::Deserialize;

/// Console configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Address of the operator's own account. Short-form operator lines are
    /// sent from this address.
    #[serde(default = "default_operator_id")]
    pub operator_id: String,

    /// Desk configuration.
    #[serde(default)]
    pub desk: DeskConfig,
}

fn default_operator_id() -> String {
    "operator".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            operator_id: default_operator_id(),
            desk: DeskConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("FRONTDESK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn operator(&self) -> ContactId {
        ContactId::new(self.operator_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_config_has_correct_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.operator_id, "operator");
        assert_eq!(config.desk, DeskConfig::default());
    }

    #[test]
    fn nested_overrides_reach_the_desk() {
        let config: ConsoleConfig = config::Config::builder()
            .set_override("operator_id", "5563900000000@c.us")
            .unwrap()
            .set_override("desk.contact_suffix", "@c.us")
            .unwrap()
            .set_override("desk.dispatch.typing_delay_ms", 100_i64)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.operator().as_str(), "5563900000000@c.us");
        assert_eq!(config.desk.contact_suffix.as_deref(), Some("@c.us"));
        assert_eq!(config.desk.dispatch.typing_delay_ms, 100);
        assert_eq!(config.desk.lane_capacity, 32);
    }
}
