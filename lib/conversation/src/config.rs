//! Desk configuration.
//!
//! Fields with defaults can be omitted when loading from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reply delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long the typing indicator is shown before a reply, in milliseconds.
    /// Replies with their own pacing override this.
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,

    /// Upper bound for a single `send_text` call, in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Upper bound for toggling the typing indicator, in milliseconds.
    #[serde(default = "default_typing_timeout_ms")]
    pub typing_timeout_ms: u64,
}

fn default_typing_delay_ms() -> u64 {
    2500
}

fn default_send_timeout_ms() -> u64 {
    15_000
}

fn default_typing_timeout_ms() -> u64 {
    5_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            typing_delay_ms: default_typing_delay_ms(),
            send_timeout_ms: default_send_timeout_ms(),
            typing_timeout_ms: default_typing_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    #[must_use]
    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }
}

/// Event handling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Only contacts whose address ends with this suffix are answered.
    /// WhatsApp personal chats end in `@c.us`; groups and broadcasts do not.
    /// Unset means every sender is a contact.
    #[serde(default)]
    pub contact_suffix: Option<String>,

    /// Name used in the greeting when the contact has none.
    #[serde(default = "default_fallback_display_name")]
    pub fallback_display_name: String,

    /// Number of events that may queue for a single contact.
    #[serde(default = "default_lane_capacity")]
    pub lane_capacity: usize,

    /// Reply delivery settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

fn default_fallback_display_name() -> String {
    "Tutor(a)".to_string()
}

fn default_lane_capacity() -> usize {
    32
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            contact_suffix: None,
            fallback_display_name: default_fallback_display_name(),
            lane_capacity: default_lane_capacity(),
            dispatch: DispatchConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_config_has_correct_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.typing_delay(), Duration::from_millis(2500));
        assert_eq!(config.send_timeout(), Duration::from_secs(15));
        assert_eq!(config.typing_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn desk_config_fills_defaults_from_partial_input() {
        let config: DeskConfig =
            serde_json::from_str(r#"{"contact_suffix":"@c.us","dispatch":{"typing_delay_ms":10}}"#)
                .expect("deserialize");

        assert_eq!(config.contact_suffix.as_deref(), Some("@c.us"));
        assert_eq!(config.fallback_display_name, "Tutor(a)");
        assert_eq!(config.lane_capacity, 32);
        assert_eq!(config.dispatch.typing_delay_ms, 10);
        assert_eq!(config.dispatch.send_timeout_ms, 15_000);
    }
}
