//! Typed configuration for the validation manager, in the style of
//! `kairei::config`: `serde`-deserializable structs with explicit defaults
//! and `Duration`s serialized as milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Applied to a registered node when its own `register` call doesn't
    /// specify a timeout.
    #[serde(default, with = "opt_duration_ms")]
    pub default_timeout: Option<Duration>,

    /// Default for `validate`'s `log_summary` flag when a caller just wants
    /// the configured behavior rather than deciding per call.
    #[serde(default)]
    pub log_summary_default: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            log_summary_default: false,
        }
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
