//! Plugin configuration.
//!
//! Defaults come from [`PluginConfig::default`] and `HTTPX_*` environment
//! variables are merged over them with `figment`. A host runner can expose
//! [`RecorderArgs`] on its own command line.

use clap::Args;
use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const ENV_PREFIX: &str = "HTTPX_";
pub const ENV_ENABLED: &str = "HTTPX_PLUGIN_ENABLED";
pub const ENV_SAVE_REQUESTS: &str = "HTTPX_SAVE_REQUESTS";
pub const ENV_ARTIFACT_NAME: &str = "HTTPX_REQUESTS_ARTIFACT_NAME";

pub const DEFAULT_ARTIFACT_NAME: &str = "httpx-requests.har";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// A disabled plugin ignores every lifecycle event.
    pub enabled: bool,
    /// Record requests and attach them to each scenario result.
    pub save_requests: bool,
    /// Name of the attached HAR artifact.
    pub requests_artifact_name: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            save_requests: false,
            requests_artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
        }
    }
}

impl PluginConfig {
    /// Defaults merged with `HTTPX_*` environment variables.
    ///
    /// `HTTPX_PLUGIN_ENABLED` maps to `enabled`; every other variable maps
    /// to the field named by the rest of its name. Hosts can merge further
    /// providers before extracting.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(PluginConfig::default())).merge(
            Env::prefixed(ENV_PREFIX).map(|key| {
                if key.as_str().eq_ignore_ascii_case("plugin_enabled") {
                    "enabled".into()
                } else {
                    key.as_str().to_ascii_lowercase().into()
                }
            }),
        )
    }

    /// Extract from [`figment`](Self::figment). A value that does not fit
    /// its field (e.g. `HTTPX_SAVE_REQUESTS=maybe`) is an error; a blank
    /// artifact name falls back to the default.
    pub fn from_env() -> Result<Self> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let mut config: PluginConfig = figment.extract()?;
        if config.requests_artifact_name.trim().is_empty() {
            config.requests_artifact_name = DEFAULT_ARTIFACT_NAME.to_string();
        }
        Ok(config)
    }
}

/// Command line switches a test runner can flatten into its own parser.
#[derive(Debug, Clone, Default, Args)]
#[command(next_help_heading = "HTTP interface")]
pub struct RecorderArgs {
    /// Record HTTP requests of each scenario and attach them as a HAR file
    #[arg(long = "httpx-save-requests")]
    pub save_requests: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use figment::Jail;

    #[test]
    fn defaults() {
        let config = PluginConfig::default();
        assert!(config.enabled);
        assert!(!config.save_requests);
        assert_eq!(config.requests_artifact_name, "httpx-requests.har");
    }

    #[test]
    fn env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env(ENV_ENABLED, "false");
            jail.set_env(ENV_SAVE_REQUESTS, "true");
            jail.set_env(ENV_ARTIFACT_NAME, "requests.har");

            let config = PluginConfig::from_env().unwrap();
            assert!(!config.enabled);
            assert!(config.save_requests);
            assert_eq!(config.requests_artifact_name, "requests.har");
            Ok(())
        });
    }

    #[test]
    fn unset_env_keeps_defaults() {
        Jail::expect_with(|_| {
            assert_eq!(PluginConfig::from_env().unwrap(), PluginConfig::default());
            Ok(())
        });
    }

    #[test]
    fn unparsable_flag_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env(ENV_SAVE_REQUESTS, "maybe");
            let err = PluginConfig::from_env().unwrap_err();
            assert!(matches!(err, crate::Error::Config(_)), "{err:?}");
            Ok(())
        });
    }

    #[test]
    fn blank_artifact_name_falls_back() {
        Jail::expect_with(|_| {
            let figment = PluginConfig::figment()
                .merge(Serialized::default("requests_artifact_name", " "));
            let config = PluginConfig::from_figment(&figment).unwrap();
            assert_eq!(config.requests_artifact_name, DEFAULT_ARTIFACT_NAME);
            Ok(())
        });
    }

    #[test]
    fn deserializes_partial_config() {
        let config: PluginConfig = serde_json::from_str(r#"{"save_requests": true}"#).unwrap();
        assert!(config.enabled);
        assert!(config.save_requests);
    }

    #[derive(Parser)]
    struct Runner {
        #[command(flatten)]
        recorder: RecorderArgs,
    }

    #[test]
    fn recorder_args_flatten_into_host_cli() {
        let cli = Runner::try_parse_from(["runner", "--httpx-save-requests"]).unwrap();
        assert!(cli.recorder.save_requests);

        let cli = Runner::try_parse_from(["runner"]).unwrap();
        assert!(!cli.recorder.save_requests);
    }
}
