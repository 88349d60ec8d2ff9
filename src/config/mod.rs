/**
 * Initialize capture tool configuration, using hierarchical configuration
 * https://docs.rs/config/latest/config/
 *
 * 1. First hexlit.yaml is read
 * 2. Then hexlit.{environment}.yaml is read
 * 3. Then hexlit.local.yaml is read (this is normally used for dev and not checked in git)
 * 4. Finally, environment variables are read
 */
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use environment_type::EnvironmentType;
use serde::Deserialize;
use std::env;
pub(crate) mod environment_type;
mod loglevel_type;

pub(crate) const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:9000";
pub(crate) const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

/**
 * Represents the configuration settings for the capture tool.
 *
 * Fields:
 * - `environment`: The environment type (e.g., development, staging, or production).
 * - `tcp_bind_address`: The address and port to bind the TCP listener (hostname:port format)
 * - `udp_bind_address`: The address to bind the UDP listener (hostname:port format)
 * - `disable_tcp`: Flag to disable the TCP listener.
 * - `disable_udp`: Flag to disable the UDP listener.
 * - `echo`: Send every captured payload back to its peer.
 * - `max_message_size`: Largest payload captured from one datagram or connection.
 * - `log_level`: The logging level. If missing or unknown, it is inferred from the resolved `environment`,
 *   wherever that came from. Only the choice of `hexlit.{environment}.yaml` follows `HEXLIT_ENVIRONMENT` alone.
 */
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Settings {
    pub(crate) environment: EnvironmentType,
    pub(crate) tcp_bind_address: String,
    pub(crate) udp_bind_address: String,
    pub(crate) disable_tcp: bool,
    pub(crate) disable_udp: bool,
    pub(crate) echo: bool,
    pub(crate) max_message_size: usize,
    #[serde(skip_deserializing, default = "loglevel_type::default_level")]
    pub(crate) log_level: slog::Level,
}

impl Settings {
    pub(crate) fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("HEXLIT_ENVIRONMENT").unwrap_or_else(|_| "production".into());

        let builder = Config::builder()
            // default config file
            .add_source(File::with_name("hexlit.yaml").required(false))
            // environment-based config file
            .add_source(File::with_name(&format!("hexlit.{run_mode}.yaml")).required(false))
            // local config file (don't check this into source control)
            .add_source(File::with_name("hexlit.local.yaml").required(false))
            .add_source(Environment::with_prefix("HEXLIT"));
        Self::from_builder(builder)
    }

    /**
     * Applies the defaults on top of the given sources and deserializes the result.
     */
    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let s = builder
            .set_default("tcp_bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("udp_bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("environment", EnvironmentType::production.as_str())?
            .set_default("disable_tcp", false)?
            .set_default("disable_udp", false)?
            .set_default("echo", false)?
            .set_default("max_message_size", DEFAULT_MAX_MESSAGE_SIZE as i64)?
            .build()?;

        let requested_level = s.get_string("log_level").ok();
        let mut settings: Settings = s.try_deserialize()?;
        if settings.max_message_size == 0 {
            return Err(ConfigError::Message(
                "max_message_size must be greater than zero".into(),
            ));
        }
        settings.log_level =
            loglevel_type::resolve(requested_level.as_deref(), &settings.environment);
        Ok(settings)
    }
}
