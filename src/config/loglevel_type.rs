use super::environment_type::EnvironmentType;
use slog::Level;

/**
 * Resolve the log level from the configured value.
 *
 * If the log level is missing or unknown, it will be inferred from the environment type:
 * development logs at debug, everything else at info (captured payloads are logged at info).
 */
pub fn resolve(value: Option<&str>, environment: &EnvironmentType) -> Level {
    value
        .and_then(parse)
        .unwrap_or_else(|| fallback(environment))
}

/**
 * Parse a log level name, case-insensitive.
 */
pub fn parse(value: &str) -> Option<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Some(Level::Trace),
        "debug" => Some(Level::Debug),
        "info" => Some(Level::Info),
        "warn" | "warning" => Some(Level::Warning),
        "error" => Some(Level::Error),
        "critical" => Some(Level::Critical),
        _ => None,
    }
}

/// Level used when nothing valid is configured
pub fn fallback(environment: &EnvironmentType) -> Level {
    match environment {
        EnvironmentType::development => Level::Debug,
        _ => Level::Info,
    }
}

/// Placeholder until `resolve` runs on the deserialized settings
pub fn default_level() -> Level {
    Level::Info
}
