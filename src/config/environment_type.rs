/**
 * Define `EnvironmentType` enum and implements various traits for it.
 *
 * The `EnvironmentType` enum represents different types of environments:
 * - `development` (also aliased as 'dev')
 * - `staging` (also aliased as 'stg')
 * - `production` (also aliased as 'prod')
 */
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub(crate) enum EnvironmentType {
    development,
    staging,
    production,
}

impl FromStr for EnvironmentType {
    type Err = ();

    /**
     * Parse a string into an `EnvironmentType` enum. Unknown names are treated as production.
     */
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "development" | "dev" => EnvironmentType::development,
            "staging" | "stg" => EnvironmentType::staging,
            _ => EnvironmentType::production,
        })
    }
}

impl EnvironmentType {
    /**
     * Canonical name, also used as the `environment` log key.
     */
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentType::development => "development",
            EnvironmentType::staging => "staging",
            EnvironmentType::production => "production",
        }
    }
}

impl<'de> Deserialize<'de> for EnvironmentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(EnvironmentType::production))
    }
}
