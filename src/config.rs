use std::env;

use thiserror::Error;

use crate::ledger::QuantityRule;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Every route is served under `/{service_name}`.
    pub service_name: String,
    pub jwt_secret: String,
    pub auth_required: bool,
    pub quantity_rule: QuantityRule,
    pub bootstrap_schema: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            port: 3000,
            service_name: "inventory".to_string(),
            jwt_secret: String::new(),
            auth_required: true,
            quantity_rule: QuantityRule::default(),
            bootstrap_schema: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = match var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => defaults.port,
        };

        let service_name = var("SERVICE_NAME")
            .map(|name| name.trim_matches('/').to_string())
            .unwrap_or(defaults.service_name);

        let auth_required = match var("AUTH_REQUIRED") {
            Some(value) => parse_flag("AUTH_REQUIRED", value)?,
            None => defaults.auth_required,
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if auth_required => return Err(ConfigError::Missing("JWT_SECRET")),
            None => String::new(),
        };

        let quantity_rule = match var("QUANTITY_RULE") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "QUANTITY_RULE",
                value,
            })?,
            None => defaults.quantity_rule,
        };

        let bootstrap_schema = match var("BOOTSTRAP_SCHEMA") {
            Some(value) => parse_flag("BOOTSTRAP_SCHEMA", value)?,
            None => defaults.bootstrap_schema,
        };

        Ok(Self {
            database_url,
            port,
            service_name,
            jwt_secret,
            auth_required,
            quantity_rule,
            bootstrap_schema,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/inv"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.service_name, "inventory");
        assert!(config.auth_required);
        assert_eq!(config.quantity_rule, QuantityRule::Positive);
        assert!(!config.bootstrap_schema);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn secret_is_only_needed_with_auth() {
        assert_eq!(
            load(&[("DATABASE_URL", "postgres://x")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        );
        let config = load(&[("DATABASE_URL", "postgres://x"), ("AUTH_REQUIRED", "false")]).unwrap();
        assert!(!config.auth_required);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("PORT", "8080"),
            ("SERVICE_NAME", "/bonded/"),
            ("QUANTITY_RULE", "multiplicative"),
            ("BOOTSTRAP_SCHEMA", "1"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.service_name, "bonded");
        assert_eq!(config.quantity_rule, QuantityRule::Multiplicative);
        assert!(config.bootstrap_schema);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert_eq!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
        assert!(matches!(
            load(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }
}
