use serde::Deserialize;

/// Deployment environment
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Minimum length of the JWT signing secret in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;
/// `Key::from` panics on anything shorter than 64 bytes
pub const MIN_COOKIE_SECRET_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("JWT_SECRET must be at least {min} bytes", min = MIN_JWT_SECRET_LEN)]
    JwtSecretTooShort,
    #[error("COOKIE_SECRET must be at least {min} bytes", min = MIN_COOKIE_SECRET_LEN)]
    CookieSecretTooShort,
}

/// Application configuration, read from environment variables.
///
/// Variable names are the upper-case field names (`DATABASE_URL`,
/// `JWT_SECRET`, ...). Everything except the database url and the two
/// secrets has a default.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub cookie_secret: String,
    #[serde(default)]
    pub env: Environment,
    /// Comma separated list of origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    #[serde(default = "default_cookie_domain")]
    pub cookie_domain: String,
    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,
    #[serde(default = "default_refresh_token_expiry_days")]
    pub refresh_token_expiry_days: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_allowed_origins() -> String {
    "http://localhost:5173".to_string()
}

fn default_cookie_domain() -> String {
    "localhost".to_string()
}

const fn default_jwt_expiry_hours() -> i64 {
    24
}

const fn default_refresh_token_expiry_days() -> i64 {
    30
}

const fn default_bcrypt_cost() -> u32 {
    12
}

const fn default_db_max_connections() -> u32 {
    10
}

const fn default_cache_ttl_seconds() -> u64 {
    60
}

const fn default_port() -> u16 {
    3000
}

impl ApiConfig {
    /// Load and validate the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit list of `(NAME, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::JwtSecretTooShort);
        }
        if self.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(ConfigError::CookieSecretTooShort);
        }
        Ok(())
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut vars = vec![
            ("DATABASE_URL", "postgres://localhost/quizforge"),
            ("JWT_SECRET", "test_jwt_secret_minimum_32_characters_long"),
            (
                "COOKIE_SECRET",
                "test_cookie_secret_minimum_64_characters_long_for_secure_encryption",
            ),
        ];
        for (key, value) in extra {
            vars.retain(|(k, _)| k != key);
            vars.push((*key, *value));
        }
        vars.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = ApiConfig::from_vars(vars(&[])).expect("Config should load");

        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.jwt_expiry_hours, 24);
        assert_eq!(config.refresh_token_expiry_days, 30);
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.cache_ttl_seconds, 60);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_config_overrides() {
        let config = ApiConfig::from_vars(vars(&[
            ("ENV", "production"),
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .expect("Config should load");

        assert!(config.env.is_production());
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.parsed_allowed_origins(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_config_rejects_short_secrets() {
        let result = ApiConfig::from_vars(vars(&[("JWT_SECRET", "short")]));
        assert!(matches!(result, Err(ConfigError::JwtSecretTooShort)));

        let result = ApiConfig::from_vars(vars(&[("COOKIE_SECRET", "short")]));
        assert!(matches!(result, Err(ConfigError::CookieSecretTooShort)));
    }

    #[test]
    fn test_config_requires_database_url() {
        let vars = vars(&[])
            .into_iter()
            .filter(|(k, _)| k != "DATABASE_URL")
            .collect::<Vec<_>>();
        assert!(matches!(
            ApiConfig::from_vars(vars),
            Err(ConfigError::Env(_))
        ));
    }
}
