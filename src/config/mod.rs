use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `debug` or `release`
    pub mode: String,
    pub workers: usize,
    pub keep_alive_seconds: u64,
    pub client_timeout_seconds: u64,
    pub client_shutdown_seconds: u64,
}

impl ServerConfig {
    pub fn is_debug(&self) -> bool {
        self.mode != "release"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Takes precedence over the discrete connection parameters when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub sslmode: String,
    pub max_connections: usize,
    pub migrations_dir: String,
}

impl DatabaseConfig {
    /// Connection string in libpq key/value form.
    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "host={} port={} user={} password={} dbname={} sslmode={}",
                quote_dsn(&self.host),
                self.port,
                quote_dsn(&self.user),
                quote_dsn(&self.password),
                quote_dsn(&self.dbname),
                quote_dsn(&self.sslmode)
            ),
        }
    }
}

/// Single-quotes a libpq value, escaping `'` and `\`.
fn quote_dsn(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub password_reset_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window_seconds: u64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid number, got {value:?}")]
    InvalidNumber { key: String, value: String },
    #[error("{key} must be a duration such as 24h or 90m, got {value:?}")]
    InvalidDuration { key: String, value: String },
    #[error("{0} must be set")]
    Missing(String),
}

const DEV_JWT_SECRET: &str = "jobsolution-dev-secret-change-me";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: var_or("SERVER_HOST", "0.0.0.0"),
            port: parse_var("SERVER_PORT", "8080")?,
            mode: var_or("SERVER_MODE", "debug"),
            workers: parse_var("SERVER_WORKERS", "4")?,
            keep_alive_seconds: parse_var("KEEP_ALIVE_SECONDS", "75")?,
            client_timeout_seconds: parse_var("CLIENT_TIMEOUT_SECONDS", "30")?,
            client_shutdown_seconds: parse_var("CLIENT_SHUTDOWN_SECONDS", "5")?,
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if server.is_debug() => {
                log::warn!("JWT_SECRET is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(ConfigError::Missing("JWT_SECRET".to_string())),
        };

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
                host: var_or("POSTGRES_HOST", "localhost"),
                port: parse_var("POSTGRES_PORT", "5432")?,
                user: var_or("POSTGRES_USER", "postgres"),
                password: var_or("POSTGRES_PASSWORD", "postgres"),
                dbname: var_or("POSTGRES_DB", "jobsolution"),
                sslmode: var_or("POSTGRES_SSLMODE", "disable"),
                max_connections: parse_var("POSTGRES_MAX_OPEN_CONNS", "25")?,
                migrations_dir: var_or("MIGRATIONS_DIR", "migrations"),
            },
            auth: AuthConfig {
                jwt_secret,
                access_token_ttl_seconds: seconds_var("JWT_EXPIRES_IN", "24h")?,
                refresh_token_ttl_seconds: seconds_var("JWT_REFRESH_EXPIRES_IN", "168h")?,
                password_reset_ttl_seconds: seconds_var("PASSWORD_RESET_EXPIRES_IN", "24h")?,
                bcrypt_cost: parse_var("BCRYPT_COST", "12")?,
            },
            security: SecurityConfig {
                cors_allowed_origins: var_or("CORS_ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS", "100")?,
                rate_limit_window_seconds: duration_var("RATE_LIMIT_DURATION", "1m")?.as_secs(),
                max_request_size_bytes: parse_var("MAX_REQUEST_SIZE_BYTES", "1048576")?,
            },
            logging: LoggingConfig {
                level: var_or("LOG_LEVEL", "info"),
                directory: var_or("LOG_DIR", "logs"),
            },
            server,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value,
    })
}

fn duration_var(key: &str, default: &str) -> Result<Duration, ConfigError> {
    let value = var_or(key, default);
    parse_duration(&value).ok_or(ConfigError::InvalidDuration {
        key: key.to_string(),
        value,
    })
}

/// Whole seconds of a duration variable, for TTLs stored as `i64`.
fn seconds_var(key: &str, default: &str) -> Result<i64, ConfigError> {
    let value = var_or(key, default);
    parse_duration(&value)
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .ok_or(ConfigError::InvalidDuration {
            key: key.to_string(),
            value,
        })
}

/// Loads `.env` when present. A missing file is fine; any other problem is
/// handed back so the caller can log it once logging is up.
pub fn load_dotenv() -> Option<dotenvy::Error> {
    dotenv_problem(dotenvy::dotenv())
}

fn dotenv_problem<T>(result: Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

/// Parses durations written as `1h30m`, `168h`, `45s`, `500ms`. A bare number is seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let amount: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60)?),
            "h" => Duration::from_secs(amount.checked_mul(3600)?),
            _ => return None,
        };
        total = total.checked_add(part)?;
        rest = &rest[unit_len..];
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("24h"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("10d"), None);
        assert_eq!(parse_duration("5m3"), None);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert_eq!(parse_duration("9999999999999999h"), None);
        assert_eq!(parse_duration("99999999999999999m"), None);
        assert_eq!(parse_duration("18446744073709551615s1s"), None);
    }

    #[test]
    fn ttl_that_does_not_fit_is_a_config_error() {
        env::set_var("JOBSOLUTION_TEST_TTL", "18446744073709551615s");
        let err = seconds_var("JOBSOLUTION_TEST_TTL", "24h").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { .. }));

        env::set_var("JOBSOLUTION_TEST_TTL", "2h");
        assert_eq!(seconds_var("JOBSOLUTION_TEST_TTL", "24h").unwrap(), 7_200);
        env::remove_var("JOBSOLUTION_TEST_TTL");
    }

    #[test]
    fn connection_string_quotes_values() {
        let cfg = DatabaseConfig {
            url: None,
            host: "localhost".into(),
            port: 5432,
            user: "app".into(),
            password: "it's a \\secret".into(),
            dbname: "jobsolution".into(),
            sslmode: "disable".into(),
            max_connections: 5,
            migrations_dir: "migrations".into(),
        };
        let dsn = cfg.connection_string();
        assert!(dsn.contains(r"password='it\'s a \\secret'"), "{}", dsn);

        let parsed: tokio_postgres::Config = dsn.parse().unwrap();
        assert_eq!(parsed.get_password(), Some("it's a \\secret".as_bytes()));
        assert_eq!(parsed.get_user(), Some("app"));
    }

    #[test]
    fn missing_env_file_is_not_a_problem() {
        let missing = env::temp_dir().join(format!("{}.env", uuid::Uuid::new_v4()));
        assert!(dotenv_problem(dotenvy::from_path(&missing)).is_none());

        let malformed = env::temp_dir().join(format!("{}.env", uuid::Uuid::new_v4()));
        std::fs::write(&malformed, "this line is not an assignment\n").unwrap();
        let problem = dotenv_problem(dotenvy::from_path(&malformed));
        std::fs::remove_file(&malformed).unwrap();
        assert!(problem.is_some());
    }

    #[test]
    fn connection_string_prefers_url() {
        let mut cfg = DatabaseConfig {
            url: None,
            host: "db".into(),
            port: 5433,
            user: "app".into(),
            password: "pw".into(),
            dbname: "jobsolution".into(),
            sslmode: "disable".into(),
            max_connections: 5,
            migrations_dir: "migrations".into(),
        };
        assert_eq!(
            cfg.connection_string(),
            "host='db' port=5433 user='app' password='pw' dbname='jobsolution' sslmode='disable'"
        );
        cfg.url = Some("postgres://app@db/jobsolution".into());
        assert_eq!(cfg.connection_string(), "postgres://app@db/jobsolution");
    }
}
