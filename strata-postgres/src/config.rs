//! PostgreSQL connection configuration.

use std::time::Duration;

use crate::error::{PgError, PgResult};

/// PostgreSQL connection configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Database URL.
    pub url: String,
    /// Host (extracted from URL or explicit).
    pub host: String,
    /// Port (default: 5432).
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username.
    pub user: String,
    /// Password.
    pub password: Option<String>,
    /// SSL mode.
    pub ssl_mode: SslMode,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Application name (shown in pg_stat_activity).
    pub application_name: Option<String>,
    /// Database schema holding the tables (default: "public").
    pub schema: String,
    /// Connection attempts before giving up.
    pub connect_attempts: u32,
    /// Delay before the first reconnect. Doubles after each failure.
    pub retry_backoff: Duration,
}

/// SSL mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Disable SSL.
    Disable,
    /// Prefer SSL but allow non-SSL.
    #[default]
    Prefer,
    /// Require SSL.
    Require,
}

impl PgConfig {
    /// Create a new configuration from a database URL.
    pub fn from_url(url: impl Into<String>) -> PgResult<Self> {
        let url = url.into();
        let parsed = url::Url::parse(&url)
            .map_err(|e| PgError::config(format!("invalid database URL: {}", e)))?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            return Err(PgError::config(format!(
                "invalid scheme: expected 'postgresql' or 'postgres', got '{}'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| PgError::config("missing host in URL"))?
            .to_string();

        let port = parsed.port().unwrap_or(5432);

        let database = parsed.path().trim_start_matches('/').to_string();

        if database.is_empty() {
            return Err(PgError::config("missing database name in URL"));
        }

        let user = if parsed.username().is_empty() {
            "postgres".to_string()
        } else {
            parsed.username().to_string()
        };

        let password = parsed.password().map(String::from);

        let mut config = Self {
            url,
            host,
            port,
            database,
            user,
            password,
            ssl_mode: SslMode::Prefer,
            connect_timeout: Duration::from_secs(30),
            application_name: None,
            schema: "public".to_string(),
            connect_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        };

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "sslmode" => {
                    config.ssl_mode = match value.as_ref() {
                        "disable" => SslMode::Disable,
                        "prefer" | "allow" => SslMode::Prefer,
                        "require" => SslMode::Require,
                        other => {
                            return Err(PgError::config(format!("invalid sslmode: {}", other)));
                        }
                    };
                }
                "connect_timeout" => {
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| PgError::config("invalid connect_timeout"))?;
                    config.connect_timeout = Duration::from_secs(secs);
                }
                "application_name" => {
                    config.application_name = Some(value.into_owned());
                }
                "search_path" | "schema" => {
                    config.schema = value.into_owned();
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Set the database schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the connection retry policy.
    pub fn retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.connect_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }

    /// Convert to tokio-postgres config.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.dbname(&self.database);
        config.user(&self.user);

        if let Some(ref password) = self.password {
            config.password(password);
        }

        if let Some(ref app_name) = self.application_name {
            config.application_name(app_name);
        } else {
            config.application_name("strata");
        }

        config.ssl_mode(match self.ssl_mode {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require => tokio_postgres::config::SslMode::Require,
        });

        config.connect_timeout(self.connect_timeout);

        config
    }

    /// The URL with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => self.url.replacen(password, "****", 1),
            _ => self.url.clone(),
        }
    }
}
