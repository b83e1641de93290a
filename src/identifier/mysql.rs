use std::env;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use tracing::{debug, info};

use super::{IdentifierStore, LookupError};

pub const DEFAULT_TABLE: &str = "oc_product";
pub const DEFAULT_FILENAME_COLUMN: &str = "image_path";
pub const DEFAULT_IDENTIFIER_COLUMN: &str = "sku";

/// Environment variable names for the database connection
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_SERVICE_NAME: &str = "DB_SERVICE_NAME";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_NAME: &str = "DB_NAME";

/// Database connection and table layout
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub table: String,
    pub filename_column: String,
    pub identifier_column: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            table: DEFAULT_TABLE.to_string(),
            filename_column: DEFAULT_FILENAME_COLUMN.to_string(),
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
        }
    }
}

impl DbConfig {
    /// Load connection settings from the environment.
    ///
    /// `DATABASE_URL` wins when set. Otherwise `DB_HOST` (or `DB_SERVICE_NAME`),
    /// `DB_PORT`, `DB_USER`, `DB_PASSWORD` and `DB_NAME` are used.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env::var(ENV_DB_HOST)
            .or_else(|_| env::var(ENV_DB_SERVICE_NAME))
            .unwrap_or(defaults.host.clone());
        let port = env::var(ENV_DB_PORT)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        Self {
            url: env::var(ENV_DATABASE_URL).ok().filter(|u| !u.is_empty()),
            host,
            port,
            user: env::var(ENV_DB_USER).unwrap_or_default(),
            password: env::var(ENV_DB_PASSWORD).unwrap_or_default(),
            database: env::var(ENV_DB_NAME).unwrap_or_default(),
            ..defaults
        }
    }

    pub fn with_layout(
        mut self,
        table: impl Into<String>,
        filename_column: impl Into<String>,
        identifier_column: impl Into<String>,
    ) -> Self {
        self.table = table.into();
        self.filename_column = filename_column.into();
        self.identifier_column = identifier_column.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || !self.database.is_empty()
    }

    fn connect_options(&self) -> Result<MySqlConnectOptions, LookupError> {
        if let Some(url) = &self.url {
            return url.parse().map_err(LookupError::Database);
        }

        if self.database.is_empty() {
            return Err(LookupError::NotConfigured(format!(
                "set {} or {}",
                ENV_DATABASE_URL, ENV_DB_NAME
            )));
        }

        Ok(MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database))
    }

    /// Parameterized lookup statement for this layout.
    ///
    /// Table and column names cannot be bound, so they are validated instead.
    pub fn lookup_sql(&self) -> Result<String, LookupError> {
        let table = validate_identifier(&self.table)?;
        let filename_column = validate_identifier(&self.filename_column)?;
        let identifier_column = validate_identifier(&self.identifier_column)?;

        Ok(format!(
            "SELECT `{}` FROM `{}` WHERE `{}` = ? LIMIT 1",
            identifier_column, table, filename_column
        ))
    }
}

fn validate_identifier(name: &str) -> Result<&str, LookupError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(LookupError::InvalidIdentifier(name.to_string()))
    }
}

/// MySQL-backed identifier store over a single connection.
pub struct MySqlIdentifierStore {
    pool: MySqlPool,
    lookup_sql: String,
}

impl MySqlIdentifierStore {
    pub async fn connect(config: &DbConfig) -> Result<Self, LookupError> {
        let lookup_sql = config.lookup_sql()?;
        let options = config.connect_options()?;

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!(table = %config.table, "Connected to identifier database");

        Ok(Self { pool, lookup_sql })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_identifier(row: &MySqlRow, filename: &str) -> Result<Option<String>, LookupError> {
    if let Ok(value) = row.try_get::<Option<String>, _>(0) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(0) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(0) {
        return Ok(value.map(|v| v.to_string()));
    }

    Err(LookupError::UnsupportedValue {
        filename: filename.to_string(),
    })
}

#[async_trait]
impl IdentifierStore for MySqlIdentifierStore {
    async fn lookup(&self, filename: &str) -> Result<Option<String>, LookupError> {
        let row = sqlx::query(&self.lookup_sql)
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;

        let identifier = match row {
            Some(row) => decode_identifier(&row, filename)?,
            None => None,
        };

        debug!(filename, found = identifier.is_some(), "Database lookup");
        Ok(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var tests share process-wide state
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            ENV_DATABASE_URL,
            ENV_DB_HOST,
            ENV_DB_SERVICE_NAME,
            ENV_DB_PORT,
            ENV_DB_USER,
            ENV_DB_PASSWORD,
            ENV_DB_NAME,
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_lookup_sql() {
        let sql = DbConfig::default().lookup_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT `sku` FROM `oc_product` WHERE `image_path` = ? LIMIT 1"
        );
    }

    #[test]
    fn test_custom_layout_sql() {
        let sql = DbConfig::default()
            .with_layout("products", "file_name", "product_code")
            .lookup_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT `product_code` FROM `products` WHERE `file_name` = ? LIMIT 1"
        );
    }

    #[test]
    fn test_rejects_injected_identifiers() {
        let config = DbConfig::default().with_layout("oc_product; DROP TABLE x", "image_path", "sku");
        assert!(matches!(
            config.lookup_sql(),
            Err(LookupError::InvalidIdentifier(_))
        ));

        let config = DbConfig::default().with_layout("oc_product", "", "sku");
        assert!(matches!(
            config.lookup_sql(),
            Err(LookupError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_from_env_defaults() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        let config = DbConfig::from_env();

        assert!(config.url.is_none());
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert!(!config.is_configured());
        assert!(matches!(
            config.connect_options(),
            Err(LookupError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_from_env_components() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        env::set_var(ENV_DB_SERVICE_NAME, "db.internal");
        env::set_var(ENV_DB_PORT, "3307");
        env::set_var(ENV_DB_USER, "shop");
        env::set_var(ENV_DB_NAME, "catalog");

        let config = DbConfig::from_env();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.user, "shop");
        assert_eq!(config.database, "catalog");
        assert!(config.is_configured());
        assert!(config.connect_options().is_ok());

        clear_env();
    }

    #[test]
    fn test_host_takes_precedence_over_service_name() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        env::set_var(ENV_DB_HOST, "primary");
        env::set_var(ENV_DB_SERVICE_NAME, "fallback");

        assert_eq!(DbConfig::from_env().host, "primary");

        clear_env();
    }

    #[test]
    fn test_database_url() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        env::set_var(ENV_DATABASE_URL, "mysql://shop:secret@db:3306/catalog");

        let config = DbConfig::from_env();
        assert!(config.is_configured());
        assert!(config.connect_options().is_ok());

        clear_env();
    }
}
