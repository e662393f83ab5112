pub mod env_var {
    use std::{str::FromStr, time::Duration};

    use derive_more::Display;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EnvVar {
        pub server: ServerConfig,
        pub database: DatabaseConfig,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ServerConfig {
        pub port: u16,
        pub prefix: String,
        pub read_timeout: Duration,
        pub write_timeout: Duration,
        pub idle_timeout: Duration,
    }

    impl ServerConfig {
        /// Longest time a request may take, from reading its body to writing the response.
        pub fn request_timeout(&self) -> Duration {
            self.read_timeout + self.write_timeout
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DatabaseConfig {
        pub host: String,
        pub port: u16,
        pub name: String,
        pub user: String,
        pub password: String,
        pub connect_timeout: Duration,
        pub max_connections: u32,
    }

    #[derive(Debug, Display, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        #[display(fmt = "server: invalid port number {_0:?}")]
        InvalidPort(String),
        #[display(fmt = "server: missing prefix")]
        MissingPrefix,
        #[display(fmt = "postgres: missing host")]
        MissingDatabaseHost,
        #[display(fmt = "postgres: invalid port number {_0:?}")]
        InvalidDatabasePort(String),
        #[display(fmt = "postgres: missing database")]
        MissingDatabaseName,
        #[display(fmt = "postgres: missing username")]
        MissingDatabaseUser,
        #[display(fmt = "postgres: missing password")]
        MissingDatabasePassword,
        #[display(fmt = "invalid value {value:?} for {key}")]
        InvalidValue { key: &'static str, value: String },
    }

    impl std::error::Error for ConfigError {}

    /// Reads configuration from the process environment.
    pub fn load() -> Result<EnvVar, ConfigError> {
        load_from(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, applying defaults to unset keys.
    pub fn load_from<F>(lookup: F) -> Result<EnvVar, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let port = env.get("API_PORT", "8080");
        let prefix = env.get("PREFIX", "/app");
        let server = ServerConfig {
            port: port.parse().map_err(|_| ConfigError::InvalidPort(port))?,
            prefix: non_empty(prefix, ConfigError::MissingPrefix)?,
            read_timeout: env.seconds("SERVER_READ_TIMEOUT", 10)?,
            write_timeout: env.seconds("SERVER_WRITE_TIMEOUT", 10)?,
            idle_timeout: env.seconds("SERVER_IDLE_TIMEOUT", 60)?,
        };

        let db_port = env.get("DB_PORT", "5432");
        let database = DatabaseConfig {
            host: non_empty(env.get("DB_HOST", "localhost"), ConfigError::MissingDatabaseHost)?,
            port: db_port
                .parse()
                .map_err(|_| ConfigError::InvalidDatabasePort(db_port))?,
            name: non_empty(env.get("DB_NAME", "users"), ConfigError::MissingDatabaseName)?,
            user: non_empty(env.get("DB_USER", "postgres"), ConfigError::MissingDatabaseUser)?,
            password: non_empty(
                env.get("DB_PASSWORD", "postgres"),
                ConfigError::MissingDatabasePassword,
            )?,
            connect_timeout: env.seconds("DB_TIMEOUT", 5)?,
            max_connections: env.parsed("DB_MAX_CONNECTIONS", 5)?,
        };

        Ok(EnvVar { server, database })
    }

    struct Env<F>(F);

    impl<F: Fn(&str) -> Option<String>> Env<F> {
        fn get(&self, key: &'static str, default: &str) -> String {
            match (self.0)(key) {
                Some(value) => value,
                None => {
                    tracing::info!(key, default, "using default configuration value");
                    default.into()
                }
            }
        }

        fn parsed<T: FromStr + std::fmt::Display>(
            &self,
            key: &'static str,
            default: T,
        ) -> Result<T, ConfigError> {
            match (self.0)(key) {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { key, value }),
                None => {
                    tracing::info!(key, %default, "using default configuration value");
                    Ok(default)
                }
            }
        }

        fn seconds(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
            self.parsed(key, default).map(Duration::from_secs)
        }
    }

    fn non_empty(value: String, err: ConfigError) -> Result<String, ConfigError> {
        if value.is_empty() {
            Err(err)
        } else {
            Ok(value)
        }
    }

}

pub mod logging {
    use std::str::FromStr;

    use tracing::Level;

    /// Installs the global subscriber, with the max level read from `LOG_LEVEL`.
    pub fn init() {
        let level = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|level| Level::from_str(&level).ok())
            .unwrap_or(Level::INFO);

        tracing_subscriber::fmt().with_max_level(level).init();
    }
}
