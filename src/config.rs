use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub storage: StorageMode,
    pub database_max_connections: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageMode {
    /// PostgreSQL reachable at the given connection URL
    Postgres(String),
    /// Process-local store, lost on restart
    Memory,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 5000,
            jwt_secret: "dev-secret-change-in-production".to_string(),
            storage: StorageMode::Memory,
            database_max_connections: 20,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => StorageMode::Postgres(url),
            None => StorageMode::Memory,
        };

        Self {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: lookup("PORT")
                .or_else(|| lookup("SERVER_PORT"))
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.server_port),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            storage,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_use_memory_storage() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.storage, StorageMode::Memory);
        assert_eq!(config.server_address(), "0.0.0.0:5000");
        assert_eq!(config.database_max_connections, 20);
    }

    #[test]
    fn test_port_precedence_and_database_url() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("SERVER_PORT", "9090"),
            ("DATABASE_URL", "postgres://localhost/collab"),
        ]));
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.storage, StorageMode::Postgres("postgres://localhost/collab".to_string()));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
            ("DATABASE_URL", "  "),
        ]));
        assert_eq!(config.server_port, 5000);
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.storage, StorageMode::Memory);
    }
}
