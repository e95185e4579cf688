//! Store connection configuration.

/// Connection properties for the clustered store.
///
/// These are passed through to the backend's connection factory and
/// logged at pool startup; the session layer itself only reads them
/// for diagnostics.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cluster connect string (management-node host list).
    pub connect_string: String,

    /// Database name.
    pub database: String,

    /// Maximum concurrent transactions the factory should allow.
    pub max_transactions: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connect_string: "localhost:1186".to_string(),
            database: "metadata".to_string(),
            max_transactions: 1024,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cluster connect string.
    #[must_use]
    pub fn connect_string(mut self, connect_string: impl Into<String>) -> Self {
        self.connect_string = connect_string.into();
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the maximum concurrent transactions.
    #[must_use]
    pub fn max_transactions(mut self, max_transactions: u32) -> Self {
        self.max_transactions = max_transactions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fluent() {
        let config = StoreConfig::new()
            .connect_string("mgmt-1:1186,mgmt-2:1186")
            .database("fsmeta")
            .max_transactions(4096);

        assert_eq!(config.connect_string, "mgmt-1:1186,mgmt-2:1186");
        assert_eq!(config.database, "fsmeta");
        assert_eq!(config.max_transactions, 4096);
    }
}
