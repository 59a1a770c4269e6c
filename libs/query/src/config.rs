use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Where queries go and whose credentials sign them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub database: String,
    pub table: String,
    /// Named profile in the shared config and credentials files. `None`
    /// uses the default provider chain.
    #[serde(default)]
    pub credential_profile: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// Fixed query endpoint. When unset the endpoint is discovered.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Page size hint passed to the service.
    #[serde(default)]
    pub max_rows: Option<u32>,
}

fn default_region() -> String {
    "us-east-1".into()
}

impl QueryConfig {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            credential_profile: None,
            region: default_region(),
            endpoint: None,
            max_rows: None,
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        for (what, value) in [("database", &self.database), ("table", &self.table)] {
            if value.is_empty() {
                return Err(QueryError::Config(format!("{what} is required")));
            }
            if value.contains('"') {
                return Err(QueryError::Config(format!("{what} {value:?} contains a double quote")));
            }
        }
        if self.region.is_empty() {
            return Err(QueryError::Config("region is required".into()));
        }
        Ok(())
    }

    /// Quoted `"database"."table"` reference for query text.
    pub fn table_ref(&self) -> String {
        format!("\"{}\".\"{}\"", self.database, self.table)
    }

    /// Same database, another table.
    pub fn with_table(&self, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_toml_like_json() {
        let cfg: QueryConfig =
            serde_json::from_str(r#"{"database": "embrace", "table": "eda"}"#).unwrap();
        assert_eq!(cfg.region, "us-east-1");
        assert!(cfg.credential_profile.is_none());
        assert_eq!(cfg.table_ref(), r#""embrace"."eda""#);
    }

    #[test]
    fn test_validate_rejects_quotes_and_blanks() {
        assert!(QueryConfig::new("", "eda").validate().is_err());
        assert!(QueryConfig::new("db", "e\"da").validate().is_err());
        assert!(QueryConfig::new("db", "eda").validate().is_ok());
    }

    #[test]
    fn test_with_table_keeps_the_rest() {
        let mut cfg = QueryConfig::new("db", "eda");
        cfg.credential_profile = Some("lab".into());
        let temp = cfg.with_table("temp");
        assert_eq!(temp.table, "temp");
        assert_eq!(temp.credential_profile.as_deref(), Some("lab"));
    }
}
