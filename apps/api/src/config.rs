use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing::warn;

/// Which document store backend holds the `users` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("DOCUMENT_STORE must be one of firestore, postgres, memory (got '{other}')"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Vendor connection parameters are read once and not validated: a missing key is
/// logged and the failure surfaces on the first vendor call.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_max_attempts: u32,
    pub firebase_api_key: String,
    pub firebase_project_id: String,
    pub firebase_auth_domain: Option<String>,
    pub document_store: StoreBackend,
    pub database_url: Option<String>,
    pub auth_persistence_path: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let document_store: StoreBackend = std::env::var("DOCUMENT_STORE")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL").ok();
        if document_store == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when DOCUMENT_STORE=postgres");
        }

        Ok(Config {
            gemini_api_key: vendor_env("GEMINI_API_KEY"),
            gemini_max_attempts: std::env::var("GEMINI_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<u32>()
                .context("GEMINI_MAX_ATTEMPTS must be a positive integer")?
                .max(1),
            firebase_api_key: vendor_env("FIREBASE_API_KEY"),
            firebase_project_id: vendor_env("FIREBASE_PROJECT_ID"),
            firebase_auth_domain: std::env::var("FIREBASE_AUTH_DOMAIN").ok(),
            document_store,
            database_url,
            auth_persistence_path: std::env::var("AUTH_PERSISTENCE_PATH").ok().map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Config {
    /// Names of vendor parameters that were not set.
    pub fn missing_vendor_keys(&self) -> Vec<&'static str> {
        [
            ("GEMINI_API_KEY", &self.gemini_api_key),
            ("FIREBASE_API_KEY", &self.firebase_api_key),
            ("FIREBASE_PROJECT_ID", &self.firebase_project_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(key, _)| key)
        .collect()
    }

    pub fn warn_missing_vendor_keys(&self) {
        for key in self.missing_vendor_keys() {
            warn!("Environment variable '{key}' is not set; vendor calls will fail");
        }
    }
}

/// Reads a vendor connection parameter. Absence is reported by
/// [`Config::warn_missing_vendor_keys`], never as an error.
fn vendor_env(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parses_case_insensitively() {
        assert_eq!("Firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert_eq!(" postgres ".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("MEMORY".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
    }

    #[test]
    fn test_missing_vendor_keys_are_listed() {
        let config = Config {
            gemini_api_key: String::new(),
            gemini_max_attempts: 1,
            firebase_api_key: "key".to_string(),
            firebase_project_id: String::new(),
            firebase_auth_domain: None,
            document_store: StoreBackend::Memory,
            database_url: None,
            auth_persistence_path: None,
            port: 8080,
            rust_log: "info".to_string(),
        };
        assert_eq!(
            config.missing_vendor_keys(),
            vec!["GEMINI_API_KEY", "FIREBASE_PROJECT_ID"]
        );
    }

    #[test]
    fn test_store_backend_rejects_unknown() {
        let err = "mongo".parse::<StoreBackend>().unwrap_err();
        assert!(err.to_string().contains("mongo"));
    }
}
