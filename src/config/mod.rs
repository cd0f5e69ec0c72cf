// mongobackup/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKUP_OUTPUT_DIR: &str = "./backup";
pub const DEFAULT_APP_PORT: u16 = 8080;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Struct for deserializing config.json. Every key may also come from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub mongo_username: Option<String>,
    pub mongo_password: Option<String>,
    pub mongo_cluster_uri: Option<String>,
    pub mongo_connect_timeout_secs: Option<u64>,
    pub mongodump_path: Option<PathBuf>,
    pub backup_output_dir: Option<PathBuf>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: Option<String>,
    pub aws_bucket_name: Option<String>,
    pub aws_endpoint_url: Option<String>,
    pub app_port: Option<u16>,
}

// Application's internal configuration structs
#[derive(Clone)]
pub struct MongoConfig {
    pub username: String,
    pub password: String,
    pub cluster_host: String,
    pub connect_timeout: Duration,
}

#[derive(Clone)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket_name: String,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo: MongoConfig,
    pub storage: StorageConfig,
    pub backup_output_dir: PathBuf,
    pub mongodump_path: Option<PathBuf>,
    pub app_port: u16,
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cluster_host", &self.cluster_host)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl AppConfig {
    /// Loads `config.json` (if present) and `.env` (if present), then resolves every
    /// setting with process environment variables taking precedence.
    pub fn load(config_path: &Path) -> Result<Self> {
        let raw = if config_path.exists() {
            let config_content = fs::read_to_string(config_path).with_context(|| {
                format!("Failed to read config file at {}", config_path.display())
            })?;
            serde_json::from_str(&config_content).with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?
        } else {
            RawJsonConfig::default()
        };

        match dotenv::dotenv() {
            Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
            Err(e) if e.not_found() => tracing::debug!("no .env file found, using process environment"),
            Err(e) => return Err(e).context("Failed to load .env file"),
        }

        Self::from_lookup(raw, |key| std::env::var(key).ok())
    }

    /// Resolves the configuration from a parsed file and an environment lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(raw: RawJsonConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str, file_value: Option<String>| -> Result<String> {
            env(key)
                .or_else(|| file_value.filter(|v| !v.trim().is_empty()))
                .with_context(|| format!("{key} must be set in the environment or config.json"))
        };

        let mongo = MongoConfig {
            username: required("MONGO_USERNAME", raw.mongo_username)?,
            password: required("MONGO_PASSWORD", raw.mongo_password)?,
            cluster_host: required("MONGO_CLUSTER_URI", raw.mongo_cluster_uri)?,
            connect_timeout: Duration::from_secs(
                parse_optional::<u64>("MONGO_CONNECT_TIMEOUT_SECS", env("MONGO_CONNECT_TIMEOUT_SECS"))?
                    .or(raw.mongo_connect_timeout_secs)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
        };

        let storage = StorageConfig {
            access_key_id: required("AWS_ACCESS_KEY_ID", raw.aws_access_key_id)?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY", raw.aws_secret_access_key)?,
            region: required("AWS_REGION", raw.aws_region)?,
            bucket_name: required("AWS_BUCKET_NAME", raw.aws_bucket_name)?,
            endpoint_url: env("AWS_ENDPOINT_URL")
                .or(raw.aws_endpoint_url.filter(|s| !s.is_empty())),
        };

        let backup_output_dir = env("BACKUP_OUTPUT_DIR")
            .map(PathBuf::from)
            .or(raw.backup_output_dir.filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_OUTPUT_DIR));

        let app_port = parse_optional::<u16>("APP_PORT", env("APP_PORT"))?
            .or(raw.app_port)
            .unwrap_or(DEFAULT_APP_PORT);

        Ok(AppConfig {
            mongo,
            storage,
            backup_output_dir,
            mongodump_path: env("MONGODUMP_PATH").map(PathBuf::from).or(raw.mongodump_path),
            app_port,
        })
    }
}

fn parse_optional<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {v}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("MONGO_USERNAME", "backup"),
            ("MONGO_PASSWORD", "s3cret"),
            ("MONGO_CLUSTER_URI", "cluster0.example.mongodb.net"),
            ("AWS_ACCESS_KEY_ID", "AKIA123"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_BUCKET_NAME", "nightly-dumps"),
        ])
    }

    fn lookup<'a>(env: &'a HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_applied() -> anyhow::Result<()> {
        let env = base_env();
        let config = AppConfig::from_lookup(RawJsonConfig::default(), lookup(&env))?;

        assert_eq!(config.backup_output_dir, PathBuf::from("./backup"));
        assert_eq!(config.app_port, 8080);
        assert_eq!(config.mongo.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.storage.endpoint_url, None);
        assert_eq!(config.mongodump_path, None);
        Ok(())
    }

    #[test]
    fn test_env_overrides_file() -> anyhow::Result<()> {
        let mut env = base_env();
        env.insert("APP_PORT", "9090");
        env.insert("BACKUP_OUTPUT_DIR", "/var/backups/mongo");
        let raw = RawJsonConfig {
            app_port: Some(7000),
            backup_output_dir: Some(PathBuf::from("/from/file")),
            aws_region: Some("us-east-1".into()),
            ..Default::default()
        };

        let config = AppConfig::from_lookup(raw, lookup(&env))?;
        assert_eq!(config.app_port, 9090);
        assert_eq!(config.backup_output_dir, PathBuf::from("/var/backups/mongo"));
        assert_eq!(config.storage.region, "eu-west-1");
        Ok(())
    }

    #[test]
    fn test_file_fills_missing_env() -> anyhow::Result<()> {
        let mut env = base_env();
        env.remove("AWS_BUCKET_NAME");
        let raw: RawJsonConfig = serde_json::from_value(serde_json::json!({
            "aws_bucket_name": "from-file",
            "app_port": 3000
        }))?;

        let config = AppConfig::from_lookup(raw, lookup(&env))?;
        assert_eq!(config.storage.bucket_name, "from-file");
        assert_eq!(config.app_port, 3000);
        Ok(())
    }

    #[test]
    fn test_missing_required_key_fails() {
        let mut env = base_env();
        env.remove("MONGO_PASSWORD");
        let err = AppConfig::from_lookup(RawJsonConfig::default(), lookup(&env)).unwrap_err();
        assert!(err.to_string().contains("MONGO_PASSWORD"));
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let mut env = base_env();
        env.insert("AWS_REGION", "  ");
        assert!(AppConfig::from_lookup(RawJsonConfig::default(), lookup(&env)).is_err());
    }

    #[test]
    fn test_invalid_port_fails() {
        let mut env = base_env();
        env.insert("APP_PORT", "eighty");
        let err = AppConfig::from_lookup(RawJsonConfig::default(), lookup(&env)).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn test_debug_redacts_secrets() -> anyhow::Result<()> {
        let env = base_env();
        let config = AppConfig::from_lookup(RawJsonConfig::default(), lookup(&env))?;
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("\"shh\""));
        assert!(rendered.contains("<redacted>"));
        Ok(())
    }
}
