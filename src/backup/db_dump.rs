// mongobackup/src/backup/db_dump.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::Client;
use mongodb::options::ClientOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::MongoConfig;
use crate::utils::databases::filter_system_databases;
use crate::utils::find_mongodump_executable;
use crate::utils::setting::{build_cluster_uri, redact_uri};

/// Lists the database names visible to the backup user.
#[async_trait]
pub trait DatabaseLister: Send + Sync {
    async fn list_database_names(&self) -> Result<Vec<String>>;
}

/// Exports one database into `out_dir`.
#[async_trait]
pub trait DumpRunner: Send + Sync {
    async fn dump(&self, database: &str, out_dir: &Path) -> Result<()>;
}

/// Result of dumping a single database during a run.
#[derive(Debug)]
pub struct DumpOutcome {
    pub database: String,
    pub result: Result<()>,
}

impl DumpOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Lists databases on the cluster through the MongoDB driver.
pub struct MongoLister {
    mongo: MongoConfig,
}

impl MongoLister {
    pub fn new(mongo: MongoConfig) -> Self {
        Self { mongo }
    }

    async fn connect(&self) -> Result<Client> {
        let uri = build_cluster_uri(&self.mongo, None)?;
        let mut options = ClientOptions::parse(uri.as_str())
            .await
            .with_context(|| format!("Failed to parse MongoDB connection string {}", redact_uri(&uri)))?;
        options.app_name = Some("mongobackup".to_string());
        options.connect_timeout = Some(self.mongo.connect_timeout);
        options.server_selection_timeout = Some(self.mongo.connect_timeout);
        Client::with_options(options).context("Failed to create MongoDB client")
    }
}

#[async_trait]
impl DatabaseLister for MongoLister {
    async fn list_database_names(&self) -> Result<Vec<String>> {
        let timeout = self.mongo.connect_timeout;
        let listing = async {
            let client = self.connect().await?;
            let names = client
                .list_database_names()
                .await
                .context("Failed to list databases")?;
            client.shutdown().await;
            Ok::<_, anyhow::Error>(names)
        };

        tokio::time::timeout(timeout, listing).await.with_context(|| {
            format!(
                "Timed out after {}s connecting to cluster {}",
                timeout.as_secs(),
                self.mongo.cluster_host
            )
        })?
    }
}

/// Runs the external `mongodump` tool, one process per database.
pub struct MongoDumpRunner {
    mongo: MongoConfig,
    mongodump_path: PathBuf,
}

impl MongoDumpRunner {
    /// Uses `mongodump_path` when given, otherwise looks the tool up in PATH.
    pub fn new(mongo: MongoConfig, mongodump_path: Option<PathBuf>) -> Result<Self> {
        let mongodump_path = match mongodump_path {
            Some(path) => path,
            None => find_mongodump_executable()?,
        };
        info!(path = %mongodump_path.display(), "using mongodump executable");
        Ok(Self {
            mongo,
            mongodump_path,
        })
    }
}

#[async_trait]
impl DumpRunner for MongoDumpRunner {
    async fn dump(&self, database: &str, out_dir: &Path) -> Result<()> {
        let uri = build_cluster_uri(&self.mongo, Some(database))?;
        let status = Command::new(&self.mongodump_path)
            .arg("--uri")
            .arg(&uri)
            .arg("--out")
            .arg(out_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to execute mongodump for database: {}", database))?;

        if !status.success() {
            anyhow::bail!("mongodump for database {} failed with status: {}", database, status);
        }
        Ok(())
    }
}

/// Lists the cluster's databases and drops the system ones.
pub async fn enumerate_databases(lister: &dyn DatabaseLister) -> Result<Vec<String>> {
    let all = lister.list_database_names().await?;
    let included = filter_system_databases(all);
    info!(count = included.len(), databases = ?included, "databases selected for backup");
    Ok(included)
}

/// Dumps each database into `<output_dir>/<database>`, strictly one after another.
///
/// A failed dump is logged and recorded; the loop always runs to the end.
pub async fn dump_databases(
    runner: &dyn DumpRunner,
    databases: &[String],
    output_dir: &Path,
) -> Vec<DumpOutcome> {
    let mut outcomes = Vec::with_capacity(databases.len());

    for db_name in databases {
        info!(database = %db_name, "Backing up database");
        let out_dir = output_dir.join(db_name);
        let result = runner.dump(db_name, &out_dir).await;

        match &result {
            Ok(()) => info!(database = %db_name, "✓ Successfully backed up database"),
            Err(e) => {
                let message = format!("{e:#}");
                error!(database = %db_name, error = %message, "Failed to dump database");
            }
        }
        outcomes.push(DumpOutcome {
            database: db_name.clone(),
            result,
        });
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "Some database dumps failed; archiving partial output");
    } else {
        info!(total = outcomes.len(), "All backups completed.");
    }
    outcomes
}
