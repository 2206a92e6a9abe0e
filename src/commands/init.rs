//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::quiz::{QuizRepository, RepositorySettings};
use crate::results::ResultStore;
use crate::sheet::SqliteSheetStore;
use crate::store::QdrantStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub collection_ready: bool,
}

/// Write the default config and create the local database
pub async fn cmd_init(options: InitOptions) -> Result<InitReport> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.init_paths(Some(base_dir));
    config.paths.config_file = config_path.clone();
    config.save()?;

    let sheets = Arc::new(SqliteSheetStore::new(&config.paths.db_file).await?);
    QuizRepository::open(sheets.clone(), RepositorySettings::from_config(&config)?).await?;
    ResultStore::open(sheets).await?;
    info!("Database ready at {:?}", config.paths.db_file);

    // Qdrant may not be running yet; `db init` can create the collection later
    let collection_ready = match QdrantStore::connect(&config) {
        Ok(store) => match store.ensure_collection().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not create Qdrant collection: {}", e);
                false
            }
        },
        Err(e) => {
            warn!("Could not connect to Qdrant: {}", e);
            false
        }
    };

    Ok(InitReport {
        config_path,
        db_path: config.paths.db_file,
        collection_ready,
    })
}

pub fn print_init_report(report: &InitReport) {
    println!("✓ quizzer initialized successfully");
    println!("  Config: {}", report.config_path.display());
    println!("  Database: {}", report.db_path.display());
    if !report.collection_ready {
        println!("  ⚠ Qdrant collection not created; run 'quizzer db init' once Qdrant is up");
    }
    println!("\nNext steps:");
    println!("  1. Export the API key named in the config (default OPENAI_API_KEY)");
    println!("  2. Start Qdrant: docker run -p 6333:6333 -p 6334:6334 qdrant/qdrant");
    println!("  3. Upload a document: quizzer upload notes.pdf");
}
