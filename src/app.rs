use std::path::PathBuf;

use tracing::debug;

use crate::cli::Cli;
use crate::cli::output::OutputMode;
use crate::config::Config;
use crate::error::Result;
use crate::search::Library;
use crate::search::embeddings::{Embedder, embedder_from_config};
use crate::storage::Database;

/// Everything a command needs, built once per process.
pub struct AppContext {
    pub config: Config,
    pub db: Database,
    pub embedder: Option<Box<dyn Embedder>>,
    pub output_mode: OutputMode,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(db_path) = &cli.db {
            config.library.db_path = db_path.clone();
        }
        let db = Database::open(&config.library.db_path)?;
        debug!(
            db = %config.library.db_path.display(),
            schema_version = db.schema_version(),
            "library opened"
        );

        let mut ctx = Self::new(config, db);
        ctx.output_mode = if cli.robot {
            OutputMode::Robot
        } else {
            OutputMode::Human
        };
        ctx.verbosity = cli.verbose;
        Ok(ctx)
    }

    /// Context over an already opened database, in human output mode.
    #[must_use]
    pub fn new(config: Config, db: Database) -> Self {
        let embedder = embedder_from_config(&config.search);
        Self {
            config,
            db,
            embedder,
            output_mode: OutputMode::Human,
            verbosity: 0,
        }
    }

    #[must_use]
    pub fn library(&self) -> Library<'_> {
        Library::new(
            &self.db,
            &self.config.search,
            self.config.library.max_pages_per_read,
            self.embedder.as_deref(),
        )
    }

    #[must_use]
    pub const fn robot(&self) -> bool {
        matches!(self.output_mode, OutputMode::Robot)
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.config.library.db_path.clone()
    }
}
