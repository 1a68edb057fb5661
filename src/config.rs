use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShelfError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Defaults, then the explicit file (`--config` or `REFSHELF_CONFIG`) or
    /// the global file, then `REFSHELF_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_path, |key| std::env::var(key).ok())
    }

    pub(crate) fn load_with<F>(explicit_path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("REFSHELF_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(ShelfError::MissingConfig(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides(&env)?;
        config.validate()?;

        Ok(config)
    }

    /// Location of the per-user config file, if the platform has one.
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("refshelf").join("config.toml"))
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match Self::global_path() {
            Some(path) => Self::load_patch(&path),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| ShelfError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| ShelfError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.library {
            self.library.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
    }

    fn apply_env_overrides<F>(&mut self, env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env("REFSHELF_DB_PATH") {
            self.library.db_path = PathBuf::from(value);
        }
        if let Some(value) = env("REFSHELF_PDF_DIR") {
            self.library.pdf_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = env_parse(env, "REFSHELF_MAX_PAGES_PER_READ")? {
            self.library.max_pages_per_read = value;
        }

        if let Some(value) = env_parse(env, "REFSHELF_DEFAULT_LIMIT")? {
            self.search.default_limit = value;
        }
        if let Some(value) = env_parse(env, "REFSHELF_MAX_SNIPPETS")? {
            self.search.max_snippets_per_reference = value;
        }
        if let Some(value) = env_bool(env, "REFSHELF_USE_EMBEDDINGS") {
            self.search.use_embeddings = value;
        }
        if let Some(value) = env("REFSHELF_EMBEDDING_BACKEND") {
            self.search.embedding_backend = value;
        }
        if let Some(value) = env_parse(env, "REFSHELF_EMBEDDING_DIMS")? {
            self.search.embedding_dims = value;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("library.max_pages_per_read", self.library.max_pages_per_read as usize),
            ("search.default_limit", self.search.default_limit),
            ("search.library_limit", self.search.library_limit),
            ("search.related_limit", self.search.related_limit),
            ("search.max_snippets_per_reference", self.search.max_snippets_per_reference),
            ("search.embedding_dims", self.search.embedding_dims),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ShelfError::Config(format!("{key} must be greater than 0")));
            }
        }
        if self.library.db_path.as_os_str().is_empty() {
            return Err(ShelfError::Config("library.db_path must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory attached documents live in; recorded for callers, not read.
    #[serde(default)]
    pub pdf_dir: Option<PathBuf>,
    #[serde(default = "default_max_pages_per_read")]
    pub max_pages_per_read: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            pdf_dir: None,
            max_pages_per_read: default_max_pages_per_read(),
        }
    }
}

impl LibraryConfig {
    fn merge(&mut self, patch: LibraryPatch) {
        if let Some(value) = patch.db_path {
            self.db_path = value;
        }
        if let Some(value) = patch.pdf_dir {
            self.pdf_dir = Some(value);
        }
        if let Some(value) = patch.max_pages_per_read {
            self.max_pages_per_read = value;
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refshelf")
        .join("library.db")
}

const fn default_max_pages_per_read() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub library_limit: usize,
    pub related_limit: usize,
    pub max_snippets_per_reference: usize,
    pub use_embeddings: bool,
    pub embedding_backend: String,
    pub embedding_dims: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            library_limit: 30,
            related_limit: 10,
            max_snippets_per_reference: 3,
            use_embeddings: true,
            embedding_backend: "hash".to_string(),
            embedding_dims: 384,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_limit {
            self.default_limit = value;
        }
        if let Some(value) = patch.library_limit {
            self.library_limit = value;
        }
        if let Some(value) = patch.related_limit {
            self.related_limit = value;
        }
        if let Some(value) = patch.max_snippets_per_reference {
            self.max_snippets_per_reference = value;
        }
        if let Some(value) = patch.use_embeddings {
            self.use_embeddings = value;
        }
        if let Some(value) = patch.embedding_backend {
            self.embedding_backend = value;
        }
        if let Some(value) = patch.embedding_dims {
            self.embedding_dims = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    library: Option<LibraryPatch>,
    search: Option<SearchPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LibraryPatch {
    db_path: Option<PathBuf>,
    pdf_dir: Option<PathBuf>,
    max_pages_per_read: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    default_limit: Option<usize>,
    library_limit: Option<usize>,
    related_limit: Option<usize>,
    max_snippets_per_reference: Option<usize>,
    use_embeddings: Option<bool>,
    embedding_backend: Option<String>,
    embedding_dims: Option<usize>,
}

fn env_bool<F>(env: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    env(key).map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_parse<F, T>(env: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| ShelfError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}
