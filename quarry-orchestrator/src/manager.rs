//! Manager
//!
//! Loads every crawler definition found in a directory and drives them as a
//! group.

use indexmap::IndexMap;
use quarry_core::domain::pipeline::PipelineDefinition;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::OrchestratorConfig;
use crate::crawler::{Backends, Crawler};
use crate::error::{ConfigError, Result};

/// Crawlers keyed by pipeline name, in load order
#[derive(Debug, Default)]
pub struct Manager {
    crawlers: IndexMap<String, Crawler>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.yml` / `*.yaml` file directly inside `dir`
    ///
    /// Files are read in path order and the file name, extension included,
    /// is used as the identifier of definitions that carry no `name`.
    pub fn load_path(
        dir: impl AsRef<Path>,
        config: Arc<OrchestratorConfig>,
        backends: Backends,
    ) -> std::result::Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut manager = Self::new();

        for path in definition_files(dir)? {
            let yaml = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let definition: PipelineDefinition =
                serde_yaml::from_str(&yaml).map_err(|source| ConfigError::File {
                    path: path.clone(),
                    source,
                })?;
            let identifier = path
                .file_name()
                .map(|file_name| file_name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let crawler = Crawler::new(&identifier, definition, config.clone(), backends.clone())?;
            debug!(path = %path.display(), pipeline = %crawler.name(), "Loaded crawler");
            manager.insert(crawler)?;
        }

        info!(
            dir = %dir.display(),
            crawlers = manager.len(),
            "Loaded crawler definitions"
        );

        Ok(manager)
    }

    /// Adds a crawler; pipeline names must be unique
    pub fn insert(&mut self, crawler: Crawler) -> std::result::Result<(), ConfigError> {
        if self.crawlers.contains_key(crawler.name()) {
            return Err(ConfigError::DuplicatePipeline(crawler.name().to_string()));
        }
        self.crawlers.insert(crawler.name().to_string(), crawler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Crawler> {
        self.crawlers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Crawler> {
        self.crawlers.values()
    }

    pub fn len(&self) -> usize {
        self.crawlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawlers.is_empty()
    }

    /// Runs every crawler whose schedule is due and returns their names
    ///
    /// Stops at the first failure.
    pub async fn run_due(&self) -> Result<Vec<String>> {
        let mut ran = Vec::new();
        for crawler in self.iter() {
            if !crawler.check_due().await? {
                continue;
            }
            info!(pipeline = %crawler.name(), "Crawler is due, running");
            crawler.run(None).await?;
            ran.push(crawler.name().to_string());
        }
        Ok(ran)
    }

    pub async fn flush_all(&self) -> Result<()> {
        for crawler in self.iter() {
            crawler.flush().await?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Manager {
    type Item = &'a Crawler;
    type IntoIter = indexmap::map::Values<'a, String, Crawler>;

    fn into_iter(self) -> Self::IntoIter {
        self.crawlers.values()
    }
}

fn definition_files(dir: &Path) -> std::result::Result<Vec<PathBuf>, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
