use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sources: HashMap<String, SourceConfig>,
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// A log file, or a directory of log files, written by one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Worker id stamped on every event; defaults to the source id
    #[serde(default)]
    pub worker: Option<String>,
    /// Regex applied to file names when `path` is a directory
    #[serde(default)]
    pub file_pattern: Option<String>,
}

impl SourceConfig {
    pub fn worker_id<'a>(&'a self, source_id: &'a str) -> &'a str {
        self.worker.as_deref().unwrap_or(source_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// One JSON-lines file per record stream is created here
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_limit: default_buffer_limit(),
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

fn default_buffer_limit() -> usize {
    10000
}

fn default_max_concurrent_files() -> usize {
    4
}
