use super::reader::ReaderError;
use crate::config::types::{Config, SourceConfig};
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One log file and the worker that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub worker_id: String,
}

/// Expand one configured source into the files it covers.
///
/// A file path is taken as is. A directory contributes its regular files
/// whose names match `file_pattern` (all of them when unset), sorted by name.
pub fn discover_source(source_id: &str, source: &SourceConfig) -> Result<Vec<SourceFile>, ReaderError> {
    let worker_id = source.worker_id(source_id).to_string();

    if !source.path.is_dir() {
        return Ok(vec![SourceFile {
            path: source.path.clone(),
            worker_id,
        }]);
    }

    let pattern = source.file_pattern.as_deref().map(Regex::new).transpose()?;
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&source.path)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if pattern.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();

    if paths.is_empty() {
        warn!(source = %source_id, path = %source.path.display(), "Source directory has no matching files");
    }
    debug!(source = %source_id, files = paths.len(), "Discovered source files");

    Ok(paths
        .into_iter()
        .map(|path| SourceFile {
            path,
            worker_id: worker_id.clone(),
        })
        .collect())
}

/// Every file of every configured source, ordered by source id.
pub fn discover_files(config: &Config) -> Result<Vec<SourceFile>, ReaderError> {
    let mut source_ids: Vec<&String> = config.sources.keys().collect();
    source_ids.sort();

    let mut files = Vec::new();
    for source_id in source_ids {
        files.extend(discover_source(source_id, &config.sources[source_id])?);
    }
    Ok(files)
}
