use super::reader::{LineReader, ReaderError};
use crate::classify::LineClassifier;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::event::JobEvent;
use crate::extract::{ExtractorChain, LineContext};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

static BACKGROUNDER_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^backgrounder(?:_(?P<node>[^-.]+))?-(?P<n>\d+)")
        .expect("backgrounder file name regex is valid")
});

/// Derive the worker instance id from a log file name.
///
/// `backgrounder_node1-2.log` gives `node1-2`, `backgrounder-0.log` gives `0`.
/// Any other name is cut at its first `.`.
pub fn instance_id_from_file_name(file_name: &str) -> String {
    if let Some(caps) = BACKGROUNDER_FILE.captures(file_name) {
        return match caps.name("node") {
            Some(node) => format!("{}-{}", node.as_str(), &caps["n"]),
            None => caps["n"].to_string(),
        };
    }
    file_name
        .split_once('.')
        .map_or(file_name, |(stem, _)| stem)
        .to_string()
}

/// Per-line totals for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub records: u64,
    pub events: u64,
    pub unmatched: u64,
}

impl std::ops::AddAssign for FileStats {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.events += other.events;
        self.unmatched += other.unmatched;
    }
}

/// Ingestion state for one log file.
///
/// The classifier and extractor chain reorder their grammars as they go, so
/// each file gets its own context and no state is shared between files.
pub struct FileContext {
    file_name: String,
    path: PathBuf,
    worker_id: String,
    instance_id: String,
    classifier: LineClassifier,
    extractors: ExtractorChain,
    diagnostics: Diagnostics,
    stats: FileStats,
}

impl FileContext {
    pub fn new(path: &Path, worker_id: &str, diagnostics: Diagnostics) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let instance_id = instance_id_from_file_name(&file_name);

        Self {
            file_name,
            path: path.to_path_buf(),
            worker_id: worker_id.to_string(),
            instance_id,
            classifier: LineClassifier::new(),
            extractors: ExtractorChain::new(),
            diagnostics,
            stats: FileStats::default(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn stats(&self) -> FileStats {
        self.stats
    }

    /// Classify and extract one logical line.
    ///
    /// Header mismatches are reported to diagnostics and yield `None`, as do
    /// lines that carry no job-scoped event.
    pub fn process_line(&mut self, line_number: u64, text: &str) -> Option<JobEvent> {
        self.stats.records += 1;

        let Some(line) = self.classifier.classify(text) else {
            self.stats.unmatched += 1;
            self.diagnostics.report(
                DiagnosticKind::UnmatchedHeader,
                &self.file_name,
                line_number,
                "line does not match any header grammar",
            );
            return None;
        };

        let ctx = LineContext {
            file: &self.file_name,
            line: line_number,
            worker_id: &self.worker_id,
            instance_id: &self.instance_id,
        };
        let extracted = self.extractors.extract(&ctx, &line)?;
        for warning in &extracted.warnings {
            self.diagnostics.report(
                DiagnosticKind::Extraction,
                &self.file_name,
                line_number,
                warning.as_str(),
            );
        }

        self.stats.events += 1;
        Some(extracted.event)
    }

    /// Report continuation lines the reader had to drop.
    pub fn report_orphaned(&self, orphaned_lines: u64) {
        if orphaned_lines > 0 {
            self.diagnostics.report(
                DiagnosticKind::OrphanedLines,
                &self.file_name,
                0,
                format!("{} continuation lines before the first header", orphaned_lines),
            );
        }
    }
}

/// Read a whole file, handing every event to `emit` in file order.
///
/// `cancelled` is checked before each record; once it returns true the file
/// stops early and the events already emitted stand.
pub fn process_file<C, F, E>(
    path: &Path,
    worker_id: &str,
    diagnostics: Diagnostics,
    cancelled: C,
    mut emit: F,
) -> Result<FileStats, E>
where
    C: Fn() -> bool,
    F: FnMut(JobEvent) -> Result<(), E>,
    E: From<ReaderError>,
{
    let mut context = FileContext::new(path, worker_id, diagnostics);
    let mut reader = LineReader::open(path)?;
    debug!(
        file = %context.file_name(),
        worker = %context.worker_id(),
        instance = %context.instance_id(),
        "Reading file"
    );

    while let Some(record) = reader.next_record()? {
        if cancelled() {
            info!(file = %context.file_name(), line = record.line_number, "File processing cancelled");
            break;
        }
        if let Some(event) = context.process_line(record.line_number, &record.text) {
            emit(event)?;
        }
    }
    context.report_orphaned(reader.orphaned_lines());

    let stats = context.stats();
    debug!(
        file = %context.file_name(),
        records = stats.records,
        events = stats.events,
        unmatched = stats.unmatched,
        "Finished file"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const START: &str = "2018-08-08 11:16:31.950 +1000 (,,,,1,:update_vertica_keychains,-) pool-1 backgrounder: INFO com.tableausoftware.backgrounder.runner.BackgroundJobRunner - Running job of type UpdateVerticaKeychains; no timeout; priority: 0; id: null; args: []";

    #[test]
    fn test_instance_id_from_backgrounder_names() {
        assert_eq!(instance_id_from_file_name("backgrounder-0.log"), "0");
        assert_eq!(instance_id_from_file_name("backgrounder_node2-3.log.1"), "node2-3");
        assert_eq!(instance_id_from_file_name("vizqlserver_1.log"), "vizqlserver_1");
        assert_eq!(instance_id_from_file_name("noext"), "noext");
    }

    #[test]
    fn test_process_line_reports_unmatched_header() {
        let diagnostics = Diagnostics::new();
        let mut context =
            FileContext::new(Path::new("/logs/backgrounder-1.log"), "worker0", diagnostics.clone());

        assert!(context.process_line(4, "2018-08-08 not a header").is_none());
        assert_eq!(diagnostics.counts().unmatched_headers, 1);
        assert_eq!(diagnostics.retained()[0].line, 4);
        assert_eq!(diagnostics.retained()[0].file, "backgrounder-1.log");
    }

    #[test]
    fn test_process_line_carries_file_identity() {
        let mut context = FileContext::new(
            Path::new("/logs/backgrounder_node1-2.log"),
            "worker1",
            Diagnostics::new(),
        );
        match context.process_line(7, START) {
            Some(JobEvent::Start(start)) => {
                assert_eq!(start.worker_id, "worker1");
                assert_eq!(start.instance_id, "node1-2");
                assert_eq!(start.provenance.line, 7);
                assert_eq!(start.provenance.file, "backgrounder_node1-2.log");
            }
            other => panic!("expected start event, got {:?}", other),
        }
    }

    #[test]
    fn test_process_file_emits_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounder-0.log");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "orphan continuation").unwrap();
        writeln!(file, "{}", START).unwrap();
        writeln!(file, "2018-08-08 11:16:32.000 +1000 (,,,,,,-) pool-1 backgrounder: INFO a.B - no job here").unwrap();
        drop(file);

        let diagnostics = Diagnostics::new();
        let mut events = Vec::new();
        let stats = process_file::<_, _, ReaderError>(
            &path,
            "worker0",
            diagnostics.clone(),
            || false,
            |event| {
                events.push(event);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].job_id(), Some(1));
        assert_eq!(stats.records, 2);
        assert_eq!(stats.events, 1);
        assert_eq!(diagnostics.counts().warnings, 1);
    }

    #[test]
    fn test_process_file_survives_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounder-0.log");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", START).unwrap();
        file.write_all(b"2018-08-08 11:16:32.000 +1000 (,,,,,,-) pool-1 backgrounder: INFO a.B - user caf\xe9\n")
            .unwrap();
        writeln!(file, "{}", START.replace("id: null", "id: 2").replace(",,,,1,", ",,,,2,")).unwrap();
        drop(file);

        let mut events = Vec::new();
        let stats = process_file::<_, _, ReaderError>(
            &path,
            "worker0",
            Diagnostics::new(),
            || false,
            |event| {
                events.push(event);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(stats.records, 3);
        let ids: Vec<_> = events.iter().map(|e| e.job_id()).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_process_file_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounder-0.log");
        std::fs::write(&path, format!("{}\n{}\n{}\n", START, START, START)).unwrap();

        let emitted = std::cell::Cell::new(0);
        let stats = process_file::<_, _, ReaderError>(
            &path,
            "worker0",
            Diagnostics::new(),
            || emitted.get() >= 1,
            |_| {
                emitted.set(emitted.get() + 1);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(emitted.get(), 1);
        assert_eq!(stats.events, 1);
    }
}
