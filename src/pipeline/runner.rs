use super::channel::{create_channel, EventReceiver, EventSender};
use crate::config::types::PipelineConfig;
use crate::correlate::{Correlator, DrainStats};
use crate::diagnostics::Diagnostics;
use crate::source::{process_file, FileStats, ReaderError, SourceFile};
use crate::storage::{SinkError, Sinks, WriteCounts};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Errors that can occur during pipeline operation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("source reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("channel send error")]
    ChannelSend,

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub buffer_limit: usize,
    pub max_concurrent_files: usize,
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            buffer_limit: config.buffer_limit,
            max_concurrent_files: config.max_concurrent_files,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// What the correlator task did once its input closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationOutcome {
    pub events: u64,
    pub drain: DrainStats,
    pub counts: WriteCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub files: u64,
    pub failed_files: u64,
    pub lines: FileStats,
    pub correlation: CorrelationOutcome,
    pub cancelled: bool,
}

/// Run the correlator task.
///
/// Owns the correlator outright. Once every sender has been dropped no more
/// events can arrive, so the timelines are drained and the sinks closed.
pub async fn run_correlator(
    mut input: EventReceiver,
    correlator: Correlator,
) -> Result<CorrelationOutcome, PipelineError> {
    info!("Correlator started");
    let mut events = 0u64;

    while let Some(event) = input.recv().await {
        correlator.add(event)?;
        events += 1;
    }

    info!(
        events = events,
        pending_jobs = correlator.pending_jobs(),
        "Input channel closed, draining timelines"
    );
    let drain = correlator.drain()?;
    let counts = correlator.close()?;

    info!("Correlator shutdown complete");
    Ok(CorrelationOutcome {
        events,
        drain,
        counts,
    })
}

/// Read one file on the blocking pool and feed its events to `output`.
///
/// Stops early, keeping what was already sent, when `cancel` fires.
pub async fn run_file_producer(
    file: SourceFile,
    output: EventSender,
    diagnostics: Diagnostics,
    cancel: CancellationToken,
) -> Result<FileStats, PipelineError> {
    tokio::task::spawn_blocking(move || read_file(&file, &output, diagnostics, &cancel)).await?
}

fn read_file(
    file: &SourceFile,
    output: &EventSender,
    diagnostics: Diagnostics,
    cancel: &CancellationToken,
) -> Result<FileStats, PipelineError> {
    process_file(
        &file.path,
        &file.worker_id,
        diagnostics,
        || cancel.is_cancelled(),
        |event| {
            output
                .blocking_send(event)
                .map_err(|_| PipelineError::ChannelSend)
        },
    )
}

/// Process every file and correlate the results into `sinks`.
///
/// At most `max_concurrent_files` files are read at once. A file that cannot
/// be read is logged and counted; the remaining files still run.
pub async fn run_pipeline(
    files: Vec<SourceFile>,
    sinks: Sinks,
    options: PipelineOptions,
    diagnostics: Diagnostics,
    cancel: CancellationToken,
) -> Result<PipelineSummary, PipelineError> {
    let (event_tx, event_rx) = create_channel(options.buffer_limit);
    let correlator_handle = tokio::spawn(run_correlator(event_rx, Correlator::new(sinks)));

    let file_count = files.len() as u64;
    info!(
        files = file_count,
        max_concurrent_files = options.max_concurrent_files,
        "Starting file producers"
    );

    let results: Vec<(SourceFile, Result<FileStats, PipelineError>)> = stream::iter(files)
        .map(|file| {
            let producer = run_file_producer(
                file.clone(),
                event_tx.clone(),
                diagnostics.clone(),
                cancel.clone(),
            );
            async move { (file, producer.await) }
        })
        .buffer_unordered(options.max_concurrent_files.max(1))
        .collect()
        .await;

    // Last sender gone: the correlator drains once the buffered events are in
    drop(event_tx);

    let mut summary = PipelineSummary {
        files: file_count,
        ..Default::default()
    };
    for (file, result) in results {
        match result {
            Ok(stats) => summary.lines += stats,
            Err(e) => {
                error!(path = %file.path.display(), error = %e, "Failed to process file");
                summary.failed_files += 1;
            }
        }
    }

    summary.correlation = correlator_handle.await??;
    summary.cancelled = cancel.is_cancelled();

    info!(
        files = summary.files,
        failed_files = summary.failed_files,
        events = summary.correlation.events,
        "Pipeline complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EndEvent, JobEvent, Provenance, StartEvent};
    use crate::record::JobStatus;
    use crate::storage::memory_sinks;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    fn provenance() -> Provenance {
        Provenance {
            file: "backgrounder-0.log".to_string(),
            line: 1,
        }
    }

    fn start_event(job_id: i64, secs: i64) -> JobEvent {
        JobEvent::Start(StartEvent {
            job_id,
            job_type: None,
            worker_id: "worker0".to_string(),
            instance_id: "0".to_string(),
            priority: None,
            timeout: None,
            args: None,
            site: None,
            start_time: Utc.timestamp_opt(secs, 0).unwrap(),
            provenance: provenance(),
        })
    }

    fn end_event(job_id: i64, secs: i64) -> JobEvent {
        JobEvent::End(EndEvent {
            job_id,
            success: true,
            notes: None,
            error_message: None,
            total_time: None,
            run_time: None,
            end_time: Utc.timestamp_opt(secs, 0).unwrap(),
            provenance: provenance(),
        })
    }

    #[tokio::test]
    async fn test_correlator_drains_when_senders_drop() {
        let (sinks, outputs) = memory_sinks();
        let (tx, rx) = create_channel(4);
        let handle = tokio::spawn(run_correlator(rx, Correlator::new(sinks)));

        tx.send(end_event(1, 20)).await.unwrap();
        tx.send(start_event(1, 10)).await.unwrap();
        tx.send(start_event(2, 30)).await.unwrap();
        drop(tx);

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.events, 3);
        assert_eq!(outcome.counts.jobs, 2);
        assert_eq!(outcome.drain.complete, 1);
        assert_eq!(outcome.drain.unknown, 1);

        let jobs = outputs.jobs.records();
        assert_eq!(jobs[0].status, JobStatus::Complete);
        assert_eq!(outputs.jobs.close_count(), 1);
    }

    const LINES: &str = "\
2018-08-08 11:16:31.950 +1000 (,,,,1,:update_vertica_keychains,-) pool-1 backgrounder: INFO com.tableausoftware.backgrounder.runner.BackgroundJobRunner - Running job of type UpdateVerticaKeychains; no timeout; priority: 0; id: null; args: []
2018-08-08 11:26:32.950 +1000 (,,,,1,:update_vertica_keychains,-) pool-1 backgrounder: INFO com.tableausoftware.backgrounder.runner.BackgroundJobRunner - Job finished: SUCCESS;name: Update Vertica Keychains; type :update_vertica_keychains; id: 1; notes: null; total time: 601 sec; run time: 0 sec
";

    #[tokio::test]
    async fn test_pipeline_reads_files_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounder-0.log");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(LINES.as_bytes())
            .unwrap();

        let files = vec![
            SourceFile {
                path,
                worker_id: "worker0".to_string(),
            },
            SourceFile {
                path: dir.path().join("missing.log"),
                worker_id: "worker0".to_string(),
            },
        ];
        let (sinks, outputs) = memory_sinks();
        let summary = run_pipeline(
            files,
            sinks,
            PipelineOptions::default(),
            Diagnostics::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.failed_files, 1);
        assert_eq!(summary.lines.events, 2);
        assert!(!summary.cancelled);

        let jobs = outputs.jobs.records();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Complete);
        assert_eq!(jobs[0].total_time, Some(601));
    }

    #[tokio::test]
    async fn test_cancelled_pipeline_still_closes_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backgrounder-0.log");
        std::fs::write(&path, LINES).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let (sinks, outputs) = memory_sinks();
        let summary = run_pipeline(
            vec![SourceFile {
                path,
                worker_id: "worker0".to_string(),
            }],
            sinks,
            PipelineOptions::default(),
            Diagnostics::new(),
            cancel,
        )
        .await
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.correlation.events, 0);
        assert_eq!(outputs.jobs.close_count(), 1);
        assert_eq!(outputs.flow_details.close_count(), 1);
    }
}
