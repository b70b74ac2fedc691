pub mod timeline;
pub mod watermark;

pub use timeline::Timeline;
pub use watermark::{WatermarkTable, WorkerInstance};

use crate::event::{
    EndEvent, ErrorEvent, ExtractDetail, ExtractFields, FlowDetail, FlowFields, JobEvent,
    StartEvent, SubscriptionDetail, SubscriptionFields,
};
use crate::record::{
    ExtractJobDetail, FlowJobDetail, JobErrorRecord, JobFamily, JobRecord, JobStatus,
    SubscriptionJobDetail,
};
use crate::storage::{SinkError, Sinks, WriteCounts};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Outcome of a drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    pub job_ids: u64,
    pub complete: u64,
    pub invalid_end: u64,
    pub unknown: u64,
    pub requeues: u64,
    /// Timeline entries whose start was never observed
    pub orphaned_events: u64,
}

/// Assembles job records from start, end and detail events.
///
/// Producers may call the `add_*` methods from many threads. The timeline map
/// and the watermark table each sit behind their own lock, held only for the
/// map update. [`Correlator::drain`] must only run once every producer has
/// finished.
pub struct Correlator {
    timelines: Mutex<HashMap<i64, Timeline>>,
    watermarks: Mutex<WatermarkTable>,
    sinks: Mutex<Sinks>,
}

/// In-progress record for one execution of a job id during drain.
#[derive(Default)]
struct ActiveJob {
    requeue: u64,
    start: Option<StartEvent>,
    end: Option<EndEvent>,
    extract: Option<ExtractFields>,
    subscription: Option<SubscriptionFields>,
    flow: Option<FlowFields>,
}

impl ActiveJob {
    fn new(requeue: u64) -> Self {
        Self {
            requeue,
            ..Default::default()
        }
    }

    fn job_id(&self, start: &StartEvent) -> String {
        if self.requeue == 0 {
            start.job_id.to_string()
        } else {
            format!("{}-requeue-{}", start.job_id, self.requeue)
        }
    }
}

impl Correlator {
    pub fn new(sinks: Sinks) -> Self {
        Self {
            timelines: Mutex::new(HashMap::new()),
            watermarks: Mutex::new(WatermarkTable::new()),
            sinks: Mutex::new(sinks),
        }
    }

    /// Route an event to the matching `add_*` operation.
    pub fn add(&self, event: JobEvent) -> Result<(), SinkError> {
        match event {
            JobEvent::Error(error) => return self.add_error(error),
            JobEvent::Start(start) => self.add_start(start),
            JobEvent::End(end) => self.add_end(end),
            JobEvent::Extract(detail) => self.add_extract_detail(detail),
            JobEvent::Subscription(detail) => self.add_subscription_detail(detail),
            JobEvent::Flow(detail) => self.add_flow_detail(detail),
        }
        Ok(())
    }

    pub fn add_start(&self, start: StartEvent) {
        let (worker_id, instance_id, started) = (
            start.worker_id.clone(),
            start.instance_id.clone(),
            start.start_time,
        );
        self.insert(start.job_id, JobEvent::Start(start));
        self.watermarks
            .lock()
            .observe(&worker_id, &instance_id, started);
    }

    pub fn add_end(&self, end: EndEvent) {
        self.insert(end.job_id, JobEvent::End(end));
    }

    pub fn add_extract_detail(&self, detail: ExtractDetail) {
        self.insert(detail.job_id, JobEvent::Extract(detail));
    }

    /// Each sighting is kept on the timeline; sightings belonging to the same
    /// execution are merged when the record is assembled.
    pub fn add_subscription_detail(&self, detail: SubscriptionDetail) {
        self.insert(detail.job_id, JobEvent::Subscription(detail));
    }

    pub fn add_flow_detail(&self, detail: FlowDetail) {
        self.insert(detail.job_id, JobEvent::Flow(detail));
    }

    /// Errors never join a job record; they go straight to the error stream.
    pub fn add_error(&self, error: ErrorEvent) -> Result<(), SinkError> {
        self.sinks
            .lock()
            .job_errors
            .append(JobErrorRecord::from(error))
    }

    fn insert(&self, job_id: i64, event: JobEvent) {
        self.timelines
            .lock()
            .entry(job_id)
            .or_default()
            .insert(event);
    }

    /// Number of job ids with pending timelines.
    pub fn pending_jobs(&self) -> usize {
        self.timelines.lock().len()
    }

    /// Finalize every accumulated timeline, writing job and detail records.
    ///
    /// Timelines are removed as they are finalized, so a second call only
    /// sees events added after the first.
    pub fn drain(&self) -> Result<DrainStats, SinkError> {
        let mut timelines = self.timelines.lock();
        let watermarks = self.watermarks.lock().clone();
        let mut sinks = self.sinks.lock();
        let mut stats = DrainStats::default();

        let mut job_ids: Vec<i64> = timelines.keys().copied().collect();
        job_ids.sort_unstable();

        for job_id in job_ids {
            let Some(timeline) = timelines.remove(&job_id) else {
                continue;
            };
            stats.job_ids += 1;
            trace!(job_id, events = timeline.len(), "Draining timeline");
            drain_timeline(timeline, &watermarks, &mut sinks, &mut stats)?;
        }

        info!(
            job_ids = stats.job_ids,
            instances = watermarks.len(),
            complete = stats.complete,
            invalid_end = stats.invalid_end,
            unknown = stats.unknown,
            requeues = stats.requeues,
            orphaned_events = stats.orphaned_events,
            "Drained job timelines"
        );
        Ok(stats)
    }

    /// Close all output streams and report how many records each received.
    pub fn close(self) -> Result<WriteCounts, SinkError> {
        self.sinks.into_inner().close_all()
    }

    /// Drain then close.
    pub fn finish(self) -> Result<(DrainStats, WriteCounts), SinkError> {
        let stats = self.drain()?;
        let counts = self.close()?;
        Ok((stats, counts))
    }
}

fn drain_timeline(
    timeline: Timeline,
    watermarks: &WatermarkTable,
    sinks: &mut Sinks,
    stats: &mut DrainStats,
) -> Result<(), SinkError> {
    let mut active = ActiveJob::new(0);

    for event in timeline.into_events() {
        match event {
            JobEvent::Start(start) => {
                if active.start.is_some() {
                    let requeue = active.requeue + 1;
                    debug!(job_id = start.job_id, requeue = requeue, "Job id reused");
                    let finished = std::mem::replace(&mut active, ActiveJob::new(requeue));
                    flush(finished, watermarks, sinks, stats)?;
                    stats.requeues += 1;
                }
                active.start = Some(start);
            }
            // Details whose start was never seen (e.g. the start is in a
            // file that was not supplied) cannot be attributed
            _ if active.start.is_none() => {
                stats.orphaned_events += 1;
            }
            JobEvent::End(end) => active.end = Some(end),
            JobEvent::Extract(detail) => active.extract = Some(detail.fields),
            JobEvent::Subscription(detail) => match active.subscription.as_mut() {
                Some(existing) => existing.merge(detail.fields),
                None => active.subscription = Some(detail.fields),
            },
            JobEvent::Flow(detail) => active.flow = Some(detail.fields),
            JobEvent::Error(_) => {}
        }
    }

    if active.start.is_some() {
        flush(active, watermarks, sinks, stats)?;
    }
    Ok(())
}

/// Finalize one execution into a job record plus any family detail record.
fn flush(
    active: ActiveJob,
    watermarks: &WatermarkTable,
    sinks: &mut Sinks,
    stats: &mut DrainStats,
) -> Result<(), SinkError> {
    let Some(start) = active.start.as_ref() else {
        return Ok(());
    };
    let job_id = active.job_id(start);
    let family = JobFamily::of(start.job_type.as_deref());
    let args = start.args.clone();

    let status = if active.end.is_some() {
        JobStatus::Complete
    } else if watermarks.superseded(&start.worker_id, &start.instance_id, start.start_time) {
        JobStatus::InvalidEnd
    } else {
        JobStatus::Unknown
    };
    match status {
        JobStatus::Complete => stats.complete += 1,
        JobStatus::InvalidEnd => stats.invalid_end += 1,
        JobStatus::Unknown => stats.unknown += 1,
    }

    let ActiveJob {
        start,
        end,
        extract,
        subscription,
        flow,
        ..
    } = active;
    let Some(start) = start else {
        return Ok(());
    };

    let mut record = JobRecord::from_start(job_id.clone(), start, status);
    if let Some(end) = end {
        record.end_time = Some(end.end_time);
        record.end_file = Some(end.provenance.file);
        record.end_line = Some(end.provenance.line);
        record.success = Some(end.success);
        record.notes = end.notes;
        record.error_message = end.error_message;
        record.total_time = end.total_time;
        record.run_time = end.run_time;
    }
    sinks.jobs.append(record)?;

    match family {
        JobFamily::ExtractRefresh => {
            let fields = extract.unwrap_or_default();
            sinks
                .extract_details
                .append(ExtractJobDetail::new(job_id, args.as_deref(), fields))?;
        }
        JobFamily::SubscriptionNotify => {
            if let Some(fields) = subscription {
                sinks
                    .subscription_details
                    .append(SubscriptionJobDetail::new(job_id, fields))?;
            }
        }
        JobFamily::FlowRun => {
            if let Some(fields) = flow {
                sinks.flow_details.append(FlowJobDetail::new(job_id, fields))?;
            }
        }
        JobFamily::Other => {}
    }

    Ok(())
}
