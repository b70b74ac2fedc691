use super::traits::{RecordSink, SinkError, Sinks};
use crate::record::{
    ExtractJobDetail, FlowJobDetail, JobErrorRecord, JobRecord, SubscriptionJobDetail,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects records in memory. The handle returned by [`MemorySink::handle`]
/// stays readable after the sink itself has been closed.
pub struct MemorySink<T> {
    records: Arc<Mutex<Vec<T>>>,
    closes: Arc<Mutex<u32>>,
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(0)),
        }
    }
}

impl<T> MemorySink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemoryHandle<T> {
        MemoryHandle {
            records: self.records.clone(),
            closes: self.closes.clone(),
        }
    }
}

impl<T: Send> RecordSink<T> for MemorySink<T> {
    fn append(&mut self, record: T) -> Result<(), SinkError> {
        self.records.lock().push(record);
        Ok(())
    }

    fn close_and_report_count(self: Box<Self>) -> Result<u64, SinkError> {
        *self.closes.lock() += 1;
        Ok(self.records.lock().len() as u64)
    }
}

pub struct MemoryHandle<T> {
    records: Arc<Mutex<Vec<T>>>,
    closes: Arc<Mutex<u32>>,
}

impl<T: Clone> MemoryHandle<T> {
    pub fn records(&self) -> Vec<T> {
        self.records.lock().clone()
    }

    /// Number of times the sink has been closed.
    pub fn close_count(&self) -> u32 {
        *self.closes.lock()
    }
}

/// Readable views onto an in-memory [`Sinks`] set.
pub struct MemoryOutputs {
    pub jobs: MemoryHandle<JobRecord>,
    pub job_errors: MemoryHandle<JobErrorRecord>,
    pub extract_details: MemoryHandle<ExtractJobDetail>,
    pub subscription_details: MemoryHandle<SubscriptionJobDetail>,
    pub flow_details: MemoryHandle<FlowJobDetail>,
}

pub fn memory_sinks() -> (Sinks, MemoryOutputs) {
    let jobs = MemorySink::new();
    let job_errors = MemorySink::new();
    let extract_details = MemorySink::new();
    let subscription_details = MemorySink::new();
    let flow_details = MemorySink::new();

    let outputs = MemoryOutputs {
        jobs: jobs.handle(),
        job_errors: job_errors.handle(),
        extract_details: extract_details.handle(),
        subscription_details: subscription_details.handle(),
        flow_details: flow_details.handle(),
    };

    let sinks = Sinks {
        jobs: Box::new(jobs),
        job_errors: Box::new(job_errors),
        extract_details: Box::new(extract_details),
        subscription_details: Box::new(subscription_details),
        flow_details: Box::new(flow_details),
    };

    (sinks, outputs)
}
