use crate::record::{
    ExtractJobDetail, FlowJobDetail, JobErrorRecord, JobRecord, SubscriptionJobDetail,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("io error writing '{stream}': {source}")]
    Io {
        stream: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record for '{stream}': {source}")]
    Serialize {
        stream: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Destination for one stream of records.
pub trait RecordSink<T>: Send {
    fn append(&mut self, record: T) -> Result<(), SinkError>;

    /// Flush and release the destination, returning how many records were
    /// written over the sink's lifetime.
    fn close_and_report_count(self: Box<Self>) -> Result<u64, SinkError>;
}

/// Records written per output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounts {
    pub jobs: u64,
    pub job_errors: u64,
    pub extract_details: u64,
    pub subscription_details: u64,
    pub flow_details: u64,
}

/// The full set of output streams produced by the correlator.
pub struct Sinks {
    pub jobs: Box<dyn RecordSink<JobRecord>>,
    pub job_errors: Box<dyn RecordSink<JobErrorRecord>>,
    pub extract_details: Box<dyn RecordSink<ExtractJobDetail>>,
    pub subscription_details: Box<dyn RecordSink<SubscriptionJobDetail>>,
    pub flow_details: Box<dyn RecordSink<FlowJobDetail>>,
}

impl Sinks {
    /// Close every sink exactly once. All sinks are closed even when an
    /// earlier one fails; the first failure is returned.
    pub fn close_all(self) -> Result<WriteCounts, SinkError> {
        let jobs = self.jobs.close_and_report_count();
        let job_errors = self.job_errors.close_and_report_count();
        let extract_details = self.extract_details.close_and_report_count();
        let subscription_details = self.subscription_details.close_and_report_count();
        let flow_details = self.flow_details.close_and_report_count();

        Ok(WriteCounts {
            jobs: jobs?,
            job_errors: job_errors?,
            extract_details: extract_details?,
            subscription_details: subscription_details?,
            flow_details: flow_details?,
        })
    }
}
