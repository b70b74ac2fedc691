pub mod channel;
pub mod runner;

pub use crate::source::SourceFile;
pub use channel::{create_channel, EventReceiver, EventSender, Receiver, Sender};
pub use runner::{
    run_correlator, run_file_producer, run_pipeline, CorrelationOutcome, PipelineError,
    PipelineOptions, PipelineSummary,
};
