pub mod jsonl;
pub mod memory;
pub mod traits;

pub use jsonl::{open_directory, JsonLinesSink};
pub use memory::{memory_sinks, MemoryHandle, MemoryOutputs, MemorySink};
pub use traits::{RecordSink, SinkError, Sinks, WriteCounts};
