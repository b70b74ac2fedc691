//! Correlates background job log lines into job records.
//!
//! Lines are classified against the header grammars, turned into typed
//! events by the extractor chain, and assembled per job id by the
//! [`correlate::Correlator`], which writes records to a set of
//! [`storage::Sinks`].

pub mod classify;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod diagnostics;
pub mod event;
pub mod extract;
pub mod matching;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod storage;
