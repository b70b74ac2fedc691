pub mod end;
pub mod flow;
pub mod pairs;
pub mod refresh;
pub mod start;
pub mod subscription;

use crate::classify::ClassifiedLine;
use crate::event::{ErrorEvent, JobEvent, Provenance};
use crate::matching::MoveToFront;
use start::{StartGrammar, START_GRAMMARS};

/// Per-line facts that do not come from the line text itself.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub file: &'a str,
    pub line: u64,
    pub worker_id: &'a str,
    pub instance_id: &'a str,
}

impl LineContext<'_> {
    pub fn provenance(&self) -> Provenance {
        Provenance {
            file: self.file.to_string(),
            line: self.line,
        }
    }
}

/// An event plus any recoverable oddities noticed while extracting it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub event: JobEvent,
    pub warnings: Vec<String>,
}

impl Extracted {
    pub fn new(event: JobEvent) -> Self {
        Self {
            event,
            warnings: Vec::new(),
        }
    }
}

/// Mutable matcher state owned by one chain (one file).
#[derive(Debug, Clone)]
pub struct ExtractorState {
    pub start_grammars: MoveToFront<&'static StartGrammar>,
}

impl Default for ExtractorState {
    fn default() -> Self {
        Self {
            start_grammars: MoveToFront::new(START_GRAMMARS.iter().collect()),
        }
    }
}

pub type ExtractFn =
    fn(&mut ExtractorState, &LineContext<'_>, &ClassifiedLine, i64) -> Option<Extracted>;

/// A `(predicate, extractor)` pair.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&ClassifiedLine) -> bool,
    pub extract: ExtractFn,
}

/// Detail rules in priority order. Only consulted for non-error lines that
/// carry a numeric job id; the first rule producing an event wins.
pub const RULES: &[Rule] = &[
    Rule {
        name: "start",
        applies: start::applies,
        extract: start::extract,
    },
    Rule {
        name: "end",
        applies: end::applies,
        extract: end::extract,
    },
    Rule {
        name: "extract_detail",
        applies: refresh::applies,
        extract: refresh::extract,
    },
    Rule {
        name: "subscription_detail",
        applies: subscription::applies,
        extract: subscription::extract,
    },
    Rule {
        name: "flow_detail",
        applies: flow::applies,
        extract: flow::extract,
    },
];

/// Turns classified lines into typed events.
#[derive(Debug, Clone, Default)]
pub struct ExtractorChain {
    state: ExtractorState,
}

impl ExtractorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&mut self, ctx: &LineContext<'_>, line: &ClassifiedLine) -> Option<Extracted> {
        // Error lines are the only events allowed without a job id
        if line.is_error() {
            return Some(Extracted::new(JobEvent::Error(error_event(ctx, line))));
        }

        let job_id = line.numeric_job_id()?;

        RULES
            .iter()
            .filter(|rule| (rule.applies)(line))
            .find_map(|rule| (rule.extract)(&mut self.state, ctx, line, job_id))
    }
}

fn error_event(ctx: &LineContext<'_>, line: &ClassifiedLine) -> ErrorEvent {
    ErrorEvent {
        job_id: line.numeric_job_id(),
        job_type: line.job_type.clone(),
        timestamp: line.timestamp,
        severity: line.severity.clone(),
        class: line.class.clone(),
        message: line.message.clone(),
        thread: line.thread.clone(),
        site: line.site.clone(),
        provenance: ctx.provenance(),
        worker_id: ctx.worker_id.to_string(),
    }
}

/// Empty text and the literal `null` both mean "not given".
pub(crate) fn non_null(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "null" {
        None
    } else {
        Some(value.to_string())
    }
}
