pub mod header;

pub use header::{HeaderGrammar, HEADER_GRAMMARS};

use crate::matching::MoveToFront;
use crate::source::timestamp::parse_header_timestamp;
use chrono::{DateTime, Utc};
use regex::Captures;

/// Result of matching one raw line against the header grammars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub timestamp: DateTime<Utc>,
    pub tz_offset: String,
    pub site: Option<String>,
    pub user: Option<String>,
    pub data_session_id: Option<String>,
    pub viz_session_id: Option<String>,
    /// Raw job id text; only the extractors decide whether it is usable.
    pub job_id: Option<String>,
    pub job_type: Option<String>,
    pub local_request_id: Option<String>,
    pub thread: String,
    pub service: Option<String>,
    pub process_id: Option<u32>,
    pub severity: String,
    pub class: String,
    pub message: String,
    /// Name of the grammar that matched
    pub grammar: &'static str,
}

impl ClassifiedLine {
    pub fn is_error(&self) -> bool {
        matches!(self.severity.as_str(), "ERROR" | "FATAL")
    }

    /// The job id parsed as an integer, if the header carried a usable one.
    pub fn numeric_job_id(&self) -> Option<i64> {
        self.job_id.as_deref()?.trim().parse().ok()
    }
}

/// Classifies raw lines by trying each header grammar in turn.
///
/// The grammar list promotes the last successful grammar to the front, so a
/// classifier should live for the duration of one file.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    grammars: MoveToFront<&'static HeaderGrammar>,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier {
    pub fn new() -> Self {
        Self {
            grammars: MoveToFront::new(HEADER_GRAMMARS.iter().collect()),
        }
    }

    /// Classify one logical line. Returns `None` when no grammar matches or the
    /// header timestamp cannot be interpreted.
    pub fn classify(&mut self, text: &str) -> Option<ClassifiedLine> {
        self.grammars
            .try_match(|grammar| grammar.regex.captures(text).and_then(|c| build_line(grammar, &c)))
    }

    /// Names of the grammars in their current try order.
    pub fn grammar_order(&self) -> Vec<&'static str> {
        self.grammars.order().iter().map(|g| g.name).collect()
    }
}

fn build_line(grammar: &HeaderGrammar, captures: &Captures) -> Option<ClassifiedLine> {
    let timestamp = parse_header_timestamp(&captures["ts"], &captures["ts_offset"]).ok()?;

    Some(ClassifiedLine {
        timestamp,
        tz_offset: captures["ts_offset"].to_string(),
        site: optional_field(captures, "site"),
        user: optional_field(captures, "user"),
        data_session_id: optional_field(captures, "data_session_id"),
        viz_session_id: optional_field(captures, "viz_session_id"),
        job_id: optional_field(captures, "job_id"),
        job_type: optional_field(captures, "job_type")
            .map(|t| t.trim_start_matches(':').to_string())
            .filter(|t| !t.is_empty()),
        local_request_id: optional_field(captures, "local_request_id"),
        thread: captures["thread"].to_string(),
        service: optional_field(captures, "service"),
        process_id: captures.name("pid").and_then(|m| m.as_str().parse().ok()),
        severity: captures["sev"].to_string(),
        class: captures["class"].to_string(),
        message: captures["message"].to_string(),
        grammar: grammar.name,
    })
}

/// Header tuple members are blank or `-` when not applicable.
fn optional_field(captures: &Captures, name: &str) -> Option<String> {
    let value = captures.name(name)?.as_str().trim();
    if value.is_empty() || value == "-" {
        None
    } else {
        Some(value.to_string())
    }
}
