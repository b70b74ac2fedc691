use super::{non_null, Extracted, ExtractorState, LineContext};
use crate::classify::ClassifiedLine;
use crate::event::{JobEvent, StartEvent};
use regex::Regex;
use std::sync::LazyLock;

/// One historical shape of the "job started" message.
#[derive(Debug)]
pub struct StartGrammar {
    pub name: &'static str,
    pub regex: Regex,
}

/// Both shapes expose `job_type`, `priority`, `timeout` and `args` groups.
pub static START_GRAMMARS: LazyLock<[StartGrammar; 2]> = LazyLock::new(|| {
    [
        StartGrammar {
            name: "sentence",
            regex: Regex::new(
                r"(?s)^Running job of type :?(?P<job_type>[^;]+); (?:no timeout|timeout: (?P<timeout>[^;]*)); priority: (?P<priority>[^;]*); id: (?P<id>[^;]*); args: (?P<args>.*)$",
            )
            .expect("sentence start grammar is valid"),
        },
        StartGrammar {
            name: "pairs",
            regex: Regex::new(
                r"(?s)^Running job \| type=:?(?P<job_type>[^|\s]+) \| priority=(?P<priority>[^|\s]*) \| timeout=(?P<timeout>[^|\s]*) \| id=(?P<id>[^|\s]*) \| args=(?P<args>.*)$",
            )
            .expect("pairs start grammar is valid"),
        },
    ]
});

pub fn applies(line: &ClassifiedLine) -> bool {
    line.message.starts_with("Running job")
}

pub fn extract(
    state: &mut ExtractorState,
    ctx: &LineContext<'_>,
    line: &ClassifiedLine,
    job_id: i64,
) -> Option<Extracted> {
    let message = line.message.as_str();
    let captures = state
        .start_grammars
        .try_match(|grammar| grammar.regex.captures(message))?;

    let job_type = line
        .job_type
        .clone()
        .or_else(|| captures.name("job_type").map(|m| m.as_str().trim().to_string()));

    Some(Extracted::new(JobEvent::Start(StartEvent {
        job_id,
        job_type,
        worker_id: ctx.worker_id.to_string(),
        instance_id: ctx.instance_id.to_string(),
        priority: captures
            .name("priority")
            .and_then(|m| m.as_str().trim().parse().ok()),
        timeout: captures
            .name("timeout")
            .and_then(|m| m.as_str().trim().parse().ok()),
        args: captures.name("args").and_then(|m| normalize_args(m.as_str())),
        site: line.site.clone(),
        start_time: line.timestamp,
        provenance: ctx.provenance(),
    })))
}

/// `[]` and `null` mean the job had no arguments.
fn normalize_args(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw == "[]" {
        return None;
    }
    non_null(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_args() {
        assert_eq!(normalize_args("[]"), None);
        assert_eq!(normalize_args("null"), None);
        assert_eq!(normalize_args(" "), None);
        assert_eq!(
            normalize_args("[Datasource, 1, Superstore]"),
            Some("[Datasource, 1, Superstore]".to_string())
        );
    }

    #[test]
    fn test_sentence_grammar_groups() {
        let captures = START_GRAMMARS[0]
            .regex
            .captures("Running job of type RefreshExtracts; timeout: 9000; priority: 10; id: 42; args: [Workbook, 7, Sales]")
            .unwrap();
        assert_eq!(&captures["job_type"], "RefreshExtracts");
        assert_eq!(&captures["timeout"], "9000");
        assert_eq!(&captures["priority"], "10");
        assert_eq!(&captures["args"], "[Workbook, 7, Sales]");
    }

    #[test]
    fn test_pairs_grammar_groups() {
        let captures = START_GRAMMARS[1]
            .regex
            .captures("Running job | type=:refresh_extracts | priority=0 | timeout=none | id=42 | args=null")
            .unwrap();
        assert_eq!(&captures["job_type"], "refresh_extracts");
        assert_eq!(&captures["timeout"], "none");
        assert_eq!(&captures["args"], "null");
    }
}
