use super::pairs::PipePairs;
use super::{Extracted, ExtractorState, LineContext};
use crate::classify::ClassifiedLine;
use crate::event::{FlowDetail, FlowFields, JobEvent};
use crate::source::timestamp::parse_flow_timestamp;
use chrono::{DateTime, Utc};
use tracing::debug;

pub const FLOW_CLASS: &str = "com.tableausoftware.flowrun.FlowRunJobReporter";

/// Marks the payload of a flow-run summary; pairs follow it.
pub const MARKER: &str = "flowRunDetails";

pub fn applies(line: &ClassifiedLine) -> bool {
    line.class == FLOW_CLASS && line.message.contains(MARKER)
}

pub fn extract(
    _state: &mut ExtractorState,
    _ctx: &LineContext<'_>,
    line: &ClassifiedLine,
    job_id: i64,
) -> Option<Extracted> {
    let (_, payload) = line.message.split_once(MARKER)?;
    let pairs = PipePairs::parse(payload);
    if pairs.is_empty() {
        return None;
    }

    let fields = FlowFields {
        flow_id: pairs.text("flowId"),
        flow_name: pairs.text("flowName"),
        flow_run_id: pairs.text("flowRunId"),
        status: pairs.text("status"),
        queued_time: timestamp(&pairs, "queuedTime"),
        started_time: timestamp(&pairs, "startedTime"),
        finished_time: timestamp(&pairs, "finishedTime").or_else(|| timestamp(&pairs, "completedTime")),
        error_type: pairs.text("errorType"),
        error_message: pairs.text("errorMessage"),
        run_mode: pairs.text("runMode"),
    };

    let warnings = pairs
        .duplicates
        .iter()
        .map(|key| format!("duplicate key '{}' in flow run payload, keeping last value", key))
        .collect();

    Some(Extracted {
        event: JobEvent::Flow(FlowDetail {
            job_id,
            timestamp: line.timestamp,
            fields,
        }),
        warnings,
    })
}

fn timestamp(pairs: &PipePairs, key: &str) -> Option<DateTime<Utc>> {
    let value = pairs.get(key)?;
    let parsed = parse_flow_timestamp(value);
    if parsed.is_none() && !value.is_empty() && value != "NA" {
        debug!(key = key, value = value, "Unparseable flow run timestamp");
    }
    parsed
}
