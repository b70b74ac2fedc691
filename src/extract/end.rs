use super::{non_null, Extracted, ExtractorState, LineContext};
use crate::classify::ClassifiedLine;
use crate::event::{EndEvent, JobEvent};
use regex::Regex;
use std::sync::LazyLock;

pub const FINISHED_PREFIX: &str = "Job finished:";
pub const FAILED_PREFIX: &str = "Error executing backgroundjob:";
const SUCCESS_PREFIX: &str = "Job finished: SUCCESS";

static FINISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^Job finished: (?P<outcome>\w+);\s*name: (?P<name>[^;]*);\s*type :?(?P<job_type>[^;]*);\s*id: (?P<id>[^;]*);\s*notes: (?P<notes>.*?);\s*total time: (?P<total>[^;]*?) sec;\s*run time: (?P<run>[^;]*?) sec\s*$",
    )
    .expect("job finished regex is valid")
});

pub fn applies(line: &ClassifiedLine) -> bool {
    line.message.starts_with(FINISHED_PREFIX) || line.message.starts_with(FAILED_PREFIX)
}

pub fn extract(
    _state: &mut ExtractorState,
    ctx: &LineContext<'_>,
    line: &ClassifiedLine,
    job_id: i64,
) -> Option<Extracted> {
    let message = line.message.as_str();
    let mut end = EndEvent {
        job_id,
        success: false,
        notes: None,
        error_message: None,
        total_time: None,
        run_time: None,
        end_time: line.timestamp,
        provenance: ctx.provenance(),
    };

    if message.starts_with(SUCCESS_PREFIX) {
        end.success = true;
        // Notes and times stay absent when the line carries fields we don't know
        if let Some(captures) = FINISHED.captures(message) {
            end.notes = non_null(&captures["notes"]);
            end.total_time = captures["total"].trim().parse().ok();
            end.run_time = captures["run"].trim().parse().ok();
        }
    } else {
        end.error_message = Some(message.to_string());
    }

    Some(Extracted::new(JobEvent::End(end)))
}
