use crate::event::JobEvent;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Events for one job id in chronological order.
///
/// Entries are keyed by `(timestamp, arrival sequence)`, so events that share
/// a timestamp keep their arrival order and the recorded time is never
/// altered.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    entries: BTreeMap<(DateTime<Utc>, u64), JobEvent>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: JobEvent) {
        let key = (event.timestamp(), self.next_seq);
        self.next_seq += 1;
        self.entries.insert(key, event);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }


    pub fn iter(&self) -> impl Iterator<Item = &JobEvent> {
        self.entries.values()
    }

    pub fn into_events(self) -> impl Iterator<Item = JobEvent> {
        self.entries.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EndEvent, Provenance};
    use chrono::TimeZone;

    fn end(job_id: i64, secs: i64, line: u64) -> JobEvent {
        JobEvent::End(EndEvent {
            job_id,
            success: true,
            notes: None,
            error_message: None,
            total_time: None,
            run_time: None,
            end_time: Utc.timestamp_opt(secs, 0).unwrap(),
            provenance: Provenance {
                file: "f".to_string(),
                line,
            },
        })
    }

    fn lines(timeline: &Timeline) -> Vec<u64> {
        timeline
            .iter()
            .map(|e| match e {
                JobEvent::End(end) => end.provenance.line,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_out_of_order_arrival_is_sorted() {
        let mut timeline = Timeline::new();
        timeline.insert(end(1, 30, 3));
        timeline.insert(end(1, 10, 1));
        timeline.insert(end(1, 20, 2));
        assert_eq!(lines(&timeline), vec![1, 2, 3]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order_and_time() {
        let mut timeline = Timeline::new();
        timeline.insert(end(1, 10, 7));
        timeline.insert(end(1, 10, 5));
        timeline.insert(end(1, 10, 6));

        assert_eq!(timeline.len(), 3);
        assert_eq!(lines(&timeline), vec![7, 5, 6]);
        assert!(timeline
            .iter()
            .all(|e| e.timestamp() == Utc.timestamp_opt(10, 0).unwrap()));
    }
}
