use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A specific worker process instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerInstance {
    pub worker_id: String,
    pub instance_id: String,
}

impl WorkerInstance {
    pub fn new(worker_id: &str, instance_id: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            instance_id: instance_id.to_string(),
        }
    }
}

/// Latest job start time seen per worker instance.
#[derive(Debug, Default, Clone)]
pub struct WatermarkTable {
    latest: HashMap<WorkerInstance, DateTime<Utc>>,
}

impl WatermarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a start; the watermark only ever moves forward.
    pub fn observe(&mut self, worker_id: &str, instance_id: &str, started: DateTime<Utc>) {
        self.latest
            .entry(WorkerInstance::new(worker_id, instance_id))
            .and_modify(|latest| {
                if started > *latest {
                    *latest = started;
                }
            })
            .or_insert(started);
    }

    pub fn latest(&self, worker_id: &str, instance_id: &str) -> Option<DateTime<Utc>> {
        self.latest
            .get(&WorkerInstance::new(worker_id, instance_id))
            .copied()
    }

    /// Whether the instance went on to start something after `started`.
    pub fn superseded(&self, worker_id: &str, instance_id: &str, started: DateTime<Utc>) -> bool {
        self.latest(worker_id, instance_id)
            .is_some_and(|latest| latest > started)
    }

    pub(crate) fn len(&self) -> usize {
        self.latest.len()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_watermark_only_advances() {
        let mut table = WatermarkTable::new();
        table.observe("w", "0", at(20));
        table.observe("w", "0", at(10));
        assert_eq!(table.latest("w", "0"), Some(at(20)));
    }

    #[test]
    fn test_superseded_is_per_instance() {
        let mut table = WatermarkTable::new();
        table.observe("w", "0", at(10));
        table.observe("w", "1", at(50));

        assert!(!table.superseded("w", "0", at(10)));
        assert!(table.superseded("w", "1", at(10)));
        assert!(!table.superseded("other", "0", at(0)));
        assert_eq!(table.len(), 2);
    }
}
