use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a line came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub file: String,
    pub line: u64,
}

/// Typed result of running the extractor chain over one classified line.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Error(ErrorEvent),
    Start(StartEvent),
    End(EndEvent),
    Extract(ExtractDetail),
    Subscription(SubscriptionDetail),
    Flow(FlowDetail),
}

impl JobEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::Error(e) => e.timestamp,
            JobEvent::Start(e) => e.start_time,
            JobEvent::End(e) => e.end_time,
            JobEvent::Extract(e) => e.timestamp,
            JobEvent::Subscription(e) => e.timestamp,
            JobEvent::Flow(e) => e.timestamp,
        }
    }

    /// Owning job id; error lines may have none.
    pub fn job_id(&self) -> Option<i64> {
        match self {
            JobEvent::Error(e) => e.job_id,
            JobEvent::Start(e) => Some(e.job_id),
            JobEvent::End(e) => Some(e.job_id),
            JobEvent::Extract(e) => Some(e.job_id),
            JobEvent::Subscription(e) => Some(e.job_id),
            JobEvent::Flow(e) => Some(e.job_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub job_id: Option<i64>,
    pub job_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub severity: String,
    pub class: String,
    pub message: String,
    pub thread: String,
    pub site: Option<String>,
    pub provenance: Provenance,
    pub worker_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartEvent {
    pub job_id: i64,
    pub job_type: Option<String>,
    pub worker_id: String,
    pub instance_id: String,
    pub priority: Option<i32>,
    pub timeout: Option<i64>,
    pub args: Option<String>,
    pub site: Option<String>,
    pub start_time: DateTime<Utc>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndEvent {
    pub job_id: i64,
    pub success: bool,
    pub notes: Option<String>,
    pub error_message: Option<String>,
    pub total_time: Option<i64>,
    pub run_time: Option<i64>,
    pub end_time: DateTime<Utc>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractFields {
    pub extract_id: Option<String>,
    pub extract_guid: Option<String>,
    pub extract_url: Option<String>,
    pub extract_size: Option<i64>,
    pub twb_size: Option<i64>,
    pub total_size: Option<i64>,
    pub job_notes: Option<String>,
    pub schedule_name: Option<String>,
    pub site: Option<String>,
    pub viz_session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractDetail {
    pub job_id: i64,
    pub timestamp: DateTime<Utc>,
    pub fields: ExtractFields,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubscriptionFields {
    pub subscription_name: Option<String>,
    pub recipient: Option<String>,
    pub sender: Option<String>,
    pub smtp_server: Option<String>,
    pub viz_session_id: Option<String>,
}

impl SubscriptionFields {
    /// Fold a later sighting into this one. Present values overwrite, absent
    /// values never erase.
    pub fn merge(&mut self, other: SubscriptionFields) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.subscription_name, other.subscription_name);
        take(&mut self.recipient, other.recipient);
        take(&mut self.sender, other.sender);
        take(&mut self.smtp_server, other.smtp_server);
        take(&mut self.viz_session_id, other.viz_session_id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionDetail {
    pub job_id: i64,
    pub timestamp: DateTime<Utc>,
    pub fields: SubscriptionFields,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowFields {
    pub flow_id: Option<String>,
    pub flow_name: Option<String>,
    pub flow_run_id: Option<String>,
    pub status: Option<String>,
    pub queued_time: Option<DateTime<Utc>>,
    pub started_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub run_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowDetail {
    pub job_id: i64,
    pub timestamp: DateTime<Utc>,
    pub fields: FlowFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_merge_last_write_wins() {
        let mut fields = SubscriptionFields {
            subscription_name: Some("Weekly".to_string()),
            sender: Some("old@example.com".to_string()),
            ..Default::default()
        };
        fields.merge(SubscriptionFields {
            sender: Some("new@example.com".to_string()),
            recipient: Some("ops@example.com".to_string()),
            ..Default::default()
        });

        assert_eq!(fields.subscription_name.as_deref(), Some("Weekly"));
        assert_eq!(fields.sender.as_deref(), Some("new@example.com"));
        assert_eq!(fields.recipient.as_deref(), Some("ops@example.com"));
    }
}
