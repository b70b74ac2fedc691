use crate::event::{ErrorEvent, ExtractFields, FlowFields, StartEvent, SubscriptionFields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a job record was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Both a start and an end were correlated
    Complete,
    /// No end was seen and the same worker instance later started another job
    InvalidEnd,
    /// No end was seen and there is no evidence either way
    Unknown,
}

/// Job type families that produce an additional detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFamily {
    ExtractRefresh,
    SubscriptionNotify,
    FlowRun,
    Other,
}

const EXTRACT_REFRESH_TYPES: [&str; 4] = [
    "refreshextracts",
    "incrementextracts",
    "refreshextractsviabridge",
    "incrementextractsviabridge",
];
const SUBSCRIPTION_NOTIFY_TYPES: [&str; 2] = ["singlesubscriptionnotify", "subscriptionnotify"];
const FLOW_RUN_TYPES: [&str; 2] = ["runflow", "runflowscheduled"];

impl JobFamily {
    /// Header job types are snake_case while older start messages use
    /// CamelCase, so both spellings are accepted.
    pub fn of(job_type: Option<&str>) -> Self {
        let Some(job_type) = job_type else {
            return JobFamily::Other;
        };
        let normalized: String = job_type
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        if EXTRACT_REFRESH_TYPES.contains(&normalized.as_str()) {
            JobFamily::ExtractRefresh
        } else if SUBSCRIPTION_NOTIFY_TYPES.contains(&normalized.as_str()) {
            JobFamily::SubscriptionNotify
        } else if FLOW_RUN_TYPES.contains(&normalized.as_str()) {
            JobFamily::FlowRun
        } else {
            JobFamily::Other
        }
    }
}

/// One job execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job id, suffixed with `-requeue-N` for reused ids
    pub job_id: String,
    pub job_type: Option<String>,
    pub worker_id: String,
    pub instance_id: String,
    pub priority: Option<i32>,
    pub timeout: Option<i64>,
    pub args: Option<String>,
    pub site: Option<String>,
    pub start_time: DateTime<Utc>,
    pub start_file: String,
    pub start_line: u64,
    pub end_time: Option<DateTime<Utc>>,
    pub end_file: Option<String>,
    pub end_line: Option<u64>,
    pub success: Option<bool>,
    pub notes: Option<String>,
    pub error_message: Option<String>,
    pub total_time: Option<i64>,
    pub run_time: Option<i64>,
    pub status: JobStatus,
}

impl JobRecord {
    /// Start fields only; end fields are merged by the caller when present.
    pub fn from_start(job_id: String, start: StartEvent, status: JobStatus) -> Self {
        Self {
            job_id,
            job_type: start.job_type,
            worker_id: start.worker_id,
            instance_id: start.instance_id,
            priority: start.priority,
            timeout: start.timeout,
            args: start.args,
            site: start.site,
            start_time: start.start_time,
            start_file: start.provenance.file,
            start_line: start.provenance.line,
            end_time: None,
            end_file: None,
            end_line: None,
            success: None,
            notes: None,
            error_message: None,
            total_time: None,
            run_time: None,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobErrorRecord {
    pub job_id: Option<i64>,
    pub job_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub severity: String,
    pub class: String,
    pub message: String,
    pub thread: String,
    pub site: Option<String>,
    pub worker_id: String,
    pub file: String,
    pub line: u64,
}

impl From<ErrorEvent> for JobErrorRecord {
    fn from(event: ErrorEvent) -> Self {
        Self {
            job_id: event.job_id,
            job_type: event.job_type,
            timestamp: event.timestamp,
            severity: event.severity,
            class: event.class,
            message: event.message,
            thread: event.thread,
            site: event.site,
            worker_id: event.worker_id,
            file: event.provenance.file,
            line: event.provenance.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractJobDetail {
    pub job_id: String,
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
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

impl ExtractJobDetail {
    pub fn new(job_id: String, args: Option<&str>, fields: ExtractFields) -> Self {
        let (resource_type, resource_name) = resource_from_args(args);
        Self {
            job_id,
            resource_type,
            resource_name,
            extract_id: fields.extract_id,
            extract_guid: fields.extract_guid,
            extract_url: fields.extract_url,
            extract_size: fields.extract_size,
            twb_size: fields.twb_size,
            total_size: fields.total_size,
            job_notes: fields.job_notes,
            schedule_name: fields.schedule_name,
            site: fields.site,
            viz_session_id: fields.viz_session_id,
        }
    }
}

/// Resource type and name are the first and third comma-separated tokens of
/// the start arguments, e.g. `[Datasource, 12, Superstore]`. Nothing checks
/// that the arguments actually have that shape; missing tokens stay absent.
pub fn resource_from_args(args: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(args) = args else {
        return (None, None);
    };
    let inner = args.trim().trim_start_matches('[').trim_end_matches(']');
    let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
    let token = |i: usize| {
        tokens
            .get(i)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
    };
    (token(0), token(2))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionJobDetail {
    pub job_id: String,
    pub subscription_name: Option<String>,
    pub recipient: Option<String>,
    pub sender: Option<String>,
    pub smtp_server: Option<String>,
    pub viz_session_id: Option<String>,
}

impl SubscriptionJobDetail {
    pub fn new(job_id: String, fields: SubscriptionFields) -> Self {
        Self {
            job_id,
            subscription_name: fields.subscription_name,
            recipient: fields.recipient,
            sender: fields.sender,
            smtp_server: fields.smtp_server,
            viz_session_id: fields.viz_session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowJobDetail {
    pub job_id: String,
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

impl FlowJobDetail {
    pub fn new(job_id: String, fields: FlowFields) -> Self {
        Self {
            job_id,
            flow_id: fields.flow_id,
            flow_name: fields.flow_name,
            flow_run_id: fields.flow_run_id,
            status: fields.status,
            queued_time: fields.queued_time,
            started_time: fields.started_time,
            finished_time: fields.finished_time,
            error_type: fields.error_type,
            error_message: fields.error_message,
            run_mode: fields.run_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_family_accepts_both_spellings() {
        assert_eq!(JobFamily::of(Some("refresh_extracts")), JobFamily::ExtractRefresh);
        assert_eq!(JobFamily::of(Some("RefreshExtracts")), JobFamily::ExtractRefresh);
        assert_eq!(
            JobFamily::of(Some("single_subscription_notify")),
            JobFamily::SubscriptionNotify
        );
        assert_eq!(JobFamily::of(Some("run_flow")), JobFamily::FlowRun);
        assert_eq!(JobFamily::of(Some("update_vertica_keychains")), JobFamily::Other);
        assert_eq!(JobFamily::of(None), JobFamily::Other);
    }

    #[test]
    fn test_resource_from_args() {
        assert_eq!(
            resource_from_args(Some("[Datasource, 12, Superstore, null]")),
            (Some("Datasource".to_string()), Some("Superstore".to_string()))
        );
        assert_eq!(
            resource_from_args(Some("Workbook,3,Sales")),
            (Some("Workbook".to_string()), Some("Sales".to_string()))
        );
    }

    #[test]
    fn test_resource_from_short_args() {
        assert_eq!(
            resource_from_args(Some("[Datasource]")),
            (Some("Datasource".to_string()), None)
        );
        assert_eq!(resource_from_args(None), (None, None));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::InvalidEnd).unwrap(),
            "\"invalid_end\""
        );
    }
}
