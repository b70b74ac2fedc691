use super::{Extracted, ExtractorState, LineContext};
use crate::classify::ClassifiedLine;
use crate::event::{JobEvent, SubscriptionDetail, SubscriptionFields};
use regex::Regex;
use std::sync::LazyLock;

pub const SESSION_CLASS: &str = "com.tableausoftware.model.workgroup.service.VqlSessionService";

/// The subscription runner moved packages between releases.
pub const RUNNER_CLASSES: [&str; 2] = [
    "com.tableausoftware.model.workgroup.workers.SubscriptionWorker",
    "com.tableausoftware.model.workgroup.service.subscriptions.SubscriptionRunner",
];

pub const EMAIL_CLASS: &str = "com.tableausoftware.util.EmailHelper";

static SESSION_CREATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Created session id:\s*(?P<session>[^\s,]+)").expect("session regex is valid")
});

static SUBSCRIPTION_STARTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^Starting subscription\b.*?(?:with Subject|Subject:)\s*"?(?P<name>[^"]*?)"?\s*$"#)
        .expect("subscription start regex is valid")
});

static EMAIL_SENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Sending email from (?P<sender>\S+) to (?P<recipient>.+?) from server (?P<server>\S+)")
        .expect("email regex is valid")
});

pub fn applies(line: &ClassifiedLine) -> bool {
    (line.class == SESSION_CLASS && line.message.starts_with("Created session id"))
        || (RUNNER_CLASSES.contains(&line.class.as_str())
            && line.message.starts_with("Starting subscription"))
        || (line.class == EMAIL_CLASS && line.message.starts_with("Sending email from"))
}

pub fn extract(
    _state: &mut ExtractorState,
    _ctx: &LineContext<'_>,
    line: &ClassifiedLine,
    job_id: i64,
) -> Option<Extracted> {
    let message = line.message.as_str();
    let fields = if line.class == SESSION_CLASS {
        let captures = SESSION_CREATED.captures(message)?;
        SubscriptionFields {
            viz_session_id: Some(captures["session"].to_string()),
            ..Default::default()
        }
    } else if line.class == EMAIL_CLASS {
        let captures = EMAIL_SENT.captures(message)?;
        SubscriptionFields {
            sender: Some(captures["sender"].to_string()),
            recipient: Some(captures["recipient"].to_string()),
            smtp_server: Some(captures["server"].to_string()),
            ..Default::default()
        }
    } else {
        let captures = SUBSCRIPTION_STARTED.captures(message)?;
        SubscriptionFields {
            subscription_name: Some(captures["name"].to_string()).filter(|n| !n.is_empty()),
            ..Default::default()
        }
    };

    Some(Extracted::new(JobEvent::Subscription(SubscriptionDetail {
        job_id,
        timestamp: line.timestamp,
        fields,
    })))
}
