use super::pairs::PipePairs;
use super::{Extracted, ExtractorState, LineContext};
use crate::classify::ClassifiedLine;
use crate::event::{ExtractDetail, ExtractFields, JobEvent};
use regex::Regex;
use std::sync::LazyLock;

/// Emits a single sentence describing the stored extract.
pub const LEGACY_CLASS: &str = "com.tableausoftware.model.workgroup.workers.RefreshExtractsWorker";

/// Emits pipe-delimited timing/size pairs.
pub const PAIRS_CLASS: &str = "com.tableausoftware.backgrounder.extracts.ExtractRefreshReporter";

static LEGACY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Storing to SOS: (?P<extract_url>\S+?)/extract reducedDataId:(?P<extract_guid>\S+) size:(?P<extract_size>\S+) \(extract\) \+ (?P<twb_size>\S+) \(twb\) = (?P<total_size>\S+) \(guid=\{(?P<extract_id>[^}]+)\}\)",
    )
    .expect("legacy extract regex is valid")
});

static BRACED_GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(?P<guid>[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12})\}")
        .expect("braced guid regex is valid")
});

pub fn applies(line: &ClassifiedLine) -> bool {
    line.class == LEGACY_CLASS || line.class == PAIRS_CLASS
}

pub fn extract(
    _state: &mut ExtractorState,
    _ctx: &LineContext<'_>,
    line: &ClassifiedLine,
    job_id: i64,
) -> Option<Extracted> {
    let fields = if line.class == LEGACY_CLASS {
        legacy_fields(line)?
    } else {
        pairs_fields(line)?
    };

    Some(Extracted::new(JobEvent::Extract(ExtractDetail {
        job_id,
        timestamp: line.timestamp,
        fields,
    })))
}

fn legacy_fields(line: &ClassifiedLine) -> Option<ExtractFields> {
    let captures = LEGACY.captures(&line.message)?;
    let number = |name: &str| captures.name(name).and_then(|m| m.as_str().parse().ok());

    Some(ExtractFields {
        extract_id: Some(captures["extract_id"].to_string()),
        extract_guid: Some(captures["extract_guid"].to_string()),
        extract_url: Some(captures["extract_url"].to_string()),
        extract_size: number("extract_size"),
        twb_size: number("twb_size"),
        total_size: number("total_size"),
        job_notes: None,
        schedule_name: None,
        site: line.site.clone(),
        viz_session_id: line.viz_session_id.clone(),
    })
}

fn pairs_fields(line: &ClassifiedLine) -> Option<ExtractFields> {
    let pairs = PipePairs::parse(&line.message);
    if pairs.is_empty() {
        return None;
    }

    let job_notes = pairs.text("jobNotes");
    let extract_id = job_notes
        .as_deref()
        .and_then(|notes| BRACED_GUID.captures(notes))
        .map(|c| c["guid"].to_string());

    Some(ExtractFields {
        extract_id,
        extract_guid: None,
        extract_url: pairs.text("extractUrl"),
        extract_size: pairs.integer("extractsSizeBytes"),
        twb_size: pairs.integer("twbSizeBytes"),
        total_size: None,
        job_notes,
        schedule_name: pairs.text("scheduleName"),
        site: pairs.text("siteName").or_else(|| line.site.clone()),
        viz_session_id: pairs.text("sessionId").or_else(|| line.viz_session_id.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_sentence() {
        let captures = LEGACY
            .captures("Storing to SOS: Superstore/extract reducedDataId:7c1e size:2048 (extract) + 512 (twb) = 2560 (guid={0A1B2C3D-0000-1111-2222-333344445555})")
            .unwrap();
        assert_eq!(&captures["extract_url"], "Superstore");
        assert_eq!(&captures["extract_size"], "2048");
        assert_eq!(&captures["total_size"], "2560");
        assert_eq!(&captures["extract_id"], "0A1B2C3D-0000-1111-2222-333344445555");
    }

    #[test]
    fn test_guid_recovered_from_job_notes() {
        let notes = "Finished refresh of extracts (new extract id:{E1A5C0DE-1234-5678-9ABC-DEF012345678}) for Workbook 'Sales'";
        let captures = BRACED_GUID.captures(notes).unwrap();
        assert_eq!(&captures["guid"], "E1A5C0DE-1234-5678-9ABC-DEF012345678");
    }
}
