use regex::Regex;
use std::sync::LazyLock;

/// One revision of the line envelope.
#[derive(Debug)]
pub struct HeaderGrammar {
    pub name: &'static str,
    pub regex: Regex,
}

const PREFIX: &str = r"^(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}) (?P<ts_offset>[+-]\d{4}) ";

const SUFFIX: &str = r" (?P<thread>\S+) (?:(?P<service>[^\s:\[]*)(?:\[(?P<pid>\d+)\])?: )?(?P<sev>[A-Z]+)\s+(?P<class>\S+) - (?P<message>(?s:.*))$";

const TUPLE_FIELDS: [&str; 4] = [
    r"(?P<site>[^,)]*)",
    r"(?P<user>[^,)]*)",
    r"(?P<data_session_id>[^,)]*)",
    r"(?P<viz_session_id>[^,)]*)",
];

fn grammar(name: &'static str, extra: &[&str]) -> HeaderGrammar {
    let mut tuple: Vec<&str> = TUPLE_FIELDS.to_vec();
    tuple.push(r"(?P<job_id>[^,)]*)");
    tuple.extend_from_slice(extra);
    let pattern = format!(r"{}\({}\){}", PREFIX, tuple.join(","), SUFFIX);
    HeaderGrammar {
        name,
        regex: Regex::new(&pattern).expect("header grammar is valid"),
    }
}

/// Envelope revisions, newest first:
///
/// * `local_request`: `(site,user,data_session,viz_session,job_id,:job_type,local_request_id)`
/// * `job_type`: `(site,user,data_session,viz_session,job_id,:job_type)`
/// * `legacy`: `(site, user, data_session, viz_session, job_id)`
pub static HEADER_GRAMMARS: LazyLock<[HeaderGrammar; 3]> = LazyLock::new(|| {
    [
        grammar(
            "local_request",
            &[r"(?P<job_type>[^,)]*)", r"(?P<local_request_id>[^,)]*)"],
        ),
        grammar("job_type", &[r"(?P<job_type>[^,)]*)"]),
        grammar("legacy", &[]),
    ]
});
