pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# JOBTRAIL CONFIGURATION
# =============================================================================
# Correlates background job start, end and detail lines from worker logs into
# job records. Each run reads every configured source once and writes one
# JSON-lines file per record stream.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/jobtrail/config.yml
#   3. /etc/jobtrail/config.yml
#
# Values may reference environment variables as $env{NAME}; paths may start
# with ~.

# =============================================================================
# SOURCES
# =============================================================================
# Each source is a log file, or a directory of log files, written by one
# worker. The worker id defaults to the source id. The worker instance id is
# taken from each file name: backgrounder_node1-2.log becomes node1-2.

sources:
  worker0:
    path: $env{HOME}/logs/worker0
    # Only used when path is a directory
    file_pattern: '^backgrounder.*\.log'

  worker1:
    path: $env{HOME}/logs/worker1/backgrounder-0.log
    worker: worker1

# =============================================================================
# OUTPUT
# =============================================================================
# Files written to the directory:
#   jobs.jsonl                      one record per job execution
#   job_errors.jsonl                ERROR and FATAL lines
#   extract_job_details.jsonl       extract refresh jobs
#   subscription_job_details.jsonl  subscription notification jobs
#   flow_job_details.jsonl          flow run jobs

output:
  directory: $env{HOME}/jobtrail-output

# =============================================================================
# PIPELINE
# =============================================================================

pipeline:
  # Events buffered between file readers and the correlator
  buffer_limit: 10000
  # Files read concurrently
  max_concurrent_files: 4
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Config;

    #[test]
    fn test_starter_config_parses() {
        let config: Config = serde_yaml::from_str(&generate_starter_config()).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources["worker1"].worker.as_deref(), Some("worker1"));
        assert_eq!(config.pipeline.max_concurrent_files, 4);
    }
}
