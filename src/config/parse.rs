use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, ENV_VAR};
use regex::Regex;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse, expand and validate a YAML config document.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = ENV_VAR
        .captures_iter(yaml_string)
        .map(|cap| cap[1].to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=/path/to/logs\n\
             2. Replace $env{{{0}}} in the config file with an actual path",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export LOG_ROOT=/var/log/tableau)\n\
             2. Replace the variables in the config file with actual paths",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

/// Expands tilde (~) in all PathBuf fields in the config.
fn expand_paths(config: &mut Config) {
    for source in config.sources.values_mut() {
        source.path = expand_tilde(&source.path);
    }
    config.output.directory = expand_tilde(&config.output.directory);
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.sources.is_empty() {
        errors.push("config must define at least one entry under 'sources'".to_string());
    }

    let mut source_ids: Vec<&String> = config.sources.keys().collect();
    source_ids.sort();
    for source_id in source_ids {
        validate_source(source_id, &config.sources[source_id], &mut errors);
    }

    if config.output.directory.as_os_str().is_empty() {
        errors.push("output.directory cannot be empty".to_string());
    }

    if config.pipeline.buffer_limit == 0 {
        errors.push("pipeline.buffer_limit must be greater than zero".to_string());
    }
    if config.pipeline.max_concurrent_files == 0 {
        errors.push("pipeline.max_concurrent_files must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_source(source_id: &str, source: &SourceConfig, errors: &mut Vec<String>) {
    let prefix = format!("source '{}'", source_id);

    if source.path.as_os_str().is_empty() {
        errors.push(format!("{}: path cannot be empty", prefix));
    }

    if let Some(worker) = &source.worker {
        if worker.trim().is_empty() {
            errors.push(format!("{}: worker cannot be empty when set", prefix));
        }
    }

    if let Some(pattern) = &source.file_pattern {
        if let Err(e) = Regex::new(pattern) {
            errors.push(format!(
                "{}: invalid file_pattern regex: {} (error: {})",
                prefix, pattern, e
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults_apply() {
        let config = parse_config(
            r#"
sources:
  primary:
    path: /var/log/tableau/backgrounder
output:
  directory: /tmp/jobtrail
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.buffer_limit, 10000);
        assert_eq!(config.pipeline.max_concurrent_files, 4);
        assert_eq!(config.sources["primary"].worker_id("primary"), "primary");
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let err = parse_config(
            r#"
sources:
  primary:
    path: /logs
    worker: "  "
    file_pattern: "backgrounder-(\\d+"
output:
  directory: /tmp/out
pipeline:
  buffer_limit: 0
"#,
        )
        .unwrap_err();

        match err {
            ConfigError::ValidationList(errors) => {
                assert_eq!(errors.len(), 3, "{:?}", errors);
                assert!(errors[0].contains("worker cannot be empty"));
                assert!(errors[1].contains("invalid file_pattern"));
                assert!(errors[2].contains("buffer_limit"));
            }
            other => panic!("expected ValidationList, got {:?}", other),
        }
    }

    #[test]
    fn test_unset_env_var_is_reported() {
        let err = parse_config(
            r#"
sources:
  primary:
    path: $env{JOBTRAIL_SURELY_UNSET_ROOT}/logs
output:
  directory: /tmp/out
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("JOBTRAIL_SURELY_UNSET_ROOT")));
    }
}
