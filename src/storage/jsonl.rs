use super::traits::{RecordSink, SinkError, Sinks};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Writes one JSON document per line.
pub struct JsonLinesSink<T> {
    stream: String,
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
    _record: PhantomData<fn(T)>,
}

impl<T> JsonLinesSink<T> {
    pub fn create(stream: &str, path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|e| SinkError::Io {
            stream: stream.to_string(),
            source: e,
        })?;
        Ok(Self {
            stream: stream.to_string(),
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            stream: self.stream.clone(),
            source,
        }
    }
}

impl<T: Serialize> RecordSink<T> for JsonLinesSink<T> {
    fn append(&mut self, record: T) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &record).map_err(|e| SinkError::Serialize {
            stream: self.stream.clone(),
            source: e,
        })?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| self.io_error(e))?;
        self.written += 1;
        Ok(())
    }

    fn close_and_report_count(mut self: Box<Self>) -> Result<u64, SinkError> {
        self.writer.flush().map_err(|e| self.io_error(e))?;
        tracing::debug!(stream = %self.stream, path = %self.path.display(), records = self.written, "Closed output stream");
        Ok(self.written)
    }
}

/// Open one `<stream>.jsonl` file per output stream inside `directory`.
pub fn open_directory(directory: &Path) -> Result<Sinks, SinkError> {
    std::fs::create_dir_all(directory).map_err(|e| SinkError::Io {
        stream: directory.display().to_string(),
        source: e,
    })?;

    fn sink<T: Serialize + 'static>(
        directory: &Path,
        stream: &str,
    ) -> Result<Box<dyn RecordSink<T>>, SinkError> {
        let path = directory.join(format!("{}.jsonl", stream));
        Ok(Box::new(JsonLinesSink::<T>::create(stream, &path)?))
    }

    Ok(Sinks {
        jobs: sink(directory, "jobs")?,
        job_errors: sink(directory, "job_errors")?,
        extract_details: sink(directory, "extract_job_details")?,
        subscription_details: sink(directory, "subscription_job_details")?,
        flow_details: sink(directory, "flow_job_details")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SubscriptionJobDetail;
    use tempfile::TempDir;

    #[test]
    fn test_writes_one_line_per_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("subs.jsonl");

        let mut sink: Box<dyn RecordSink<SubscriptionJobDetail>> =
            Box::new(JsonLinesSink::create("subs", &path).unwrap());
        for id in ["1", "2-requeue-1"] {
            sink.append(SubscriptionJobDetail {
                job_id: id.to_string(),
                subscription_name: Some("Weekly".to_string()),
                recipient: None,
                sender: None,
                smtp_server: None,
                viz_session_id: None,
            })
            .unwrap();
        }
        assert_eq!(sink.close_and_report_count().unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: SubscriptionJobDetail = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.job_id, "2-requeue-1");
    }

    #[test]
    fn test_open_directory_creates_all_streams() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let sinks = open_directory(&out).unwrap();
        let counts = sinks.close_all().unwrap();

        assert_eq!(counts.jobs, 0);
        for stream in [
            "jobs",
            "job_errors",
            "extract_job_details",
            "subscription_job_details",
            "flow_job_details",
        ] {
            assert!(out.join(format!("{}.jsonl", stream)).exists());
        }
    }
}
