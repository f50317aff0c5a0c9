//! FileWriter - appends envelopes to a JSON-lines capture file

use chrono::{SecondsFormat, Utc};
use contracts::{BusEnvelope, BusWriter, ContractError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileWriter
#[derive(Debug, Clone)]
pub struct FileWriterConfig {
    /// Output directory
    pub base_path: PathBuf,
    /// File name; a timestamped name is generated when unset
    pub file_name: Option<String>,
}

impl FileWriterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self {
            base_path,
            file_name: params.get("file_name").cloned(),
        }
    }
}

#[derive(Serialize)]
struct Record<'a> {
    /// Wall-clock time the writer received the envelope (RFC 3339)
    received_at: String,
    envelope: &'a BusEnvelope,
}

/// Writer that records every bus envelope to disk
pub struct FileWriter {
    name: String,
    path: PathBuf,
    out: Option<BufWriter<File>>,
    records: u64,
}

impl FileWriter {
    /// Create the output directory and open the capture file for appending
    pub fn new(name: impl Into<String>, config: FileWriterConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        let file_name = config.file_name.unwrap_or_else(|| {
            format!("mocap-{}.jsonl", Utc::now().format("%Y%m%dT%H%M%S"))
        });
        let path = config.base_path.join(file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        debug!(path = %path.display(), "FileWriter opened");

        Ok(Self {
            name: name.into(),
            path,
            out: Some(BufWriter::new(file)),
            records: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileWriterConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn append(&mut self, envelope: &BusEnvelope) -> std::io::Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| std::io::Error::other("writer closed"))?;

        let record = Record {
            received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            envelope,
        };
        serde_json::to_writer(&mut *out, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        out.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    fn persist(&mut self, envelope: &BusEnvelope) -> Result<(), ContractError> {
        self.append(envelope).map_err(|e| {
            error!(writer = %self.name, topic = envelope.topic(), error = %e, "Write failed");
            ContractError::publish(&self.name, envelope.topic(), e.to_string())
        })
    }
}

impl BusWriter for FileWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_writer_write",
        skip(self, envelope),
        fields(writer = %self.name, topic = envelope.topic())
    )]
    async fn write(&mut self, envelope: &BusEnvelope) -> Result<(), ContractError> {
        self.persist(envelope)
    }

    #[instrument(name = "file_writer_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(out) = self.out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }

    #[instrument(name = "file_writer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        debug!(writer = %self.name, records = self.records, "FileWriter closed");
        Ok(())
    }
}
