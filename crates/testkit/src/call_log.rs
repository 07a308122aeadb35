//! Newline-delimited JSON log of the calls a scripted server answered.

use anyhow::{Context, Result};
use pogo_net::RequestType;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One answered envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Position of the envelope in the session, from 0.
    pub seq: u64,
    /// Sub-request types, in order.
    pub requests: Vec<RequestType>,
    /// Whether the envelope carried an auth ticket rather than auth info.
    pub ticketed: bool,
    /// Status answered, or `None` when the call was failed at the transport.
    pub status: Option<i32>,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct CallLog {
    writer: BufWriter<File>,
}

impl CallLog {
    /// Create a new log at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create call log {}", path.as_ref().display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append a record and flush it.
    pub fn write(&mut self, record: &CallRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read every record back.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<CallRecord>> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open call log {}", path.as_ref().display()))?;
        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse line {}", index + 1))?;
            records.push(record);
        }
        Ok(records)
    }
}
