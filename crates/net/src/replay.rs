//! Recording and replay of transport exchanges.
//!
//! Exchanges are stored as JSONL: a header line followed by one line per
//! login and per envelope exchange. A [`RecordingTransport`] writes such a
//! file around any live transport; a [`ReplayTransport`] serves it back so a
//! whole session can be re-run offline.

use crate::codec::compute_schema_hash;
use crate::protocol::{RequestEnvelope, RequestType, ResponseEnvelope};
use crate::rpc::{RpcTransport, TransportError};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pogo_core::AuthProvider;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One envelope exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExchange {
    /// Sub-request types of the envelope sent.
    pub requests: Vec<RequestType>,
    /// Response received.
    pub response: ResponseEnvelope,
}

/// One line of an exchange log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplayRecord {
    /// First line of every log.
    Header {
        /// Protocol schema hash of the recording build.
        schema_hash: u64,
        /// When the recording started.
        recorded_at: DateTime<Utc>,
    },
    /// A provider login.
    Login {
        /// Provider used.
        provider: AuthProvider,
        /// Token issued.
        token: Option<String>,
    },
    /// An envelope exchange.
    Exchange(RecordedExchange),
}

impl ReplayRecord {
    /// Header for a recording made by this build.
    pub fn header() -> Self {
        ReplayRecord::Header {
            schema_hash: compute_schema_hash(),
            recorded_at: Utc::now(),
        }
    }
}

/// Transport that serves a recorded exchange log.
///
/// Logins and exchanges are served in recorded order, each from its own
/// queue. Running out of either is a transport error.
#[derive(Debug)]
pub struct ReplayTransport {
    logins: Mutex<VecDeque<Option<String>>>,
    exchanges: Mutex<VecDeque<RecordedExchange>>,
}

impl ReplayTransport {
    /// Load a log from a JSONL file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open exchange log: {:?}", path.as_ref()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
            records.push(record);
        }

        let transport = Self::from_records(records)?;
        info!(
            path = %path.as_ref().display(),
            "Loaded exchange log"
        );
        Ok(transport)
    }

    /// Build from already-parsed records; the first must be a matching header.
    pub fn from_records(records: Vec<ReplayRecord>) -> Result<Self> {
        let mut records = records.into_iter();
        match records.next() {
            Some(ReplayRecord::Header { schema_hash, .. }) => {
                let expected = compute_schema_hash();
                if schema_hash != expected {
                    bail!(
                        "Exchange log schema hash {schema_hash:#x} does not match {expected:#x}"
                    );
                }
            }
            Some(_) => bail!("Exchange log does not start with a header"),
            None => bail!("Exchange log is empty"),
        }

        let mut logins = VecDeque::new();
        let mut exchanges = VecDeque::new();
        for record in records {
            match record {
                ReplayRecord::Header { .. } => bail!("Exchange log has more than one header"),
                ReplayRecord::Login { token, .. } => logins.push_back(token),
                ReplayRecord::Exchange(exchange) => exchanges.push_back(exchange),
            }
        }

        debug!(
            logins = logins.len(),
            exchanges = exchanges.len(),
            "Exchange log parsed"
        );
        Ok(Self {
            logins: Mutex::new(logins),
            exchanges: Mutex::new(exchanges),
        })
    }

    /// Exchanges not yet served.
    pub async fn remaining(&self) -> usize {
        self.exchanges.lock().await.len()
    }
}

#[async_trait]
impl RpcTransport for ReplayTransport {
    async fn authenticate(
        &self,
        _provider: AuthProvider,
        _username: &str,
        _secret: &str,
    ) -> Result<Option<String>, TransportError> {
        self.logins
            .lock()
            .await
            .pop_front()
            .ok_or(TransportError::Exhausted)
    }

    async fn send(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        let exchange = self
            .exchanges
            .lock()
            .await
            .pop_front()
            .ok_or(TransportError::Exhausted)?;

        let sent = envelope.request_types();
        if sent != exchange.requests {
            warn!(?sent, recorded = ?exchange.requests, "Replayed envelope differs from recording");
        }
        Ok(exchange.response)
    }
}

/// Transport wrapper that appends every exchange to a JSONL log.
pub struct RecordingTransport<T> {
    inner: T,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl<T: RpcTransport> RecordingTransport<T> {
    /// Wrap `inner`, writing a fresh log at `path`.
    pub fn create(inner: T, path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create exchange log: {:?}", path.as_ref()))?;
        Self::with_writer(inner, BufWriter::new(file))
    }

    /// Wrap `inner`, writing the log to `writer`.
    pub fn with_writer(inner: T, writer: impl Write + Send + 'static) -> Result<Self> {
        let mut writer: Box<dyn Write + Send> = Box::new(writer);
        serde_json::to_writer(&mut writer, &ReplayRecord::header())?;
        writeln!(&mut writer)?;
        writer.flush().context("Failed to write exchange log header")?;
        Ok(Self {
            inner,
            writer: Mutex::new(writer),
        })
    }

    /// Append one record. The exchange already happened, so a failed write
    /// is logged and the log is left short.
    async fn append(&self, record: &ReplayRecord) {
        let mut writer = self.writer.lock().await;
        let written = serde_json::to_writer(&mut *writer, record)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(&mut *writer))
            .and_then(|()| writer.flush());
        if let Err(err) = written {
            warn!(error = %err, "Could not append to exchange log");
        }
    }
}

#[async_trait]
impl<T: RpcTransport> RpcTransport for RecordingTransport<T> {
    async fn authenticate(
        &self,
        provider: AuthProvider,
        username: &str,
        secret: &str,
    ) -> Result<Option<String>, TransportError> {
        let token = self.inner.authenticate(provider, username, secret).await?;
        self.append(&ReplayRecord::Login {
            provider,
            token: token.clone(),
        })
        .await;
        Ok(token)
    }

    async fn send(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        let requests = envelope.request_types();
        let response = self.inner.send(envelope).await?;
        self.append(&ReplayRecord::Exchange(RecordedExchange {
            requests,
            response: response.clone(),
        }))
        .await;
        Ok(response)
    }
}
