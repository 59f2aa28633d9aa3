//! Execution of one templated HTTP request.
//!
//! Uses a shared `reqwest::Client` for connection pooling, the way the
//! teacher's own `examples/http_reqwest.rs` builds a single client and reuses
//! it across iterations; that client now lives on the coordinator/workflow
//! path instead of example glue.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{ExtractionError, StepError};
use crate::jsonpath::{self, JsonPathError};
use crate::status::Status;
use crate::template::{self, Variables};

/// Response body size read for extraction purposes.
const EXTRACTION_READ_CAP: usize = 10 * 1024 * 1024;
/// Response body size kept around for debug logging when no extraction is
/// configured.
const DEBUG_READ_CAP: usize = 4 * 1024;

/// A single step in a [`crate::workflow::WorkflowConfig`].
#[derive(Debug, Clone)]
pub struct StepConfig {
    /// Step name, used for event attribution and per-step metrics.
    pub name: String,
    /// HTTP method.
    pub method: Method,
    /// URL template, substituted against the iteration's [`Variables`].
    pub url: String,
    /// Header name to value-template map.
    pub headers: HashMap<String, String>,
    /// Optional request body template.
    pub body: Option<String>,
    /// Variable name to JSON-path expression, evaluated on a successful
    /// response.
    pub extract: HashMap<String, String>,
}

/// The outcome of dispatching one [`StepConfig`].
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Observed round-trip duration.
    pub duration: Duration,
    /// Whether the attempt is considered successful (status < 400).
    pub success: bool,
    /// Error description; empty iff `success`.
    pub error: String,
    /// HTTP status code, or 0 if the request never produced one.
    pub status_code: i64,
    /// Bytes in the substituted request body.
    pub bytes_sent: u64,
    /// Bytes read from the response body.
    pub bytes_received: u64,
    /// Variables extracted from the response; populated only on success.
    pub extracted: Variables,
}

/// A completed attempt, or an early exit due to cancellation (no event is
/// synthesized for the latter, per the cancellation error-handling row).
pub enum StepOutcome {
    /// The request ran to completion (successfully or not).
    Completed(StepResult),
    /// Cancellation fired before a result could be produced.
    Cancelled,
}

impl StepConfig {
    /// Executes this step once against `client`, substituting `vars` into
    /// the URL, headers, and body.
    ///
    /// Template, extraction, and transport failures are surfaced as
    /// [`StepError`] (the iteration aborts); an HTTP status `>= 400` is
    /// returned as a failed [`StepResult`] (the iteration continues).
    pub async fn execute(
        &self,
        client: &Client,
        vars: &Variables,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, StepError> {
        let url = template::substitute(&self.url, vars)?;
        let headers = template::substitute_map(&self.headers, vars)?;
        let body = match &self.body {
            Some(template) => Some(template::substitute(template, vars)?),
            None => None,
        };
        let bytes_sent = body.as_ref().map(|b| b.len() as u64).unwrap_or(0);

        let mut request = client.request(self.method.clone(), &url);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let start = Instant::now();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StepOutcome::Cancelled),
            result = request.send() => result,
        };

        let mut response = match response {
            Ok(response) => response,
            Err(e) => return Err(StepError::Transport(e.to_string())),
        };

        let raw_status = response.status();
        let status: Status = raw_status.into();
        let cap = if self.extract.is_empty() { DEBUG_READ_CAP } else { EXTRACTION_READ_CAP };
        let (body_bytes, bytes_received) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StepOutcome::Cancelled),
            result = read_body_capped(&mut response, cap) => match result {
                Ok(v) => v,
                Err(e) => return Err(StepError::Transport(e.to_string())),
            },
        };
        let duration = start.elapsed();

        let success = status.code() < 400;
        if !success {
            return Ok(StepOutcome::Completed(StepResult {
                duration,
                success: false,
                error: raw_status.to_string(),
                status_code: status.code(),
                bytes_sent,
                bytes_received,
                extracted: Variables::new(),
            }));
        }

        let extracted = if self.extract.is_empty() {
            Variables::new()
        } else {
            self.run_extraction(&body_bytes)?
        };

        Ok(StepOutcome::Completed(StepResult {
            duration,
            success: true,
            error: String::new(),
            status_code: status.code(),
            bytes_sent,
            bytes_received,
            extracted,
        }))
    }

    fn run_extraction(&self, body_bytes: &[u8]) -> Result<Variables, ExtractionError> {
        let body: Value = serde_json::from_slice(body_bytes)
            .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;

        let mut extracted = Variables::new();
        for (name, path) in &self.extract {
            let value = jsonpath::extract(path, &body).map_err(|e| match e {
                JsonPathError::InvalidPath(p) => ExtractionError::InvalidPath(p),
                JsonPathError::NotFound => {
                    ExtractionError::NotFound { name: name.clone(), path: path.clone() }
                }
            })?;
            extracted.insert(name.clone(), value);
        }
        Ok(extracted)
    }
}

/// Reads up to `cap` bytes of the response body for parsing while draining
/// and releasing the rest of the connection, returning `(captured, total_len)`.
async fn read_body_capped(
    response: &mut reqwest::Response,
    cap: usize,
) -> Result<(Vec<u8>, u64), reqwest::Error> {
    let mut buf = Vec::new();
    let mut total: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        total += chunk.len() as u64;
        if buf.len() < cap {
            let remaining = cap - buf.len();
            if chunk.len() as usize <= remaining {
                buf.extend_from_slice(&chunk);
            } else {
                buf.extend_from_slice(&chunk[..remaining]);
            }
        }
    }
    Ok((buf, total))
}
