//! Bounded HTTP probe
//!
//! Fetches headers for an untrusted URL (HEAD with streamed-GET fallback)
//! and can sample the response body line by line without ever buffering the
//! whole thing.  Everything is bounded by a single deadline; failures are
//! reported as the tagged [`ProbeError`] kinds so the caller can decide what
//! to downgrade.

use std::time::{Duration, Instant};

use reqwest::{header, Client, Response, StatusCode};
use tracing::debug;

use crate::error::ProbeError;

/// Body-sample budget: at most this many lines are inspected.
pub const BODY_SAMPLE_MAX_LINES: usize = 64;

/// Headers (and optionally a held-open streamed body) for a probed URL.
pub struct Probe {
    client: Client,
    url: String,
    deadline: Instant,
    status: StatusCode,
    content_type: Option<String>,
    body: Option<Response>,
}

impl Probe {
    /// Probe `url` within `timeout`.
    ///
    /// Tries a HEAD first.  A non-2xx status is not a failure; only
    /// transport-level errors are, and those trigger one retry as a
    /// streamed GET (some stream servers reject HEAD outright), whose
    /// response is kept for body sampling.
    pub async fn fetch(client: &Client, url: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let deadline = Instant::now() + timeout;
        match client.head(url).timeout(timeout).send().await {
            Ok(resp) => Ok(Self::from_response(client, url, deadline, resp, false)),
            Err(err) => {
                debug!(%url, error = %err, "HEAD failed, retrying as streamed GET");
                let budget = remaining_budget(deadline)?;
                let resp = client
                    .get(url)
                    .timeout(budget)
                    .send()
                    .await
                    .map_err(ProbeError::from)?;
                Ok(Self::from_response(client, url, deadline, resp, true))
            }
        }
    }

    fn from_response(
        client: &Client,
        url: &str,
        deadline: Instant,
        resp: Response,
        keep_body: bool,
    ) -> Self {
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        Self {
            client: client.clone(),
            url: url.to_string(),
            deadline,
            status: resp.status(),
            content_type,
            body: keep_body.then_some(resp),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Scan up to `max_lines` body lines and return the first one `keep`
    /// accepts, or `None` when the budget or the body runs out first.
    ///
    /// Issues the GET lazily when the probe was answered by a HEAD.  Reads
    /// chunk by chunk under the probe deadline; consumes the probe, so the
    /// connection is dropped on every exit path.
    pub async fn first_matching_line(
        mut self,
        max_lines: usize,
        mut keep: impl FnMut(&str) -> bool,
    ) -> Result<Option<String>, ProbeError> {
        let mut resp = match self.body.take() {
            Some(resp) => resp,
            None => {
                let budget = remaining_budget(self.deadline)?;
                self.client
                    .get(&self.url)
                    .timeout(budget)
                    .send()
                    .await
                    .map_err(ProbeError::from)?
            }
        };

        let mut buf: Vec<u8> = Vec::new();
        let mut seen = 0usize;
        loop {
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                if let Some(hit) = accept_line(&raw, &mut keep) {
                    return Ok(Some(hit));
                }
                seen += 1;
                if seen >= max_lines {
                    return Ok(None);
                }
            }

            let budget = remaining_budget(self.deadline)?;
            let chunk = tokio::time::timeout(budget, resp.chunk())
                .await
                .map_err(|_| ProbeError::Timeout)?
                .map_err(ProbeError::from)?;
            match chunk {
                Some(bytes) => buf.extend_from_slice(&bytes),
                None => {
                    // end of body: the tail may be a line without a newline
                    if !buf.is_empty() && seen < max_lines {
                        if let Some(hit) = accept_line(&buf, &mut keep) {
                            return Ok(Some(hit));
                        }
                    }
                    return Ok(None);
                }
            }
        }
    }
}

fn accept_line(raw: &[u8], keep: &mut impl FnMut(&str) -> bool) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    keep(line).then(|| line.to_string())
}

fn remaining_budget(deadline: Instant) -> Result<Duration, ProbeError> {
    let now = Instant::now();
    if now >= deadline {
        return Err(ProbeError::Timeout);
    }
    Ok(deadline - now)
}
