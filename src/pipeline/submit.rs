//! Remote submission: POST a generated invoice to a Pohoda mServer.
//!
//! A submission succeeds only when the server answers `200` and the body
//! carries no `error` marker (case-insensitive); mServer reports rejected
//! imports inside a `200` response. Every other outcome, including
//! network-level failures, is written to the error log and returned as a
//! failed [`SubmissionOutcome`]. Nothing here returns `Err`.

use crate::config::RemoteEndpoint;
use crate::errlog::ErrorLog;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::info;

/// Header carrying the agenda (ledger) identifier.
pub const AGENDA_HEADER: &str = "STW-Agenda";

/// Substring that marks a failed import in the response body.
pub const ERROR_MARKER: &str = "error";

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Response body or transport error text, on failure.
    pub detail: Option<String>,
}

/// Anything that can deliver a generated invoice somewhere.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Deliver `xml` to `destination`. `file_name` is used for log lines only.
    async fn submit(
        &self,
        xml: &str,
        destination: &RemoteEndpoint,
        file_name: &str,
    ) -> SubmissionOutcome;
}

/// [`Submitter`] that POSTs over HTTP with Basic authentication.
pub struct HttpSubmitter {
    client: reqwest::Client,
    log: ErrorLog,
}

impl HttpSubmitter {
    /// Uses the HTTP client's default timeouts.
    pub fn new(log: ErrorLog) -> Self {
        Self {
            client: reqwest::Client::new(),
            log,
        }
    }

    pub fn with_client(client: reqwest::Client, log: ErrorLog) -> Self {
        Self { client, log }
    }
}

/// Success means exactly `200 OK` and no error marker in the body.
pub fn is_accepted(status: StatusCode, body: &str) -> bool {
    status == StatusCode::OK && !body.to_lowercase().contains(ERROR_MARKER)
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        xml: &str,
        destination: &RemoteEndpoint,
        file_name: &str,
    ) -> SubmissionOutcome {
        let result = self
            .client
            .post(&destination.url)
            .basic_auth(&destination.username, Some(&destination.password))
            .header(CONTENT_TYPE, "text/xml")
            .header(ACCEPT, "application/xml")
            .header(AGENDA_HEADER, &destination.agenda)
            .body(xml.to_owned())
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                let detail = e.to_string();
                self.log
                    .log(&format!("Submission of {file_name} failed: {detail}"));
                return SubmissionOutcome {
                    success: false,
                    status: None,
                    detail: Some(detail),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                let detail = e.to_string();
                self.log.log(&format!(
                    "Submission of {file_name}: could not read response (HTTP {}): {detail}",
                    status.as_u16()
                ));
                return SubmissionOutcome {
                    success: false,
                    status: Some(status.as_u16()),
                    detail: Some(detail),
                };
            }
        };

        if is_accepted(status, &body) {
            info!("Import of {file_name} accepted by {}", destination.url);
            SubmissionOutcome {
                success: true,
                status: Some(status.as_u16()),
                detail: None,
            }
        } else {
            self.log.log(&format!(
                "Submission of {file_name} rejected (HTTP {}): {body}",
                status.as_u16()
            ));
            SubmissionOutcome {
                success: false,
                status: Some(status.as_u16()),
                detail: Some(body),
            }
        }
    }
}
