//! The external AI analysis call.

use crate::error::AnalysisError;
use crate::model::{AnalysisResult, SubmissionInput, WidgetConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Url;

/// Single-shot, potentially slow analysis of one submission.
///
/// The returned future must not borrow `self`: the orchestrator lets it run
/// to completion even after the episode was superseded.
pub trait AnalysisService: Send + Sync {
    fn analyze(&self, input: SubmissionInput) -> BoxFuture<'static, Result<AnalysisResult, AnalysisError>>;
}

/// Posts the submission as JSON and expects a JSON valuation back.
pub struct HttpAnalysisService {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpAnalysisService {
    pub fn new(cfg: &WidgetConfig) -> Result<Self, AnalysisError> {
        let endpoint = Url::parse(&cfg.endpoint)
            .map_err(|e| AnalysisError::InvalidEndpoint(format!("{}: {e}", cfg.endpoint)))?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl AnalysisService for HttpAnalysisService {
    fn analyze(&self, input: SubmissionInput) -> BoxFuture<'static, Result<AnalysisResult, AnalysisError>> {
        let http = self.http.clone();
        let url = self.endpoint.clone();
        async move {
            let resp = http.post(url).json(&input).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                tracing::debug!(%status, body = %body, "analysis service rejected request");
                return Err(AnalysisError::Status { status, body });
            }
            let bytes = resp.bytes().await?;
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            Ok(AnalysisResult::new(value))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_endpoint() {
        let cfg = WidgetConfig {
            endpoint: "not a url".into(),
            ..WidgetConfig::default()
        };
        match HttpAnalysisService::new(&cfg) {
            Err(AnalysisError::InvalidEndpoint(msg)) => assert!(msg.starts_with("not a url")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("malformed endpoint accepted"),
        }
    }

    #[test]
    fn keeps_configured_endpoint() {
        let svc = HttpAnalysisService::new(&WidgetConfig::default()).unwrap();
        assert_eq!(svc.endpoint().as_str(), "http://localhost:8787/api/analyze");
    }
}
