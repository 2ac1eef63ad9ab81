//! HTTP clients for the four collaborators.

use crate::error::ProviderError;
use crate::providers::{
    CaseReceipt, CaseRequest, ComplianceOutput, EnsembleInference, EnsembleOutput, PatternAnomaly,
    PatternOutput, SimilaritySearch, WorkflowAutomation,
};
use crate::types::signal::SimilarMatch;
use crate::types::transaction::Transaction;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP client shared by the collaborator adapters.
#[derive(Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ProviderClient {
    /// `base_url` should be like `https://api.example.com/v1` (no trailing slash).
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "calling provider");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[derive(Serialize)]
struct InferRequest<'a> {
    text: &'a str,
    models: &'a [String],
}

/// `POST /ensemble/infer`
pub struct HttpEnsemble {
    client: ProviderClient,
    models: Vec<String>,
}

impl HttpEnsemble {
    pub fn new(client: ProviderClient, models: Vec<String>) -> Self {
        Self { client, models }
    }
}

#[async_trait]
impl EnsembleInference for HttpEnsemble {
    async fn infer(&self, transaction_text: &str) -> Result<EnsembleOutput, ProviderError> {
        let body = InferRequest {
            text: transaction_text,
            models: &self.models,
        };
        self.client.post("/ensemble/infer", &body).await
    }
}

/// `POST /patterns/analyze`
pub struct HttpPatternAnalyzer {
    client: ProviderClient,
}

impl HttpPatternAnalyzer {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PatternAnomaly for HttpPatternAnalyzer {
    async fn analyze_pattern(
        &self,
        transaction: &Transaction,
    ) -> Result<PatternOutput, ProviderError> {
        self.client.post("/patterns/analyze", transaction).await
    }
}

#[derive(Serialize)]
struct SimilarRequest<'a> {
    text: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct SimilarResponse {
    matches: Vec<SimilarMatch>,
}

/// `POST /patterns/similar`
pub struct HttpSimilaritySearch {
    client: ProviderClient,
}

impl HttpSimilaritySearch {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SimilaritySearch for HttpSimilaritySearch {
    async fn find_similar(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>, ProviderError> {
        let resp: SimilarResponse = self
            .client
            .post("/patterns/similar", &SimilarRequest { text, limit })
            .await?;
        Ok(resp.matches)
    }
}

/// `POST /cases` and `POST /compliance/check`
pub struct HttpWorkflow {
    client: ProviderClient,
}

impl HttpWorkflow {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkflowAutomation for HttpWorkflow {
    async fn create_case(&self, request: &CaseRequest) -> Result<CaseReceipt, ProviderError> {
        self.client.post("/cases", request).await
    }

    async fn compliance_check(
        &self,
        transaction: &Transaction,
    ) -> Result<ComplianceOutput, ProviderError> {
        self.client.post("/compliance/check", transaction).await
    }
}
