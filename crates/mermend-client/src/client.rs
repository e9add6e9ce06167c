use crate::types::{
    AnalysisResults, AnalysisSummary, ApprovalStatus, ApprovalTicket, ApproveRequest, CodeRequest,
    ConnectionTest, Document, DrawioResponse, ExplainResponse, IntegrationStatus, MarkdownRequest,
};
use crate::work_items::{Platform, WorkItemList, WorkItemQuery};
use crate::{ClientConfig, ClientError, Result};
use reqwest::RequestBuilder;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

pub const NO_EXPLANATION: &str = "No explanation available.";

/// Async client for the analysis backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                path: config.base_url.to_string(),
                source,
            })?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.config.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<reqwest::Response> {
        tracing::debug!(path, "api request");
        let transport = |source| ClientError::Transport {
            path: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(path, status = status.as_u16(), "api request failed");
        Err(ClientError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let response = self.execute(path, request).await?;
        let body = response.text().await.map_err(|source| ClientError::Transport {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| {
            tracing::warn!(path, error = %source, "undecodable api response");
            ClientError::Decode {
                path: path.to_string(),
                source,
            }
        })
    }

    async fn bytes(&self, path: &str, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = self.execute(path, request).await?;
        let bytes = response.bytes().await.map_err(|source| ClientError::Transport {
            path: path.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let path = display_path(segments);
        let mut request = self.http.get(self.url(segments));
        if !query.is_empty() {
            request = request.query(query);
        }
        self.json(&path, request).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let path = display_path(segments);
        self.json(&path, self.http.post(self.url(segments)).json(body))
            .await
    }

    fn file_form(file_name: &str, contents: Vec<u8>) -> Form {
        Form::new().part("file", Part::bytes(contents).file_name(file_name.to_string()))
    }

    /// `POST /api/render_mermaid`: PNG bytes for diagram text.
    pub async fn render_png(&self, code: &str) -> Result<Vec<u8>> {
        let segments = ["api", "render_mermaid"];
        let request = self
            .http
            .post(self.url(&segments))
            .json(&CodeRequest { code });
        self.bytes(&display_path(&segments), request).await
    }

    /// `POST /api/convert_mermaid_to_drawio`: draw.io XML for diagram text.
    pub async fn convert_to_drawio(&self, code: &str) -> Result<String> {
        let response: DrawioResponse = self
            .post_json(&["api", "convert_mermaid_to_drawio"], &CodeRequest { code })
            .await?;
        match response.xml {
            Some(xml) if response.success => Ok(xml),
            _ => Err(ClientError::ConversionFailed { target: "draw.io" }),
        }
    }

    /// `POST /api/convert_to_docx`: a Word document rendered from Markdown.
    pub async fn convert_to_docx(&self, markdown: &str) -> Result<Vec<u8>> {
        let segments = ["api", "convert_to_docx"];
        let request = self
            .http
            .post(self.url(&segments))
            .json(&MarkdownRequest { markdown });
        self.bytes(&display_path(&segments), request).await
    }

    pub async fn upload_document(&self, file_name: &str, contents: Vec<u8>) -> Result<Document> {
        let segments = ["api", "upload_document"];
        let request = self
            .http
            .post(self.url(&segments))
            .multipart(Self::file_form(file_name, contents));
        self.json(&display_path(&segments), request).await
    }

    pub async fn documents(&self) -> Result<Vec<Document>> {
        self.get_json(&["api", "documents"], &[]).await
    }

    pub async fn analyses(&self) -> Result<Vec<AnalysisSummary>> {
        self.get_json(&["api", "analyses"], &[]).await
    }

    /// Runs a full analysis of an uploaded requirements document.
    pub async fn generate(&self, file_name: &str, contents: Vec<u8>) -> Result<AnalysisResults> {
        let segments = ["api", "generate"];
        let request = self
            .http
            .post(self.url(&segments))
            .multipart(Self::file_form(file_name, contents));
        self.json(&display_path(&segments), request).await
    }

    pub async fn approve(&self, results: &AnalysisResults) -> Result<ApprovalTicket> {
        let body = ApproveRequest {
            analysis_id: results.analysis_id.as_deref(),
            results,
        };
        self.post_json(&["api", "approve"], &body).await
    }

    pub async fn approval_status(&self, approval_id: &str) -> Result<ApprovalStatus> {
        self.get_json(&["api", "approval_status", approval_id], &[])
            .await
    }

    pub async fn integration_status(&self, platform: Platform) -> Result<IntegrationStatus> {
        let name = match platform {
            Platform::Ado => "ado",
            Platform::Jira => "jira",
        };
        self.get_json(&["api", name, "status"], &[]).await
    }

    pub async fn test_ado_connection(&self) -> Result<ConnectionTest> {
        self.post_json(&["api", "ado", "test"], &serde_json::json!({}))
            .await
    }

    /// Azure DevOps projects for the project filter. A non-2xx answer or a non-array body
    /// yields an empty list.
    pub async fn ado_projects(&self) -> Result<Vec<Value>> {
        match self.get_json::<Value>(&["api", "ado", "projects"], &[]).await {
            Ok(Value::Array(projects)) => Ok(projects),
            Ok(_) => Ok(Vec::new()),
            Err(ClientError::Status { status, .. }) => {
                tracing::debug!(status, "no ado project list");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn work_items(&self, platform: Platform, query: &WorkItemQuery) -> Result<WorkItemList> {
        let body: Value = self
            .get_json(platform.items_path(), &query.params(platform))
            .await?;
        Ok(WorkItemList::from_response(platform, &body))
    }

    /// Raw item detail. `project` is only sent to Azure DevOps.
    pub async fn work_item(&self, platform: Platform, id: &str, project: Option<&str>) -> Result<Value> {
        let mut segments = platform.items_path().to_vec();
        segments.push(id);
        let query: Vec<(&str, String)> = match (platform, project) {
            (Platform::Ado, Some(p)) if !p.is_empty() => vec![("project", p.to_string())],
            _ => Vec::new(),
        };
        self.get_json(&segments, &query).await
    }

    /// AI explanation of one item, or [`NO_EXPLANATION`] when the backend has none.
    pub async fn explain_work_item(&self, platform: Platform, id: &str) -> Result<String> {
        let mut segments = platform.items_path().to_vec();
        segments.extend([id, "explain"]);
        let path = display_path(&segments);
        let response: ExplainResponse = self.json(&path, self.http.post(self.url(&segments))).await?;
        Ok(response
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| NO_EXPLANATION.to_string()))
    }
}

fn display_path(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}
