//! A render session wired to the backend: previews, PNG download and draw.io export.

use crate::client::{ApiClient, ClientError};
use crate::render::{
    Ladder, LadderError, PngSource, PreviewError, RenderSession, SessionOptions, ViewState, flowchart_ladder,
};
use mermend_core::Notice;
use std::sync::{Arc, Mutex, PoisonError};

pub const PNG_FAILED: &str = "Failed to generate PNG";
pub const PNG_DOWNLOAD_FAILED: &str = "Failed to download diagram";
pub const DRAWIO_FAILED: &str = "Failed to convert to draw.io";

/// Server-side PNG rendering as a preview source.
#[derive(Debug, Clone)]
pub struct ApiPngSource(pub ApiClient);

#[async_trait::async_trait]
impl PngSource for ApiPngSource {
    async fn fetch_png(&self, code: &str) -> Result<Vec<u8>, PreviewError> {
        self.0.render_png(code).await.map_err(|err| {
            PreviewError::new(err.server_message().unwrap_or_else(|| err.to_string()))
        })
    }
}

/// One diagram slot backed by the API.
///
/// Side calls never disturb what the session shows; their failures come back as [`Notice`]s.
#[derive(Debug)]
pub struct DiagramView {
    session: RenderSession,
    client: ApiClient,
    source: Mutex<Option<String>>,
}

impl DiagramView {
    /// Uses the built-in flowchart engine.
    pub fn new(diagram_id: impl Into<String>, client: ApiClient, options: SessionOptions) -> Self {
        Self::with_ladder(diagram_id, Arc::new(flowchart_ladder()), client, options)
    }

    pub fn with_ladder(
        diagram_id: impl Into<String>,
        ladder: Arc<Ladder>,
        client: ApiClient,
        options: SessionOptions,
    ) -> Self {
        let png = Arc::new(ApiPngSource(client.clone()));
        let session = RenderSession::with_png_source(diagram_id, ladder, options, png);
        Self {
            session,
            client,
            source: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Source as last given to [`Self::update`], before any repair.
    pub fn source(&self) -> Option<String> {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, source: Option<&str>) -> u64 {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = source.map(str::to_owned);
        self.session.update(source)
    }

    pub async fn settled(&self) -> ViewState {
        self.session.settled().await
    }

    /// PNG of the original source, rendered by the backend.
    pub async fn download_png(&self) -> Result<Vec<u8>, Notice> {
        let Some(code) = self.source().filter(|c| !c.trim().is_empty()) else {
            return Err(Notice::error(LadderError::NoDiagram.to_string()));
        };
        self.client.render_png(&code).await.map_err(|err| {
            tracing::warn!(diagram_id = %self.session.diagram_id(), error = %err, "PNG download failed");
            match err {
                ClientError::Status { .. } => Notice::error(PNG_FAILED),
                _ => Notice::error(PNG_DOWNLOAD_FAILED),
            }
        })
    }

    /// draw.io XML for the original source. `Ok(None)` when there is no source to convert.
    pub async fn export_drawio(&self) -> Result<Option<String>, Notice> {
        let Some(code) = self.source().filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        match self.client.convert_to_drawio(&code).await {
            Ok(xml) => Ok(Some(xml)),
            Err(err) => {
                tracing::warn!(diagram_id = %self.session.diagram_id(), error = %err, "draw.io export failed");
                Err(Notice::error(DRAWIO_FAILED))
            }
        }
    }

    pub fn close(&self) {
        self.session.close();
    }
}
