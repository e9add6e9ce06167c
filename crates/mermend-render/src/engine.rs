use crate::error::Result;
use crate::flowchart::FlowchartEngine;
use async_trait::async_trait;
use mermend_core::RenderConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A diagram renderer.
///
/// The ladder only ever sees this trait, so tests and embedders can swap the built-in
/// [`FlowchartEngine`] for anything that turns text into SVG.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    fn name(&self) -> &str;

    /// One-time setup, run before the first render through an [`EngineHandle`]. A failed
    /// initialization is retried on the next render.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Renders `code` to an SVG document whose root element id is `render_id`.
    async fn render(&self, render_id: &str, code: &str, config: &RenderConfig) -> Result<String>;
}

struct Inner {
    engine: Arc<dyn RenderEngine>,
    ready: OnceCell<()>,
}

/// Shared, lazily initialized engine. Cloning is cheap and clones share initialization.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("engine", &self.inner.engine.name())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EngineHandle {
    pub fn new(engine: impl RenderEngine + 'static) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<dyn RenderEngine>) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                ready: OnceCell::new(),
            }),
        }
    }

    /// Handle over the built-in strict flowchart engine.
    pub fn builtin() -> Self {
        Self::new(FlowchartEngine::default())
    }

    pub fn name(&self) -> &str {
        self.inner.engine.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.ready.initialized()
    }

    pub async fn render(&self, render_id: &str, code: &str, config: &RenderConfig) -> Result<String> {
        self.inner
            .ready
            .get_or_try_init(|| async {
                tracing::debug!(engine = self.name(), "initializing render engine");
                self.inner.engine.initialize().await
            })
            .await?;
        self.inner.engine.render(render_id, code, config).await
    }
}

/// Replaces every character that is not valid in an SVG/XML id with `_`.
pub fn sanitize_svg_id(stem: &str) -> String {
    let id: String = stem
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        id
    } else {
        format!("d{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        inits: AtomicUsize,
        fail_first_init: bool,
    }

    #[async_trait]
    impl RenderEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        async fn initialize(&self) -> Result<()> {
            let n = self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_first_init && n == 0 {
                return Err(RenderError::Initialize {
                    message: "not yet".to_string(),
                });
            }
            Ok(())
        }

        async fn render(&self, render_id: &str, _code: &str, _config: &RenderConfig) -> Result<String> {
            Ok(format!("<svg id=\"{render_id}\"/>"))
        }
    }

    #[tokio::test]
    async fn initializes_once_across_clones() {
        let engine = Arc::new(CountingEngine {
            inits: AtomicUsize::new(0),
            fail_first_init: false,
        });
        let handle = EngineHandle::from_arc(engine.clone());
        let other = handle.clone();
        let cfg = RenderConfig::primary();
        handle.render("a", "graph TD", &cfg).await.unwrap();
        other.render("b", "graph TD", &cfg).await.unwrap();
        assert_eq!(engine.inits.load(Ordering::SeqCst), 1);
        assert!(other.is_initialized());
    }

    #[tokio::test]
    async fn failed_initialization_is_retried() {
        let engine = Arc::new(CountingEngine {
            inits: AtomicUsize::new(0),
            fail_first_init: true,
        });
        let handle = EngineHandle::from_arc(engine.clone());
        let cfg = RenderConfig::primary();
        assert!(matches!(
            handle.render("a", "graph TD", &cfg).await,
            Err(RenderError::Initialize { .. })
        ));
        assert!(!handle.is_initialized());
        assert_eq!(handle.render("a", "graph TD", &cfg).await.unwrap(), "<svg id=\"a\"/>");
    }

    #[test]
    fn sanitizes_ids() {
        assert_eq!(sanitize_svg_id("hld-diagram"), "hld-diagram");
        assert_eq!(sanitize_svg_id("lld diagram #2"), "lld_diagram__2");
        assert_eq!(sanitize_svg_id("2nd"), "d2nd");
    }
}
