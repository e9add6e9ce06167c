//! A long-lived render session for one diagram slot.
//!
//! Input changes are debounced, then run through the ladder on a spawned task. Every change
//! takes a new generation token; a task only commits when its token is still current and the
//! session is open, so a slow render can never overwrite a newer one. In-flight work is not
//! aborted, its result is dropped.

use crate::boundary::{Recovery, guard_async};
use crate::error::LadderError;
use crate::ladder::{Ladder, RenderMode, RenderResult};
use crate::preview::{PngSource, PreviewImage, PreviewStore};
use mermend_core::{DiagramInput, Notice};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub debounce: Duration,
    /// Fetch a PNG preview after every successful or simplified render.
    pub fetch_preview: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            fetch_preview: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedView {
    pub generation: u64,
    pub result: Arc<RenderResult>,
    pub preview: Option<Arc<PreviewImage>>,
    /// Set when the preview fetch failed.
    pub preview_notice: Option<Notice>,
}

/// What the slot currently shows.
#[derive(Debug, Clone, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Pending {
        generation: u64,
    },
    NoDiagram {
        generation: u64,
        notice: Notice,
    },
    Embed {
        generation: u64,
        url: Url,
    },
    Ready(RenderedView),
    /// The render task panicked.
    Failed {
        generation: u64,
        recovery: Recovery,
    },
}

impl ViewState {
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Pending { generation }
            | Self::NoDiagram { generation, .. }
            | Self::Embed { generation, .. }
            | Self::Failed { generation, .. } => Some(*generation),
            Self::Ready(view) => Some(view.generation),
        }
    }

    pub fn rendered(&self) -> Option<&RenderedView> {
        match self {
            Self::Ready(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Idle | Self::Pending { .. })
    }
}

struct Shared {
    diagram_id: String,
    ladder: Arc<Ladder>,
    options: SessionOptions,
    previews: PreviewStore,
    png: Option<Arc<dyn PngSource>>,
    generation: AtomicU64,
    closed: AtomicBool,
    state: watch::Sender<ViewState>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Commits `next` only when `generation` is still the latest request.
    fn commit(&self, generation: u64, next: ViewState) -> bool {
        let committed = self.state.send_if_modified(|state| {
            if self.is_current(generation) {
                *state = next;
                true
            } else {
                false
            }
        });
        if !committed {
            tracing::debug!(diagram_id = %self.diagram_id, generation, "discarding stale result");
        }
        committed
    }

    fn attach_preview(&self, generation: u64, outcome: Result<PreviewImage, Notice>) {
        let committed = self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            let ViewState::Ready(view) = state else {
                return false;
            };
            match outcome {
                Ok(image) => view.preview = Some(Arc::new(image)),
                Err(notice) => view.preview_notice = Some(notice),
            }
            true
        });
        if !committed {
            tracing::debug!(diagram_id = %self.diagram_id, generation, "discarding stale preview");
        }
    }
}

/// One diagram slot. Dropping the session closes it.
pub struct RenderSession {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("diagram_id", &self.shared.diagram_id)
            .field("generation", &self.generation())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RenderSession {
    /// A session without a preview source.
    pub fn new(diagram_id: impl Into<String>, ladder: Arc<Ladder>, options: SessionOptions) -> Self {
        Self::build(diagram_id.into(), ladder, options, None)
    }

    /// A session that fetches previews from `png` when `options.fetch_preview` is set.
    pub fn with_png_source(
        diagram_id: impl Into<String>,
        ladder: Arc<Ladder>,
        options: SessionOptions,
        png: Arc<dyn PngSource>,
    ) -> Self {
        Self::build(diagram_id.into(), ladder, options, Some(png))
    }

    fn build(
        diagram_id: String,
        ladder: Arc<Ladder>,
        options: SessionOptions,
        png: Option<Arc<dyn PngSource>>,
    ) -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        Self {
            shared: Arc::new(Shared {
                diagram_id,
                ladder,
                options,
                previews: PreviewStore::new(),
                png,
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                state,
            }),
        }
    }

    pub fn diagram_id(&self) -> &str {
        &self.shared.diagram_id
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.shared.previews
    }

    pub fn state(&self) -> ViewState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.state.subscribe()
    }

    /// Schedules a render of `source` and returns its generation token.
    ///
    /// Must be called inside a tokio runtime. Calls made within the debounce window supersede
    /// each other; only the last one reaches the engine.
    pub fn update(&self, source: Option<&str>) -> u64 {
        if self.is_closed() {
            return self.generation();
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.commit(generation, ViewState::Pending { generation });

        let shared = Arc::clone(&self.shared);
        let source = source.map(str::to_owned);
        tokio::spawn(async move {
            tokio::time::sleep(shared.options.debounce).await;
            if !shared.is_current(generation) {
                tracing::trace!(diagram_id = %shared.diagram_id, generation, "debounced away");
                return;
            }
            if let Err(recovery) = guard_async(run(Arc::clone(&shared), generation, source)).await {
                tracing::error!(
                    diagram_id = %shared.diagram_id,
                    generation,
                    detail = %recovery.detail,
                    "render task panicked"
                );
                shared.commit(generation, ViewState::Failed { generation, recovery });
            }
        });
        generation
    }

    /// Waits until the latest request has settled, or the session closes.
    pub async fn settled(&self) -> ViewState {
        let mut rx = self.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                let latest = self.generation();
                if self.is_closed() || (state.is_settled() && state.generation() == Some(latest)) {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Stops committing results and releases any preview held by the current state.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.state.send_replace(ViewState::Idle);
        tracing::debug!(diagram_id = %self.shared.diagram_id, "render session closed");
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run(shared: Arc<Shared>, generation: u64, source: Option<String>) {
    let code = match DiagramInput::classify(source.as_deref()) {
        DiagramInput::Empty => {
            shared.commit(
                generation,
                ViewState::NoDiagram {
                    generation,
                    notice: Notice::error(LadderError::NoDiagram.to_string()),
                },
            );
            return;
        }
        DiagramInput::Embed(url) => {
            shared.commit(generation, ViewState::Embed { generation, url });
            return;
        }
        DiagramInput::Source(code) => code.to_string(),
    };

    let result = match shared.ladder.render(&shared.diagram_id, &code).await {
        Ok(result) => Arc::new(result),
        Err(err) => {
            shared.commit(
                generation,
                ViewState::NoDiagram {
                    generation,
                    notice: Notice::error(err.to_string()),
                },
            );
            return;
        }
    };
    let mode = result.mode;
    let committed = shared.commit(
        generation,
        ViewState::Ready(RenderedView {
            generation,
            result,
            preview: None,
            preview_notice: None,
        }),
    );
    if !committed || mode == RenderMode::RawTextFallback || !shared.options.fetch_preview {
        return;
    }
    let Some(png) = shared.png.clone() else {
        return;
    };

    // Independent of the ladder: failures become a notice, nothing is retried.
    let outcome = match png.fetch_png(&code).await {
        Ok(bytes) => Ok(shared.previews.register_png(&bytes)),
        Err(err) => {
            tracing::warn!(diagram_id = %shared.diagram_id, error = %err, "preview fetch failed");
            Err(Notice::error(err.to_string()))
        }
    };
    shared.attach_preview(generation, outcome);
}
