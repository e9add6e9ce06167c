use crate::{PngSource, PreviewError, RenderEngine, RenderError, Result};
use async_trait::async_trait;
use mermend_core::RenderConfig;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub render_id: String,
    pub code: String,
    pub html_labels: Option<bool>,
}

/// Succeeds or fails per candidate, deterministically.
pub(crate) struct ScriptedEngine {
    accept: fn(&str) -> bool,
    delay: fn(&str) -> Duration,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedEngine {
    pub fn new(accept: fn(&str) -> bool) -> Self {
        Self {
            accept,
            delay: |_| Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: fn(&str) -> Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn render(&self, render_id: &str, code: &str, config: &RenderConfig) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            render_id: render_id.to_string(),
            code: code.to_string(),
            html_labels: config.get_bool("flowchart.htmlLabels"),
        });
        let delay = (self.delay)(code);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if (self.accept)(code) {
            Ok(format!("<svg id=\"{render_id}\"></svg>"))
        } else {
            Err(RenderError::parse(1, "scripted failure"))
        }
    }
}

pub(crate) struct FakePng {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakePng {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PngSource for FakePng {
    async fn fetch_png(&self, _code: &str) -> std::result::Result<Vec<u8>, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(PreviewError::new("HTTP 500"))
        } else {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
    }
}

pub(crate) struct PanickingEngine;

#[async_trait]
impl RenderEngine for PanickingEngine {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn render(&self, _render_id: &str, _code: &str, _config: &RenderConfig) -> Result<String> {
        panic!("engine bug")
    }
}
