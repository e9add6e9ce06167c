pub type Result<T> = std::result::Result<T, RenderError>;

/// Failure of a single render attempt. The ladder recovers from every variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Layout failed: {message}")]
    Layout { message: String },

    #[error("Engine initialization failed: {message}")]
    Initialize { message: String },

    #[error("{message}")]
    Engine { message: String },
}

impl RenderError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Failure of a whole render request. Engine failures never surface here; they drive the ladder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LadderError {
    #[error("No diagram code provided.")]
    NoDiagram,
}

/// Failure of the optional PNG preview fetch. Reported once, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Preview image unavailable: {message}")]
pub struct PreviewError {
    pub message: String,
}

impl PreviewError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
