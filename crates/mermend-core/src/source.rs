use crate::{Error, Result};
use serde::Serialize;
use url::Url;

/// Prefix marking a diagram field that should be shown as an embedded external frame.
pub const EMBED_PREFIX: &str = "LUCID_EMBED::";

/// A node pulled out of diagram text by pattern matching: `ID[label]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    pub label: String,
}

impl DiagramNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Parses `LUCID_EMBED::<url>`. `None` when the text does not carry the sentinel.
///
/// Only absolute `http`/`https` URLs are accepted.
pub fn parse_embed(raw: &str) -> Option<Result<Url>> {
    let rest = raw.trim_start().strip_prefix(EMBED_PREFIX)?.trim();
    let malformed = |reason: String| Error::MalformedEmbed {
        value: rest.to_string(),
        reason,
    };
    Some(match Url::parse(rest) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(url) => Err(malformed(format!("unsupported scheme `{}`", url.scheme()))),
        Err(err) => Err(malformed(err.to_string())),
    })
}

/// What a diagram field turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramInput<'a> {
    /// Missing or whitespace-only: nothing to render.
    Empty,
    /// `LUCID_EMBED::<url>`: bypasses normalization and rendering.
    Embed(Url),
    /// Ordinary diagram text.
    Source(&'a str),
}

impl<'a> DiagramInput<'a> {
    pub fn classify(raw: Option<&'a str>) -> Self {
        let Some(raw) = raw else {
            return Self::Empty;
        };
        if raw.trim().is_empty() {
            return Self::Empty;
        }
        match parse_embed(raw) {
            Some(Ok(url)) => return Self::Embed(url),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "treating embed sentinel as diagram text");
            }
            None => {}
        }
        Self::Source(raw)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_empty_and_whitespace() {
        assert_eq!(DiagramInput::classify(None), DiagramInput::Empty);
        assert_eq!(DiagramInput::classify(Some("")), DiagramInput::Empty);
        assert_eq!(DiagramInput::classify(Some(" \n\t")), DiagramInput::Empty);
    }

    #[test]
    fn classify_embed_sentinel() {
        let input = DiagramInput::classify(Some("LUCID_EMBED::https://lucid.app/documents/embedded/abc"));
        let DiagramInput::Embed(url) = input else {
            panic!("expected embed, got {input:?}");
        };
        assert_eq!(url.host_str(), Some("lucid.app"));
    }

    #[test]
    fn parse_embed_reports_reason() {
        assert!(parse_embed("flowchart TD").is_none());
        let err = parse_embed("LUCID_EMBED::ftp://host/x")
            .and_then(|r| r.err())
            .map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("Malformed embed sentinel `ftp://host/x`: unsupported scheme `ftp`")
        );
    }

    #[test]
    fn classify_bad_embed_falls_back_to_source() {
        let raw = "LUCID_EMBED::not a url";
        assert_eq!(DiagramInput::classify(Some(raw)), DiagramInput::Source(raw));
        let raw = "LUCID_EMBED::file:///etc/passwd";
        assert_eq!(DiagramInput::classify(Some(raw)), DiagramInput::Source(raw));
    }
}
