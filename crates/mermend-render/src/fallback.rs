use serde::Serialize;

pub const TEXT_FALLBACK_HEADING: &str = "Diagram could not be rendered";
pub const TEXT_FALLBACK_MESSAGE: &str =
    "The original diagram contained syntax that could not be parsed.";

/// The last rung of the ladder: the caller's original text, shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextPanel {
    pub heading: &'static str,
    pub message: &'static str,
    pub code: String,
}

impl TextPanel {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            heading: TEXT_FALLBACK_HEADING,
            message: TEXT_FALLBACK_MESSAGE,
            code: original.into(),
        }
    }

    /// Self-contained HTML fragment with the code collapsed under a disclosure widget.
    pub fn to_html(&self) -> String {
        format!(
            concat!(
                r#"<div class="diagram-text-fallback" style="padding: 20px; text-align: center; color: #666; border: 1px solid #ddd; border-radius: 8px; background: #f9f9f9;">"#,
                r#"<h4 style="margin: 0 0 10px 0; color: #333;">{heading}</h4>"#,
                r#"<p style="margin: 0 0 15px 0;">{message}</p>"#,
                r#"<details style="margin-top: 10px; text-align: left;">"#,
                r#"<summary style="cursor: pointer; color: #0066cc;">View Original Code</summary>"#,
                r#"<pre style="background: #f5f5f5; padding: 10px; border-radius: 4px; margin-top: 10px; font-size: 12px; overflow-x: auto;">{code}</pre>"#,
                r#"</details></div>"#,
            ),
            heading = self.heading,
            message = self.message,
            code = htmlize::escape_text(self.code.as_str()),
        )
    }
}

impl std::fmt::Display for TextPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.heading)?;
        writeln!(f, "{}", self.message)?;
        writeln!(f)?;
        f.write_str(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_escapes_code_but_keeps_it_verbatim() {
        let panel = TextPanel::new("flowchart TD\nsubgraph X\nA[<b>x</b>] --> B & C");
        let html = panel.to_html();
        assert!(html.contains("<summary style=\"cursor: pointer; color: #0066cc;\">View Original Code</summary>"));
        assert!(html.contains("A[&lt;b&gt;x&lt;/b&gt;] --&gt; B &amp; C"));
        assert!(html.contains("flowchart TD\nsubgraph X\n"));
    }

    #[test]
    fn plain_text_form_ends_with_code() {
        let panel = TextPanel::new("graph TD");
        assert_eq!(
            panel.to_string(),
            format!("{TEXT_FALLBACK_HEADING}\n{TEXT_FALLBACK_MESSAGE}\n\ngraph TD")
        );
    }
}
