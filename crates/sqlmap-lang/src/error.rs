//! Template parse errors.

use std::fmt;

use thiserror::Error;

use crate::span::Span;

/// A template that could not be parsed.
///
/// Displays as the bare message; [`ParseError::format_with_source`] renders
/// the offending line with the span underlined.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// Suggested fix, shown under the rendered source line.
    pub hint: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render against the template the error came from.
    pub fn format_with_source(&self, source: &str) -> String {
        let at = self.span.location(source);
        let mut out = format!("template error: {}\n  --> line {}\n", self.message, at);

        if let Some(text) = source.lines().nth(at.line - 1) {
            let gutter = at.line.to_string().len();
            let width = text.chars().count().saturating_sub(at.column - 1);
            let marks = self.span.len().clamp(1, width.max(1));
            out.push_str(&format!("{:gutter$} |\n", ""));
            out.push_str(&format!("{} | {}\n", at.line, text));
            out.push_str(&format!(
                "{:gutter$} | {}{}\n",
                "",
                " ".repeat(at.column - 1),
                "^".repeat(marks)
            ));
        }

        if let Some(hint) = &self.hint {
            out.push_str(&format!("  = hint: {}\n", hint));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_with_source_underlines_span() {
        let source = "SELECT * FROM t <isNull prop=\"x\">";
        let err = ParseError::new("unknown attribute 'prop' on <isNull>", Span::new(24, 28))
            .with_hint("did you mean 'property'?");

        let formatted = err.format_with_source(source);
        assert!(formatted.starts_with("template error: unknown attribute 'prop'"));
        assert!(formatted.contains("--> line 1:25"));
        assert!(formatted.contains(&format!("  | {}^^^^\n", " ".repeat(24))));
        assert!(formatted.contains("= hint: did you mean 'property'?"));
        assert_eq!(err.to_string(), "unknown attribute 'prop' on <isNull>");
    }

    #[test]
    fn test_error_at_end_of_input() {
        let source = "SELECT <dynamic>";
        let err = ParseError::new("unexpected end of template", Span::at(source.len()));
        let formatted = err.format_with_source(source);
        assert!(formatted.contains("line 1:17"));
        assert!(formatted.ends_with("^\n"));
    }
}
