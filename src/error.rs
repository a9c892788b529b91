use ariadne::{Color, Label, Report, ReportKind};

use std::fmt::{self, Display, Formatter};
use std::ops::Range;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input does not match the grammar.
    Syntax,
    /// The input parses but means something ill-typed or unresolvable.
    Semantic,
}

/// A fatal diagnostic. Compilation stops at the first one; there is no
/// recovery or error collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Range<usize>,
}

impl CompileError {
    pub fn syntax(message: impl Into<String>, span: Range<usize>) -> Self {
        CompileError {
            kind: ErrorKind::Syntax,
            message: message.into(),
            span,
        }
    }

    pub fn semantic(message: impl Into<String>, span: Range<usize>) -> Self {
        CompileError {
            kind: ErrorKind::Semantic,
            message: message.into(),
            span,
        }
    }

    /// Plain-text excerpt: the offending line with a caret run under the
    /// span. Used where an ariadne report is too heavy (tests, logs).
    pub fn snippet(&self, source: &str) -> String {
        let start = self.span.start.min(source.len());
        let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = source[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(source.len());
        let line = &source[line_start..line_end];

        let dashes = "-".repeat(start - line_start);
        let width = self
            .span
            .len()
            .max(1)
            .min((line_end - start).max(1));
        let carets = "^".repeat(width);
        format!("\n{}\n{}{}\n{}", line, dashes, carets, self.message)
    }

    /// Builds the colored ariadne report for terminal output.
    pub fn report<'a>(&self, file: &'a str) -> Report<'a, (&'a str, Range<usize>)> {
        let (code, color) = match self.kind {
            ErrorKind::Syntax => ("syntax", Color::Red),
            ErrorKind::Semantic => ("semantic", Color::Yellow),
        };
        Report::build(ReportKind::Error, (file, self.span.clone()))
            .with_code(code)
            .with_message(&self.message)
            .with_label(
                Label::new((file, self.span.clone()))
                    .with_message(&self.message)
                    .with_color(color),
            )
            .finish()
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Semantic => "semantic error",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snippet_points_at_the_span() {
        let err = CompileError::syntax("Expected ';'", 4..5);
        assert_eq!(
            err.snippet("int x = 5"),
            "\nint x = 5\n----^\nExpected ';'"
        );
    }

    #[test]
    fn snippet_finds_the_right_line() {
        let err = CompileError::semantic("unknown variable name 'y'", 11..12);
        let source = "int x = 5;\ny = 1;";
        assert_eq!(
            err.snippet(source),
            "\ny = 1;\n^\nunknown variable name 'y'"
        );
    }

    #[test]
    fn snippet_clamps_spans_past_the_line() {
        let err = CompileError::syntax("unexpected end", 9..9);
        let out = err.snippet("int x = 5");
        assert!(out.contains("int x = 5"));
        assert!(out.ends_with("unexpected end"));
    }
}
