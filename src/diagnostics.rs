use std::fmt;

use ariadne::{Color, Label, Report, ReportKind};

use crate::span::Span;
use crate::token::Token;

pub type DiagnosticReport<'a> = Report<'a, (&'a String, std::ops::Range<usize>)>;

/// The first syntax violation found in a document: what went wrong and where. Enclosing
/// productions add context with [`Diagnostic::wrap`], so the final message reads as a
/// breadcrumb trail down to the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub row: u32,
    pub col: u32,
    pub span: Span,
}

impl Diagnostic {
    /// A diagnostic anchored to `tok`'s position.
    pub fn at_token(message: impl Into<String>, tok: &Token) -> Self {
        Diagnostic {
            message: message.into(),
            row: tok.row,
            col: tok.col,
            span: tok.span,
        }
    }

    /// Prefix the enclosing production's context. The position stays that of the
    /// innermost cause.
    pub fn wrap(self, context: &str) -> Self {
        Diagnostic {
            message: format!("{context}: {}", self.message),
            ..self
        }
    }

    /// Render against the source text for terminal display.
    pub fn report<'a>(&self, path: &'a String) -> DiagnosticReport<'a> {
        Report::build(ReportKind::Error, path, self.span.lo)
            .with_message(&self.message)
            .with_label(
                Label::new((path, self.span.range()))
                    .with_message(format!("row {}, column {}", self.row, self.col))
                    .with_color(Color::Red),
            )
            .finish()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.row, self.col, self.message)
    }
}

impl std::error::Error for Diagnostic {}
