//! Diagnostic rendering
//!
//! Fatal errors and deprecation warnings share one channel. The plain
//! renderer produces the `path:line.col-line.col: message` form the
//! build logs expect; when a document embeds its source text the rich
//! renderer shows labeled codespan snippets instead.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};
use serde::Serialize;

use crate::error::{Location, SemaError};
use ridl_ast::FileId;

/// A non-fatal, source-located warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub message: String,
    #[serde(skip)]
    pub loc: Location,
}

/// JSON representation of one warning.
#[derive(Debug, Serialize)]
struct JsonWarning {
    severity: &'static str,
    location: String,
    message: String,
}

/// File store plus collected warnings for one compilation.
pub struct Diagnostics {
    files: SimpleFiles<String, String>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics {
            files: SimpleFiles::new(),
            warnings: Vec::new(),
        }
    }

    /// Register a source file; pass empty text when the front-end did
    /// not embed it.
    pub fn add_file(&mut self, name: impl Into<String>, text: impl Into<String>) -> FileId {
        self.files.add(name.into(), text.into())
    }

    pub fn file_name(&self, id: FileId) -> String {
        self.files
            .get(id)
            .map(|f| f.name().clone())
            .unwrap_or_else(|_| "<unknown>".to_string())
    }

    fn has_text(&self, id: FileId) -> bool {
        self.files
            .get(id)
            .map(|f| !f.source().is_empty())
            .unwrap_or(false)
    }

    pub fn warning(&mut self, loc: Location, message: impl Into<String>) {
        self.warnings.push(Warning {
            message: message.into(),
            loc,
        });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// `path:line.col-line.col`
    pub fn location_string(&self, loc: Location) -> String {
        let span = loc.span;
        format!(
            "{}:{}.{}-{}.{}",
            self.file_name(loc.file),
            span.first_line,
            span.first_column,
            span.last_line,
            span.last_column
        )
    }

    /// `path:line.col-line.col: message`
    pub fn render(&self, loc: Location, message: &str) -> String {
        format!("{}: {}", self.location_string(loc), message)
    }

    pub fn render_error(&self, error: &SemaError) -> String {
        self.render(error.location(), &error.to_string())
    }

    /// Emit a fatal error to stderr, with a source snippet when the
    /// file's text is available.
    pub fn emit_error(&self, error: &SemaError) {
        let loc = error.location();
        if self.has_text(loc.file) {
            let diagnostic = CsDiagnostic::new(Severity::Error)
                .with_message(error.to_string())
                .with_labels(vec![Label::primary(
                    loc.file,
                    loc.span.start as usize..loc.span.end as usize,
                )]);
            let mut writer = StandardStream::stderr(ColorChoice::Auto);
            let config = term::Config::default();
            let _ = term::emit(&mut writer, &config, &self.files, &diagnostic);
        } else {
            eprintln!("{}", self.render_error(error));
        }
    }

    /// JSON view of the collected warnings, for IDE integration.
    pub fn warnings_json(&self) -> Result<String, serde_json::Error> {
        let entries: Vec<JsonWarning> = self
            .warnings
            .iter()
            .map(|warning| JsonWarning {
                severity: "warning",
                location: self.location_string(warning.loc),
                message: warning.message.clone(),
            })
            .collect();
        serde_json::to_string_pretty(&entries)
    }

    /// Emit all collected warnings.
    pub fn emit_warnings(&self, writer: &mut dyn WriteColor) -> std::io::Result<()> {
        use std::io::Write;
        use termcolor::{Color, ColorSpec};
        for warning in &self.warnings {
            writer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            write!(writer, "warning")?;
            writer.reset()?;
            writeln!(writer, ": {}", self.render(warning.loc, &warning.message))?;
        }
        Ok(())
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_ast::Span;

    #[test]
    fn test_render_plain_location_format() {
        let mut diags = Diagnostics::new();
        let file = diags.add_file("dom.idl", "");
        let loc = Location {
            file,
            span: Span {
                start: 0,
                end: 4,
                first_line: 3,
                first_column: 5,
                last_line: 3,
                last_column: 9,
            },
        };
        assert_eq!(
            diags.render(loc, "could not resolve `Node`"),
            "dom.idl:3.5-3.9: could not resolve `Node`"
        );
    }

    #[test]
    fn test_warnings_accumulate() {
        let mut diags = Diagnostics::new();
        let file = diags.add_file("dom.idl", "");
        let loc = Location {
            file,
            span: Span::default(),
        };
        diags.warning(loc, "deprecated extended attribute `IndexGetter`");
        diags.warning(loc, "deprecated extended attribute `Null`");
        assert_eq!(diags.warnings().len(), 2);
    }
}
