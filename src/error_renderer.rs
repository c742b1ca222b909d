//! Beautiful error rendering using ariadne
//!
//! Renders engine errors with source snippets, labels for related
//! locations and help notes.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, IndexType, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error with beautiful formatting to stderr
///
/// # Example
/// ```no_run
/// use exprel::{Engine, EngineOptions, render_error};
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
/// if let Err(e) = engine.compile("1 + true") {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
///
/// This is useful when you want to control where the error is written,
/// such as to a file, a buffer, or a custom output stream.
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for tests, web UIs, etc.)
///
/// # Example
/// ```
/// use exprel::{Engine, EngineOptions, render_error_to_string};
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
/// let err = engine.compile("1 + true").unwrap_err();
/// assert!(render_error_to_string(&err).contains("1 + true"));
/// ```
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
///
/// This is the same as `render_error_to_string` but without ANSI color codes,
/// making the output easier to compare in tests.
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation {
            diagnostics,
            source,
        } => render_diagnostics(source.content(), diagnostics, writer, use_color),
        Error::Runtime { diagnostic, source } | Error::ResourceExceeded { diagnostic, source } => {
            render_diagnostics(source.content(), std::slice::from_ref(diagnostic), writer, use_color)
        }
        Error::Api(msg) => {
            writeln!(writer, "API error: {}", msg)
        }
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let mut report = Report::build(kind, ("<expr>", diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(
                ariadne::Config::default()
                    .with_color(use_color)
                    .with_index_type(IndexType::Byte),
            );

        // Add error code if present
        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        // Primary label with the main error span
        let color = colors.next();
        report = report.with_label(
            Label::new(("<expr>", diag.span.0.clone()))
                .with_message(&diag.message)
                .with_color(color),
        );

        // Related info as secondary labels (shows context breadcrumbs!)
        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new(("<expr>", related.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        // Help text as notes
        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        // Render to the writer (need to reborrow to avoid moving)
        report.finish().write(("<expr>", Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, EngineOptions, ErrorKind, ExecutionOptions};

    fn engine() -> Engine {
        Engine::new(EngineOptions::default(), |env| env.register("name", "ada"))
    }

    #[test]
    fn test_render_parse_error() {
        let err = engine().compile("1 + + ").unwrap_err();
        let output = render_error_to_string_no_color(&err);
        assert!(output.contains("Error"));
        assert!(output.contains("1 + + "));
        assert!(output.contains("P0"));
    }

    #[test]
    fn test_render_type_error_with_code() {
        let err = engine().compile("name * 2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        let output = render_error_to_string_no_color(&err);
        assert!(output.contains("E0"));
        assert!(output.contains("name * 2"));
    }

    #[test]
    fn test_render_runtime_error_points_into_source() {
        let err = engine().compile("[1, 2][5]").unwrap().run().unwrap_err();
        let output = render_error_to_string_no_color(&err);
        assert!(output.contains("R0"));
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_resource_error() {
        let expr = engine().compile("1..1000").unwrap();
        let err = expr
            .run_with(&ExecutionOptions {
                memory_budget: 10,
                ..Default::default()
            })
            .unwrap_err();
        let output = render_error_to_string_no_color(&err);
        assert!(output.contains("memory budget exceeded"));
    }

    #[test]
    fn test_render_multibyte_source() {
        let err = engine().compile("'ü' + name + (").unwrap_err();
        let output = render_error_to_string_no_color(&err);
        assert!(output.contains("'ü' + name + ("));
    }

    #[test]
    fn test_render_api_error() {
        let err = crate::Error::Api("unknown function foo".into());
        assert_eq!(
            render_error_to_string_no_color(&err),
            "API error: unknown function foo\n"
        );
    }
}
