use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use lox::{LoxError, Reporter};
use std::io::{self, Write};
use std::ops::Range;

/// Converts a byte span to a character span for ariadne, clamped to `source`.
fn byte_to_char_span(source: &str, byte_span: &Range<usize>) -> Range<usize> {
    let chars_before = |byte: usize| source.char_indices().take_while(|(i, _)| *i < byte).count();
    let start = chars_before(byte_span.start);
    let end = chars_before(byte_span.end).max(start);
    start..end
}

/// Where to point in `source`, if the error came from it. A runtime error
/// raised inside a function from an earlier REPL entry carries a span into
/// that older text.
fn label_span(error: &LoxError, source: &str) -> Option<Range<usize>> {
    let span = error.span()?;
    if let LoxError::Runtime { lexeme, .. } = error {
        if source.get(span.clone()) != Some(lexeme.as_str()) {
            return None;
        }
    }
    Some(span.clone())
}

/// Renders a LoxError with ariadne, quoting the offending source.
pub fn report_error<W: Write>(
    error: &LoxError,
    source: &str,
    filename: Option<&str>,
    mut writer: W,
) -> io::Result<()> {
    let Some(span) = label_span(error, source) else {
        return writeln!(writer, "{}", error);
    };

    let name = filename.unwrap_or("");
    let char_span = byte_to_char_span(source, &span);
    Report::build(ReportKind::Error, (name, char_span.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(error.to_string())
        .with_label(
            Label::new((name, char_span))
                .with_message(error.message())
                .with_color(Color::Red),
        )
        .finish()
        .write((name, Source::from(source)), &mut writer)
}

/// Renders every diagnostic collected while running `source`.
pub fn report_all<W: Write>(
    reporter: &Reporter,
    source: &str,
    filename: Option<&str>,
    mut writer: W,
) -> io::Result<()> {
    for error in reporter.diagnostics() {
        report_error(error, source, filename, &mut writer)?;
    }
    Ok(())
}
