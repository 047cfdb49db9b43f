//! Error accumulator shared by every stage of the pipeline.
//!
//! Each stage reports into the same [`Reporter`] and keeps going; the driver
//! inspects [`Reporter::had_error`] after each stage to decide whether to
//! continue, and [`Reporter::had_runtime_error`] to pick an exit code.
//! Rendering is left to the caller.

use log::info;

use crate::error::LoxError;
use crate::scanner::Line;

#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<LoxError>,
    lines: Vec<Line>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: LoxError) {
        info!("reported: {}", error);
        // Output failures while running count as runtime errors.
        if error.is_static() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }
        self.diagnostics.push(error);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn is_clean(&self) -> bool {
        !self.had_error && !self.had_runtime_error
    }

    pub fn diagnostics(&self) -> &[LoxError] {
        &self.diagnostics
    }

    pub fn reset(&mut self) {
        self.diagnostics.clear();
        self.lines.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Keep the scanner's line records so diagnostics can quote the source.
    pub fn record_lines(&mut self, lines: Vec<Line>) {
        self.lines = lines;
    }

    pub fn line(&self, number: usize) -> Option<&Line> {
        self.lines.iter().find(|line| line.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenType};

    fn line(number: usize, content: &str) -> Line {
        Line {
            number,
            start: 0,
            end: content.len(),
            content: content.to_string(),
        }
    }

    #[test]
    fn new_reporter_is_clean() {
        let reporter = Reporter::new();
        assert!(reporter.is_clean());
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn static_errors_set_had_error() {
        let mut reporter = Reporter::new();
        reporter.report(LoxError::scan(1, 0..1, "Unexpected character."));
        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }

    #[test]
    fn runtime_errors_set_had_runtime_error_only() {
        let mut reporter = Reporter::new();
        let token = Token::new(TokenType::Minus, "-", 1, 0..1);
        reporter.report(LoxError::runtime(&token, "Operand must be a number."));
        assert!(!reporter.had_error());
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn reports_accumulate() {
        let mut reporter = Reporter::new();
        reporter.report(LoxError::scan(1, 0..1, "Unexpected character."));
        reporter.report(LoxError::scan(2, 4..9, "Unterminated string."));
        assert_eq!(reporter.diagnostics().len(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut reporter = Reporter::new();
        reporter.report(LoxError::scan(1, 0..1, "Unexpected character."));
        reporter.reset();
        assert!(reporter.is_clean());
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn output_failures_count_as_runtime_errors() {
        let mut reporter = Reporter::new();
        reporter.report(LoxError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "closed",
        )));
        assert!(!reporter.had_error());
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn keeps_line_records_by_number() {
        let mut reporter = Reporter::new();
        reporter.record_lines(vec![line(1, "var a = 1;"), line(2, "print @;")]);
        assert_eq!(reporter.line(2).map(|l| l.content.as_str()), Some("print @;"));
        assert!(reporter.line(3).is_none());

        reporter.reset();
        assert!(reporter.line(1).is_none());
    }
}
