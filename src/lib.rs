//! A tree-walking interpreter for Lox.
//!
//! Source runs through four stages that share one [`Reporter`]: the
//! [`Scanner`] produces tokens, the [`Parser`] builds statements, the
//! [`Resolver`] binds local variables to scope distances, and the
//! [`Interpreter`] executes. [`Lox`] wires them together and keeps
//! interpreter state alive between runs, which is what the REPL needs.

pub mod ast;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod reporter;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;

use log::info;

pub use error::LoxError;
pub use interpreter::Interpreter;
pub use parser::Parser;
pub use reporter::Reporter;
pub use resolver::Resolver;
pub use scanner::{KEYWORDS, Line, Scanner, is_identifier_char, is_identifier_start};
pub use token::{Literal, Token, TokenType};
pub use value::Value;

/// Name of the method run when a class is called.
pub const INITIALIZER_NAME: &str = "init";

/// One interpreter session: a global environment, its resolution table,
/// and the expression-id counter that keeps ids unique across runs.
pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
            next_id: 0,
        }
    }

    /// Names currently bound in the global environment.
    pub fn variable_names(&self) -> Vec<String> {
        self.interpreter.global_names()
    }

    /// Run `source` against this session, writing `print` output to
    /// `stdout`. Nothing executes if scanning, parsing or resolution
    /// reported an error. The returned reporter holds every diagnostic.
    pub fn run<O: Write>(&mut self, source: &str, mut stdout: O) -> Reporter {
        let mut reporter = Reporter::new();

        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens(&mut reporter);
        reporter.record_lines(scanner.take_lines());

        let mut parser = Parser::with_first_id(tokens, self.next_id);
        let statements = parser.parse(&mut reporter);
        self.next_id = parser.next_id();

        if reporter.had_error() {
            info!("skipping execution after syntax errors");
            return reporter;
        }

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut reporter);

        if reporter.had_error() {
            info!("skipping execution after resolution errors");
            return reporter;
        }

        self.interpreter
            .interpret(&statements, &mut stdout, &mut reporter);
        reporter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lox: &mut Lox, source: &str) -> (String, Reporter) {
        let mut output = Vec::new();
        let reporter = lox.run(source, &mut output);
        (String::from_utf8(output).unwrap(), reporter)
    }

    #[test]
    fn run_empty_source_succeeds() {
        let mut lox = Lox::new();
        let (out, reporter) = run(&mut lox, "");
        assert!(out.is_empty());
        assert!(reporter.is_clean());
    }

    #[test]
    fn run_prints_output() {
        let mut lox = Lox::new();
        let (out, _) = run(&mut lox, "print 1 + 2;");
        assert_eq!(out, "3\n");
    }

    #[test]
    fn scan_error_prevents_execution() {
        let mut lox = Lox::new();
        let (out, reporter) = run(&mut lox, "print 1; @");
        assert!(out.is_empty());
        assert!(reporter.had_error());
    }

    #[test]
    fn parse_error_prevents_execution() {
        let mut lox = Lox::new();
        let (out, reporter) = run(&mut lox, "print 1; print ;");
        assert!(out.is_empty());
        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }

    #[test]
    fn resolution_error_prevents_execution() {
        let mut lox = Lox::new();
        let (out, reporter) = run(&mut lox, "print 1; return 2;");
        assert!(out.is_empty());
        assert!(matches!(
            reporter.diagnostics(),
            [LoxError::Resolution { .. }]
        ));
    }

    #[test]
    fn runtime_error_stops_after_partial_output() {
        let mut lox = Lox::new();
        let (out, reporter) = run(&mut lox, "print 1; print -\"a\"; print 2;");
        assert_eq!(out, "1\n");
        assert!(reporter.had_runtime_error());
        assert!(!reporter.had_error());
    }

    #[test]
    fn state_persists_between_runs() {
        let mut lox = Lox::new();
        run(&mut lox, "var a = 1; fun get() { return a; }");
        let (out, _) = run(&mut lox, "a = a + 1; print get();");
        assert_eq!(out, "2\n");
        assert_eq!(lox.variable_names(), vec!["a".to_string(), "get".to_string()]);
    }

    #[test]
    fn locals_resolved_in_earlier_runs_stay_correct() {
        let mut lox = Lox::new();
        run(
            &mut lox,
            "fun make() { var x = \"captured\"; fun show() { print x; } return show; } var show = make();",
        );
        // The second run's ids must not collide with the first run's.
        let (out, reporter) = run(&mut lox, "var x = \"global\"; { var y = 1; show(); }");
        assert!(reporter.is_clean());
        assert_eq!(out, "captured\n");
    }

    #[test]
    fn failed_run_keeps_session_usable() {
        let mut lox = Lox::new();
        let (_, reporter) = run(&mut lox, "var a = 1; print nope;");
        assert!(reporter.had_runtime_error());
        let (out, reporter) = run(&mut lox, "print a;");
        assert!(reporter.is_clean());
        assert_eq!(out, "1\n");
    }

    #[test]
    fn sessions_are_isolated() {
        let mut first = Lox::new();
        let mut second = Lox::new();
        run(&mut first, "var only_here = 1;");
        let (_, reporter) = run(&mut second, "print only_here;");
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn reporter_keeps_offending_line_and_span() {
        let mut lox = Lox::new();
        let (_, reporter) = run(&mut lox, "var a = 1;\nprint a +;");
        let error = &reporter.diagnostics()[0];
        assert_eq!(error.to_string(), "[line 2] Error at ';': Expect expression.");
        assert_eq!(error.span(), Some(&(20..21)));
        assert_eq!(reporter.line(2).map(|l| l.content.as_str()), Some("print a +;"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_print_is_a_runtime_error() {
        let mut lox = Lox::new();
        let reporter = lox.run("print 1;", ClosedPipe);
        assert!(!reporter.had_error());
        assert!(reporter.had_runtime_error());
        assert!(matches!(reporter.diagnostics(), [LoxError::Io(_)]));
    }
}
