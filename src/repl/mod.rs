mod completer;
mod state;

use std::io;

use log::{error, warn};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use lox::Lox;

use crate::report;

use completer::LoxHelper;
use state::ReplState;

/// Read lines until Ctrl-D (or Ctrl-C on an empty buffer), running each
/// complete chunk against the same session.
pub fn run(lox: &mut Lox) -> rustyline::Result<()> {
    let mut rl: Editor<LoxHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(LoxHelper::new()));
    let mut state = ReplState::new();

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                if let Err(e) = rl.add_history_entry(&line) {
                    warn!("could not record history: {}", e);
                }

                if !state.process_line(&line) {
                    continue;
                }

                let buffer = state.take_buffer();
                let source = if ReplState::should_auto_print(&buffer) {
                    ReplState::wrap_for_print(&buffer)
                } else {
                    buffer
                };

                let reporter = lox.run(&source, io::stdout());
                if let Err(e) = report::report_all(&reporter, &source, None, io::stderr()) {
                    error!("could not write diagnostics: {}", e);
                }

                if let Some(helper) = rl.helper() {
                    helper.set_variables(lox.variable_names());
                }
            }
            Err(ReadlineError::Interrupted) => {
                if state.is_empty() {
                    break;
                }
                state.cancel();
                println!();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
