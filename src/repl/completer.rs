use std::cell::RefCell;

use rustyline::Context;
use rustyline::Helper;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;

use lox::{KEYWORDS, is_identifier_char};

/// Tab completion over keywords and the session's global names.
pub struct LoxHelper {
    variables: RefCell<Vec<String>>,
}

impl LoxHelper {
    pub fn new() -> Self {
        Self {
            variables: RefCell::new(Vec::new()),
        }
    }

    pub fn set_variables(&self, vars: Vec<String>) {
        *self.variables.borrow_mut() = vars;
    }

    /// Find the start position of the current word being typed
    fn find_word_start(line: &str, pos: usize) -> usize {
        line[..pos]
            .char_indices()
            .rev()
            .find(|(_, c)| !is_identifier_char(*c))
            .map_or(0, |(i, c)| i + c.len_utf8())
    }

    fn get_completions(prefix: &str, variables: &[String]) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }

        let mut completions: Vec<String> = KEYWORDS
            .keys()
            .filter(|keyword| keyword.starts_with(prefix))
            .map(|keyword| keyword.to_string())
            .chain(
                variables
                    .iter()
                    .filter(|var| var.starts_with(prefix))
                    .cloned(),
            )
            .collect();
        completions.sort();
        completions.dedup();
        completions
    }
}

impl Completer for LoxHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::find_word_start(line, pos);
        let variables = self.variables.borrow();
        let candidates = Self::get_completions(&line[start..pos], &variables)
            .into_iter()
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for LoxHelper {
    type Hint = String;
}

impl Highlighter for LoxHelper {}

impl Validator for LoxHelper {}

impl Helper for LoxHelper {}
