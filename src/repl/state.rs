use lox::{KEYWORDS, TokenType};

/// Keywords that can only start a statement, never a bare expression.
const STATEMENT_KEYWORDS: &[TokenType] = &[
    TokenType::Class,
    TokenType::Else,
    TokenType::For,
    TokenType::Fun,
    TokenType::If,
    TokenType::Print,
    TokenType::Return,
    TokenType::Var,
    TokenType::While,
];

/// Multi-line input buffering for the REPL.
pub struct ReplState {
    buffer: String,
    brace_depth: usize,
}

impl ReplState {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            brace_depth: 0,
        }
    }

    pub fn prompt(&self) -> String {
        if self.brace_depth == 0 {
            "> ".to_string()
        } else {
            format!("..{} ", self.brace_depth)
        }
    }

    /// Returns true if ready to execute (braces balanced)
    pub fn process_line(&mut self, line: &str) -> bool {
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = self.brace_depth.saturating_sub(1),
                _ => {}
            }
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');

        self.brace_depth == 0
    }

    pub fn take_buffer(&mut self) -> String {
        self.brace_depth = 0;
        std::mem::take(&mut self.buffer)
    }

    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.brace_depth = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// A bare expression: no trailing `;` or `}`, and not a statement keyword.
    pub fn should_auto_print(input: &str) -> bool {
        let trimmed = input.trim();

        let code = match trimmed.find("//") {
            Some(idx) => trimmed[..idx].trim(),
            None => trimmed,
        };

        if code.is_empty() || code.ends_with(';') || code.ends_with('}') {
            return false;
        }

        let first_word: String = code
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        !KEYWORDS
            .get(first_word.as_str())
            .is_some_and(|token_type| STATEMENT_KEYWORDS.contains(token_type))
    }

    pub fn wrap_for_print(input: &str) -> String {
        format!("print {};", input.trim())
    }
}
