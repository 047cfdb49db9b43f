use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxError;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Whether this scope itself (not its parents) binds `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Value bound in this scope only.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Names bound in this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn enclosing(&self) -> Option<Rc<RefCell<Environment>>> {
        self.enclosing.clone()
    }

    /// Look `name` up here, then outward through the chain.
    pub fn get(&self, name: &Token) -> Result<Value, LoxError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(undefined(name))
    }

    /// Rebind the nearest existing `name`; never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), LoxError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(undefined(name))
    }

    /// The scope exactly `distance` hops out from `env`.
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let next = current.borrow().enclosing()?;
            current = next;
        }
        Some(current)
    }

    /// Read `name` from the scope `distance` hops out, without walking further.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
    ) -> Result<Value, LoxError> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let value = scope.borrow().get_local(&name.lexeme);
        value.ok_or_else(|| undefined(name))
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<(), LoxError> {
        let scope = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut scope = scope.borrow_mut();
        match scope.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::Identifier, name, 1, 0..name.len())
    }

    fn shared(env: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(env))
    }

    #[test]
    fn define_and_get_variable() {
        let mut env = Environment::new();
        env.define("x", Value::Number(42.0));
        assert_eq!(env.get(&ident("x")).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn get_undefined_variable_returns_error() {
        let env = Environment::new();
        let err = env.get(&ident("missing")).unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 1]");
    }

    #[test]
    fn redefine_overwrites_in_same_scope() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0));
        env.define("x", Value::Number(2.0));
        assert_eq!(env.get(&ident("x")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn assign_updates_existing_variable() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0));
        env.assign(&ident("x"), Value::Bool(true)).unwrap();
        assert_eq!(env.get(&ident("x")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn assign_never_creates_binding() {
        let mut env = Environment::new();
        assert!(env.assign(&ident("x"), Value::Nil).is_err());
        assert!(!env.contains("x"));
    }

    #[test]
    fn get_walks_enclosing_chain() {
        let global = shared(Environment::new());
        global.borrow_mut().define("x", Value::Number(1.0));
        let local = Environment::with_enclosing(Rc::clone(&global));
        assert_eq!(local.get(&ident("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_reaches_enclosing_scope() {
        let global = shared(Environment::new());
        global.borrow_mut().define("x", Value::Number(1.0));
        let mut local = Environment::with_enclosing(Rc::clone(&global));
        local.assign(&ident("x"), Value::Number(5.0)).unwrap();
        assert_eq!(global.borrow().get(&ident("x")).unwrap(), Value::Number(5.0));
        assert!(!local.contains("x"));
    }

    #[test]
    fn shadowing_leaves_outer_binding_alone() {
        let global = shared(Environment::new());
        global.borrow_mut().define("x", Value::Number(1.0));
        let mut local = Environment::with_enclosing(Rc::clone(&global));
        local.define("x", Value::Number(2.0));
        assert_eq!(local.get(&ident("x")).unwrap(), Value::Number(2.0));
        assert_eq!(global.borrow().get(&ident("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn names_lists_only_this_scope_sorted() {
        let global = shared(Environment::new());
        global.borrow_mut().define("outer", Value::Nil);
        let mut local = Environment::with_enclosing(Rc::clone(&global));
        local.define("b", Value::Nil);
        local.define("a", Value::Nil);
        assert_eq!(local.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn ancestor_hops_exact_distance() {
        let global = shared(Environment::new());
        let middle = shared(Environment::with_enclosing(Rc::clone(&global)));
        let inner = shared(Environment::with_enclosing(Rc::clone(&middle)));

        let found = Environment::ancestor(&inner, 2).unwrap();
        assert!(Rc::ptr_eq(&found, &global));
        assert!(Environment::ancestor(&inner, 3).is_none());
    }

    #[test]
    fn get_at_does_not_walk_past_target_scope() {
        let global = shared(Environment::new());
        global.borrow_mut().define("x", Value::Number(1.0));
        let inner = shared(Environment::with_enclosing(Rc::clone(&global)));
        inner.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("x")).unwrap(),
            Value::Number(1.0)
        );
        assert_eq!(
            Environment::get_at(&inner, 0, &ident("x")).unwrap(),
            Value::Number(2.0)
        );
        assert!(Environment::get_at(&inner, 0, &ident("y")).is_err());
    }

    #[test]
    fn assign_at_targets_one_scope() {
        let global = shared(Environment::new());
        global.borrow_mut().define("x", Value::Number(1.0));
        let inner = shared(Environment::with_enclosing(Rc::clone(&global)));
        inner.borrow_mut().define("x", Value::Number(2.0));

        Environment::assign_at(&inner, 1, &ident("x"), Value::Number(9.0)).unwrap();
        assert_eq!(global.borrow().get(&ident("x")).unwrap(), Value::Number(9.0));
        assert_eq!(inner.borrow().get(&ident("x")).unwrap(), Value::Number(2.0));
    }
}
