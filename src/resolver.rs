use std::collections::HashMap;

use log::debug;

use crate::INITIALIZER_NAME;
use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::reporter::Reporter;
use crate::token::Token;

/// Tracks function context for validation (return statements)
#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Tracks class context for validation (this/super usage)
#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Static pass between parsing and execution. Records, for every local
/// variable reference, how many scopes out its binding lives, and rejects
/// programs that misuse `return`, `this` or `super`.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    /// Innermost scope last. `false` while a name is declared but its
    /// initializer is still being resolved.
    scopes: Vec<HashMap<String, bool>>,
    /// Same bookkeeping for top-level declarations of this program.
    globals: HashMap<String, bool>,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: Vec::new(),
            globals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt], reporter: &mut Reporter) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        debug!(
            "resolved {} statements ({} errors)",
            statements.len(),
            self.errors.len()
        );

        for error in self.errors.drain(..) {
            reporter.report(error);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        match self.scopes.last_mut() {
            Some(scope) => {
                if scope.contains_key(&name.lexeme) {
                    self.errors.push(LoxError::resolution(
                        name,
                        format!("Already a variable named '{}' in this scope.", name.lexeme),
                    ));
                }
                scope.insert(name.lexeme.clone(), false);
            }
            None => {
                // Redeclaring a known global may read its old value.
                if !self.globals.contains_key(&name.lexeme)
                    && !self.interpreter.has_global(&name.lexeme)
                {
                    self.globals.insert(name.lexeme.clone(), false);
                }
            }
        }
    }

    fn define(&mut self, name: &Token) {
        let scope = self.scopes.last_mut().unwrap_or(&mut self.globals);
        scope.insert(name.lexeme.clone(), true);
    }

    /// Bind an implicit name (`this`, `super`) in the innermost scope.
    fn define_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, depth);
                return;
            }
        }
        // Not found: global, looked up dynamically at runtime.
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { statements } => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Function(declaration) => {
                if let Some(name) = &declaration.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(declaration, FunctionType::Function);
            }
            Stmt::Expression { expression } | Stmt::Print { expression } => {
                self.resolve_expr(expression);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.errors.push(LoxError::resolution(
                        keyword,
                        "Can't return from top-level code.",
                    ));
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(LoxError::resolution(
                            keyword,
                            "Can't return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable {
                name: superclass_name,
                ..
            } = superclass
                && superclass_name.lexeme == name.lexeme
            {
                self.errors.push(LoxError::resolution(
                    superclass_name,
                    "A class can't inherit from itself.",
                ));
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define_implicit("super");
        }

        self.begin_scope();
        self.define_implicit("this");

        for method in methods {
            let is_initializer = method
                .name
                .as_ref()
                .is_some_and(|n| n.lexeme == INITIALIZER_NAME);
            let function_type = if is_initializer {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, function_type);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = function_type;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable { id, name } => {
                let declared_not_defined = match self.scopes.last() {
                    Some(scope) => scope.get(&name.lexeme) == Some(&false),
                    None => self.globals.get(&name.lexeme) == Some(&false),
                };
                if declared_not_defined {
                    self.errors.push(LoxError::resolution(
                        name,
                        "Can't read local variable in its own initializer.",
                    ));
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Grouping { expression } => self.resolve_expr(expression),
            Expr::Literal { .. } => {}
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.errors.push(LoxError::resolution(
                        keyword,
                        "Can't use 'this' outside of a class.",
                    ));
                    return;
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.errors.push(LoxError::resolution(
                            keyword,
                            "Can't use 'super' outside of a class.",
                        ));
                        return;
                    }
                    ClassType::Class => {
                        self.errors.push(LoxError::resolution(
                            keyword,
                            "Can't use 'super' in a class with no superclass.",
                        ));
                        return;
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Function(declaration) => {
                self.resolve_function(declaration, FunctionType::Function);
            }
        }
    }
}
