use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, trace};

use crate::INITIALIZER_NAME;
use crate::ast::{Expr, ExprId, Stmt};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::reporter::Reporter;
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, Value};

/// Why statement execution stopped early: a `return` travelling up to its
/// call site, or a genuine runtime error travelling up to `interpret`.
#[derive(Debug)]
enum Unwind {
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(error: LoxError) -> Self {
        Unwind::Error(error)
    }
}

impl From<std::io::Error> for Unwind {
    fn from(error: std::io::Error) -> Self {
        Unwind::Error(LoxError::Io(error))
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Record that the variable expression `id` lives `depth` scopes out.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        trace!("resolved {} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Scope distance recorded for `id`; `None` means a global lookup.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.borrow().contains(name)
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names()
    }

    /// Run `statements` in order. The first runtime error is reported and
    /// stops the run; bindings made before it stay in place.
    pub fn interpret(
        &mut self,
        statements: &[Stmt],
        output: &mut dyn Write,
        reporter: &mut Reporter,
    ) {
        debug!("interpreting {} statements", statements.len());
        for stmt in statements {
            match self.execute(stmt, output) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => {
                    reporter.report(error);
                    return;
                }
                // Rejected statically; nothing to unwind to.
                Err(Unwind::Return(_)) => return,
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt, output: &mut dyn Write) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression { expression } => {
                self.evaluate(expression, output)?;
                Ok(())
            }
            Stmt::Print { expression } => {
                let value = self.evaluate(expression, output)?;
                writeln!(output, "{}", value)?;
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, output)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }
            Stmt::Block { statements } => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, env, output)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, output)?.is_truthy() {
                    self.execute(then_branch, output)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, output)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition, output)?.is_truthy() {
                    self.execute(body, output)?;
                }
                Ok(())
            }
            Stmt::Function(declaration) => {
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                let name = function.name().unwrap_or_default().to_string();
                self.environment
                    .borrow_mut()
                    .define(&name, Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, output)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods, output),
        }
    }

    /// Run `statements` in `env`, putting the previous scope back afterwards
    /// however the block exits.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Environment,
        output: &mut dyn Write,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, Rc::new(RefCell::new(env)));

        let result = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt, output));

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::ast::FunctionDecl>],
        output: &mut dyn Write,
    ) -> Result<(), Unwind> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr, output)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime(token, "Superclass must be a class.").into());
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra scope holding `super`.
        let previous = superclass.as_ref().map(|superclass| {
            let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
            env.define("super", Value::Class(Rc::clone(superclass)));
            std::mem::replace(&mut self.environment, Rc::new(RefCell::new(env)))
        });

        let methods = methods
            .iter()
            .map(|declaration| {
                let method_name = declaration
                    .name
                    .as_ref()
                    .map(|t| t.lexeme.clone())
                    .unwrap_or_default();
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    method_name == INITIALIZER_NAME,
                );
                (method_name, Rc::new(function))
            })
            .collect();

        let class = Class {
            name: name.lexeme.clone(),
            superclass,
            methods,
        };
        debug!(
            "defined class {} with {} methods",
            class.name,
            class.methods.len()
        );

        if let Some(previous) = previous {
            self.environment = previous;
        }

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr, output: &mut dyn Write) -> Result<Value, LoxError> {
        match expr {
            Expr::Literal { value } => Ok(value.clone().into()),
            Expr::Grouping { expression } => self.evaluate(expression, output),
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right, output)?;
                match operator.token_type {
                    TokenType::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Unknown unary operator.")),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, output)?;
                let right = self.evaluate(right, output)?;
                binary(operator, left, right)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, output)?;
                let short_circuits = match operator.token_type {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right, output)
                }
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value, output)?;
                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee, output)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument, output)?);
                }
                self.call(callee, paren, args, output)
            }
            Expr::Get { object, name } => match self.evaluate(object, output)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },
            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object, output)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };
                let value = self.evaluate(value, output)?;
                instance.set(name, value.clone());
                Ok(value)
            }
            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
            Expr::Super {
                id,
                keyword,
                method,
            } => self.super_method(*id, keyword, method),
            Expr::Function(declaration) => Ok(Value::Function(Rc::new(Function::new(
                Rc::clone(declaration),
                Rc::clone(&self.environment),
                false,
            )))),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, LoxError> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super` sits `distance` scopes out; the bound `this` one scope closer.
    fn super_method(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value, LoxError> {
        let distance = self.locals.get(&id).copied().unwrap_or(0);

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(LoxError::runtime(keyword, "Superclass must be a class."));
        };

        let this = Token::new(
            TokenType::This,
            "this",
            keyword.line,
            keyword.span.clone(),
        );
        let Value::Instance(instance) =
            Environment::get_at(&self.environment, distance.saturating_sub(1), &this)?
        else {
            return Err(LoxError::runtime(keyword, "Can't use 'super' outside of a class."));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn call(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: Vec<Value>,
        output: &mut dyn Write,
    ) -> Result<Value, LoxError> {
        match callee {
            Value::Function(function) => {
                check_arity(paren, function.arity(), arguments.len())?;
                self.call_function(&function, arguments, output)
            }
            Value::Class(class) => {
                check_arity(paren, class.arity(), arguments.len())?;
                let instance = Rc::new(Instance::new(Rc::clone(&class)));
                if let Some(initializer) = class.find_method(INITIALIZER_NAME) {
                    let bound = initializer.bind(Rc::clone(&instance));
                    self.call_function(&bound, arguments, output)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        arguments: Vec<Value>,
        output: &mut dyn Write,
    ) -> Result<Value, LoxError> {
        trace!("calling {}", function);

        let mut env = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            env.define(&param.lexeme, argument);
        }

        let returned = match self.execute_block(&function.declaration.body, env, output) {
            Ok(()) => Value::Nil,
            Err(Unwind::Return(value)) => value,
            Err(Unwind::Error(error)) => return Err(error),
        };

        if function.is_initializer {
            return Ok(function
                .closure
                .borrow()
                .get_local("this")
                .unwrap_or(Value::Nil));
        }
        Ok(returned)
    }
}

fn check_arity(paren: &Token, expected: usize, got: usize) -> Result<(), LoxError> {
    if expected == got {
        return Ok(());
    }
    Err(LoxError::runtime(
        paren,
        format!("Expected {} arguments but got {}.", expected, got),
    ))
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    match operator.token_type {
        TokenType::EqualEqual => Ok(Value::Bool(left == right)),
        TokenType::BangEqual => Ok(Value::Bool(left != right)),
        TokenType::Plus => {
            if left.type_name() != right.type_name() {
                return Err(LoxError::runtime(operator, "Operands must be the same type."));
            }
            match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be strings or numbers.",
                )),
            }
        }
        _ => {
            let (Value::Number(a), Value::Number(b)) = (left, right) else {
                return Err(LoxError::runtime(operator, "Operands must be numbers."));
            };
            match operator.token_type {
                TokenType::Minus => Ok(Value::Number(a - b)),
                TokenType::Slash => Ok(Value::Number(a / b)),
                TokenType::Star => Ok(Value::Number(a * b)),
                TokenType::Greater => Ok(Value::Bool(a > b)),
                TokenType::GreaterEqual => Ok(Value::Bool(a >= b)),
                TokenType::Less => Ok(Value::Bool(a < b)),
                TokenType::LessEqual => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(operator, "Unknown binary operator.")),
            }
        }
    }
}
