//! Tree-walking evaluator.
//!
//! Locals are read through the resolver's `(distance, slot)` addresses; any
//! reference without an address is a global and is looked up by name in a
//! map that outlives individual runs, so a REPL session keeps its
//! definitions. `return` travels back up as [`Flow::Return`], never as an
//! error.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::diagnostics::Diagnostics;
use crate::environment::{EnvRef, Environment};
use crate::error::{KixError, Result};
use crate::resolver::Locals;
use crate::token::{LiteralValue, Token, TokenType};
use crate::value::{round_half_up, KixFunction, Value};

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fall through to the next statement.
    Normal,

    /// A `return` is unwinding to the nearest call.
    Return(Value),
}

pub struct Interpreter {
    globals: HashMap<String, Value>,
    /// `None` while executing at global scope.
    environment: Option<EnvRef>,
    locals: Locals,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter writing program output to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter writing program output to `out`. Built-ins are bound
    /// into the global scope here.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut globals: HashMap<String, Value> = HashMap::new();

        globals.insert(
            "clock".to_string(),
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: |_out, _args| {
                    let millis = chrono::Utc::now().timestamp_millis();
                    trace!("Native function 'clock' returned: {}", millis);
                    Ok(Value::Number(millis as f64))
                },
            },
        );

        // Single-argument only; there is no variadic call support.
        globals.insert(
            "print".to_string(),
            Value::NativeFunction {
                name: "print",
                arity: 1,
                func: |out, args| {
                    if let Some(value) = args.first() {
                        write!(out, "{}", value).map_err(|e| e.to_string())?;
                    }
                    Ok(Value::Nil)
                },
            },
        );

        globals.insert(
            "println".to_string(),
            Value::NativeFunction {
                name: "println",
                arity: 1,
                func: |out, args| {
                    if let Some(value) = args.first() {
                        writeln!(out, "{}", value).map_err(|e| e.to_string())?;
                    }
                    Ok(Value::Nil)
                },
            },
        );

        Self {
            globals,
            environment: None,
            locals: Locals::new(),
            out,
        }
    }

    /// Merge addresses computed by the resolver for the next run.
    pub fn extend_locals(&mut self, locals: Locals) {
        debug!("Adding {} resolved locals", locals.len());
        self.locals.extend(locals);
    }

    /// Read a global binding by name.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Execute `statements` top to bottom. The first runtime error aborts the
    /// run and is reported to `diagnostics`.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        if let Err(e) = self.run(statements) {
            debug!("Runtime error: {}", e);
            diagnostics.report(e);
        }
    }

    /// Execute `statements`, returning the first runtime error. A failed
    /// flush is only surfaced when the run itself succeeded.
    fn run(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        let result = self.execute_all(statements);

        // A runtime error always unwinds to global scope.
        self.environment = None;
        let flushed = self.out.flush();

        result?;
        flushed?;
        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = self.evaluate(initializer)?;
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.define(name, value);
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(self.environment.clone()).into_ref();
                return self.execute_block(statements, frame);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                return if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else {
                    self.execute(else_branch)
                };
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = KixFunction {
                    declaration: Rc::clone(decl),
                    closure: self.environment.clone(),
                };
                self.define(&decl.name, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = self.evaluate(value)?;
                return Ok(Flow::Return(value));
            }

            Stmt::Null => {}
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` with `frame` as the current environment, restoring the
    /// previous one on every exit path.
    fn execute_block(&mut self, statements: &[Stmt], frame: EnvRef) -> Result<Flow> {
        let previous = self.environment.replace(frame);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    /// New binding in the current scope. Shadowing was settled statically, so
    /// no existing binding is checked.
    fn define(&mut self, name: &Token, value: Value) {
        match &self.environment {
            Some(frame) => {
                frame.borrow_mut().define(value);
            }
            None => {
                self.globals.insert(name.lexeme.clone(), value);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),

            Expr::Null => Ok(Value::Nil),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    TokenType::MINUS => {
                        let n = number_operand(operator, &right)?;
                        Ok(Value::Number(-n))
                    }
                    _ => Err(KixError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let decided = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign(*id, name, value.clone())?;
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call(&callee, paren, args)
            }
        }
    }

    fn look_up(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(resolved) => self
                .environment
                .as_ref()
                .and_then(|env| Environment::get_at(env, resolved.distance, resolved.slot))
                .ok_or_else(|| unresolved(name)),

            None => self.globals.get(&name.lexeme).cloned().ok_or_else(|| {
                KixError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
            }),
        }
    }

    fn assign(&mut self, id: ExprId, name: &Token, value: Value) -> Result<()> {
        match self.locals.get(&id) {
            Some(resolved) => {
                let assigned = self.environment.as_ref().is_some_and(|env| {
                    Environment::assign_at(env, resolved.distance, resolved.slot, value)
                });

                if assigned {
                    Ok(())
                } else {
                    Err(unresolved(name))
                }
            }

            None => match self.globals.get_mut(&name.lexeme) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(KixError::runtime(
                    name,
                    format!("Undefined variable '{}'.", name.lexeme),
                )),
            },
        }
    }

    /// Invokes a callable (native or user-defined function).
    fn call(&mut self, callee: &Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        let Some(arity) = callee.arity() else {
            return Err(KixError::runtime(paren, "Can only call functions."));
        };

        if args.len() != arity {
            return Err(KixError::runtime(
                paren,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        match callee {
            Value::NativeFunction { name, func, .. } => {
                debug!("Calling native function '{}'", name);
                func(&mut *self.out, &args).map_err(|msg| KixError::runtime(paren, msg))
            }

            Value::Function(function) => {
                debug!("Calling user-defined function '{}'", function.name());
                self.call_function(&function.declaration, function.closure.clone(), args)
            }

            _ => Err(KixError::runtime(paren, "Can only call functions.")),
        }
    }

    /// The new frame's parent is the closure, not the caller's frame.
    fn call_function(
        &mut self,
        declaration: &FunctionDecl,
        closure: Option<EnvRef>,
        args: Vec<Value>,
    ) -> Result<Value> {
        let mut frame = Environment::with_enclosing(closure);
        for arg in args {
            frame.define(arg);
        }

        match self.execute_block(&declaration.body, frame.into_ref())? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

fn literal_value(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::Str(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// A resolved address with no backing frame or slot. Cannot happen for a
/// program the resolver accepted.
fn unresolved(name: &Token) -> KixError {
    KixError::runtime(name, format!("Unable to find variable '{}'.", name.lexeme))
}

fn number_operand(operator: &Token, operand: &Value) -> Result<f64> {
    match operand {
        Value::Number(n) => Ok(*n),
        _ => Err(KixError::runtime(operator, "Operand must be a number.")),
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(KixError::runtime(operator, "Operand must be a number.")),
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::PLUS => plus(operator, left, right),

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a - b))
        }
        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a * b))
        }
        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a > b))
        }
        TokenType::GREATER_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a >= b))
        }
        TokenType::LESS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a < b))
        }
        TokenType::LESS_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a <= b))
        }

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(KixError::runtime(operator, "Invalid binary operator.")),
    }
}

/// `+` adds numbers, concatenates strings, and splices a rounded number into
/// a string on either side.
fn plus(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Value::Str(a), Value::Number(b)) => Ok(Value::Str(a + &round_half_up(b))),
        (Value::Number(a), Value::Str(b)) => Ok(Value::Str(round_half_up(a) + &b)),
        (left, right) => Err(KixError::runtime(
            operator,
            format!("Invalid operands: {} and {} for '+'.", left, right),
        )),
    }
}
