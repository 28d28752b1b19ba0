//! Static resolver pass for the **Kix** interpreter.
//!
//! One AST walk that:
//! 1. Builds lexical scopes (the global scope is implicit and never pushed).
//! 2. Reports static errors: redeclaration in one scope, reading a local in
//!    its own initializer, `return` outside a function, and (per
//!    [`UnusedVariables`]) locals that are never read.
//! 3. Records, for every local variable read or assignment, its
//!    `(distance, slot)` address in a [`Locals`] table keyed by [`ExprId`].
//!    References with no entry are globals and are looked up by name at run
//!    time, which is what lets a function mention a global defined later.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::config::{Config, UnusedVariables};
use crate::diagnostics::Diagnostics;
use crate::error::KixError;
use crate::token::Token;
use log::{debug, info, trace};
use std::collections::HashMap;

/// Static address of a local binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Number of enclosing-frame links to follow; 0 is the current frame.
    pub distance: usize,

    /// Position of the binding within that frame.
    pub slot: usize,
}

/// Resolver output, consumed read-only by the interpreter.
pub type Locals = HashMap<ExprId, Resolved>;

/// Are we inside a user function? Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

#[derive(Debug)]
struct Binding {
    token: Token,
    defined: bool,
    used: bool,
    is_function: bool,
}

/// One lexical scope. `bindings` is in declaration order, so an index into it
/// is exactly the runtime slot.
#[derive(Debug, Default)]
struct Scope {
    bindings: Vec<Binding>,
    by_name: HashMap<String, usize>,
}

pub struct Resolver<'d> {
    scopes: Vec<Scope>,
    current_function: FunctionType,
    locals: Locals,
    unused: UnusedVariables,
    check_functions: bool,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Resolver<'d> {
    pub fn new(config: &Config, diagnostics: &'d mut Diagnostics) -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            locals: Locals::new(),
            unused: config.unused_variables,
            check_functions: config.check_function_bindings,
            diagnostics,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    /// Addresses recorded so far.
    pub fn into_locals(self) -> Locals {
        self.locals
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        trace!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name, false);
                self.resolve_expr(initializer);
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible inside its own body.
                self.declare(&decl.name, true);
                self.define(&decl.name);
                self.resolve_function(decl);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                self.resolve_stmt(else_branch);
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from outside function.");
                }
                self.resolve_expr(value);
            }

            Stmt::Null => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::Null => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.by_name.get(&name.lexeme).map(|&i| &scope.bindings[i]))
                    .is_some_and(|binding| !binding.defined);

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name, true);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    /// Parameters and body share one scope, so parameters take slots
    /// `0..arity` and body locals follow.
    fn resolve_function(&mut self, decl: &FunctionDecl) {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param, false);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        if self.unused == UnusedVariables::Off {
            return;
        }

        for binding in scope.bindings {
            if binding.used || (binding.is_function && !self.check_functions) {
                continue;
            }

            let message = "Variable defined but not used.";
            let report = match self.unused {
                UnusedVariables::Error => KixError::resolve(&binding.token, message),
                _ => KixError::lint(&binding.token, message),
            };
            self.diagnostics.report(report);
        }
    }

    fn declare(&mut self, name: &Token, is_function: bool) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        let duplicate = scope.by_name.contains_key(&name.lexeme);

        // Still take a fresh slot so later slots keep matching the runtime frame.
        let slot = scope.bindings.len();
        scope.bindings.push(Binding {
            token: name.clone(),
            defined: false,
            used: false,
            is_function,
        });
        scope.by_name.insert(name.lexeme.clone(), slot);

        if duplicate {
            self.error(name, "Variable with this name already declared in this scope.");
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(&slot) = scope.by_name.get(&name.lexeme) {
                scope.bindings[slot].defined = true;
            }
        }
    }

    /// Record this occurrence as a local at `(distance, slot)`, or leave it
    /// unrecorded (global) if no scope declares the name.
    fn resolve_local(&mut self, id: ExprId, name: &Token, is_read: bool) {
        for (distance, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(&slot) = scope.by_name.get(&name.lexeme) {
                debug!(
                    "Resolved '{}' at distance {}, slot {}",
                    name.lexeme, distance, slot
                );

                if is_read {
                    scope.bindings[slot].used = true;
                }
                self.locals.insert(id, Resolved { distance, slot });
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.diagnostics.report(KixError::resolve(token, message));
    }
}

/// Resolve a whole program, reporting diagnostics and returning the address
/// table.
pub fn resolve(statements: &[Stmt], config: &Config, diagnostics: &mut Diagnostics) -> Locals {
    let mut resolver = Resolver::new(config, diagnostics);
    resolver.resolve(statements);
    resolver.into_locals()
}
