//! Abstract syntax tree produced by the parser.
//!
//! Nodes are plain immutable data. Variable reads and assignment targets carry
//! an [`ExprId`] so the resolver can key its address table on a stable integer
//! instead of on node addresses.

use std::rc::Rc;

use crate::token::{LiteralValue, Token};

/// Identity of a variable-reference or assignment expression. Unique within
/// one [`Session`](crate::session::Session), including across REPL lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression (`!ready`, `-42`).
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix arithmetic, comparison or equality.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function call. `paren` is the closing `)`, kept for error reporting.
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// Placeholder for an absent optional expression (missing initializer,
    /// missing `for` increment, bare `return`). Evaluates to `nil`.
    Null,
}

/// A function declaration. Shared between the AST and every function value
/// created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement.
    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`; initializer is `Expr::Null` when absent.
    Var { name: Token, initializer: Expr },

    /// Braced scope.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword, for diagnostics.
        keyword: Token,
        value: Expr,
    },

    /// No-op. Stands in for statements that failed to parse and for absent
    /// optional statements (missing `else`, missing `for` initializer).
    Null,
}
