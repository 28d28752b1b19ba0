use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::EnvRef;

/// Signature of a built-in. Natives get the interpreter's output sink so
/// `print`/`println` write where `print` statements do.
pub type NativeFn = fn(&mut dyn Write, &[Value]) -> Result<Value, String>;

/// A user-defined function: its declaration plus the frame that was current
/// when the declaration executed (`None` when declared at global scope).
pub struct KixFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Option<EnvRef>,
}

impl KixFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

// The closure frame may contain this very function, so never print it.
impl fmt::Debug for KixFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KixFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: NativeFn,
    },
    Function(Rc<KixFunction>),
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Declared parameter count, or `None` for values that cannot be called.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Value::NativeFunction { arity, .. } => Some(*arity),
            Value::Function(function) => Some(function.arity()),
            _ => None,
        }
    }
}

/// Nil equals only itself; functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::Str(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}

/// Render `n` rounded half away from zero with no decimal places, the way a
/// number is spliced into a string by `+`.
pub fn round_half_up(n: f64) -> String {
    let rounded: f64 = n.round();

    // Beyond 2^53 every f64 is already integral and `{:.0}` is exact.
    if rounded.is_finite() && rounded.abs() < 9_007_199_254_740_992.0 {
        let mut buf = itoa::Buffer::new();
        buf.format(rounded as i64).to_owned()
    } else {
        format!("{:.0}", rounded)
    }
}
