//! Run-time configuration shared by the driver and the pipeline.

use clap::ValueEnum;

/// How the resolver treats local bindings that are never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UnusedVariables {
    /// No diagnostic.
    Off,

    /// Report a warning; execution proceeds.
    #[default]
    Warn,

    /// Report a resolution error; execution is skipped.
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub unused_variables: UnusedVariables,

    /// Also report unused function declarations.
    pub check_function_bindings: bool,

    /// Print the parenthesized AST of each unit before running it.
    pub print_ast: bool,
}
