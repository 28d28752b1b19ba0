//! One interpreter session: runs source units through
//! scan → parse → resolve → interpret and keeps global state between them.
//!
//! A script is a single unit. In the REPL every line is a unit; globals,
//! resolved addresses and expression ids carry over, while the compile error
//! flag is reset by the driver between lines.

use std::io::{self, Write};

use log::{debug, info};

use crate::ast::Stmt;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan;

pub struct Session {
    config: Config,
    interpreter: Interpreter,
    diagnostics: Diagnostics,
    next_id: usize,
    err: Box<dyn Write>,
}

impl Session {
    /// Program output to stdout, diagnostics to stderr.
    pub fn new(config: Config) -> Self {
        Self::with_streams(config, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_streams(config: Config, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        info!("Session created with {:?}", config);

        Self {
            config,
            interpreter: Interpreter::with_output(out),
            diagnostics: Diagnostics::new(),
            next_id: 0,
            err,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Scan, parse and resolve `source`. Returns `None` if any lexical,
    /// syntax or resolution error was reported; warnings do not count.
    pub fn compile(&mut self, source: &str) -> Option<Vec<Stmt>> {
        let tokens = scan(source, &mut self.diagnostics);

        let mut parser = Parser::with_id_base(tokens, self.next_id, &mut self.diagnostics);
        let statements = parser.parse();
        self.next_id = parser.next_id();

        if self.diagnostics.had_error() {
            debug!("Syntax errors, skipping resolution");
            self.flush_diagnostics();
            return None;
        }

        let mut resolver = Resolver::new(&self.config, &mut self.diagnostics);
        resolver.resolve(&statements);
        let locals = resolver.into_locals();

        self.flush_diagnostics();

        if self.diagnostics.had_error() {
            debug!("Resolution errors, skipping execution");
            return None;
        }

        self.interpreter.extend_locals(locals);

        Some(statements)
    }

    /// Execute already compiled statements.
    pub fn execute(&mut self, statements: &[Stmt]) {
        self.interpreter.interpret(statements, &mut self.diagnostics);
        self.flush_diagnostics();
    }

    /// Compile and, if that succeeded, execute `source`.
    pub fn run(&mut self, source: &str) {
        if let Some(statements) = self.compile(source) {
            self.execute(&statements);
        }
    }

    /// Forget compile errors before the next REPL line.
    pub fn reset_errors(&mut self) {
        self.diagnostics.reset();
    }

    /// 65 after a static error, 70 after a runtime error, else 0.
    pub fn exit_code(&self) -> i32 {
        self.diagnostics.exit_code()
    }

    fn flush_diagnostics(&mut self) {
        for report in self.diagnostics.drain() {
            // Nowhere left to report a failing error stream.
            let _ = writeln!(self.err, "{}", report);
        }
        let _ = self.err.flush();
    }
}
