use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use kix::ast_printer::AstPrinter;
use kix::config::{Config, UnusedVariables};
use kix::scanner::Scanner;
use kix::session::Session;

#[derive(ClapParser, Debug)]
#[command(version, about = "Kix language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run; omit to start an interactive prompt
    script: Option<PathBuf>,

    /// Print the parenthesized AST before running
    #[arg(long)]
    print_ast: bool,

    /// Print the script's tokens as JSON lines instead of running it
    #[arg(long, requires = "script")]
    dump_tokens: bool,

    /// How to report local variables that are never read
    #[arg(long, value_enum, default_value_t = UnusedVariables::Warn)]
    unused: UnusedVariables,

    /// Include function declarations in the unused-variable check
    #[arg(long)]
    check_functions: bool,

    /// Enable logging to kix.log
    #[arg(long)]
    log: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            unused_variables: self.unused,
            check_function_bindings: self.check_functions,
            print_ast: self.print_ast,
        }
    }
}

/// Reads a whole script. Empty files cannot be mapped and read as "".
fn read_source(path: &Path) -> Result<String> {
    info!("Reading file: {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open file {:?}", path))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", path))?
        .len();

    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read-only and copied into an owned String before
    // anything else runs.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", path))?;
    let source = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", path))?
        .to_owned();

    info!("Read {} bytes from {:?}", len, path);

    Ok(source)
}

fn init_logger(to_file: bool) -> Result<()> {
    if !to_file {
        Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
        return Ok(());
    }

    let log_file = File::create("kix.log").context("Failed to create kix.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("kix::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to kix.log");
    Ok(())
}

/// Tokenize only; exit status 65 on any lexical error.
fn dump_tokens(source: &str) -> Result<i32> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut status = 0;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => writeln!(out, "{}", serde_json::to_string(&token)?)?,
            Err(e) => {
                eprintln!("{}", e);
                status = 65;
            }
        }
    }

    Ok(status)
}

fn run_file(path: &Path, config: Config) -> Result<i32> {
    let source = read_source(path)?;
    let mut session = Session::new(config);

    if session.config().print_ast {
        if let Some(statements) = session.compile(&source) {
            println!("{}", AstPrinter::print_program(&statements));
            session.execute(&statements);
        }
    } else {
        session.run(&source);
    }

    Ok(session.exit_code())
}

fn run_prompt(config: Config) -> Result<()> {
    let mut session = Session::new(config);
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        debug!("REPL input: {}", input);

        if session.config().print_ast {
            if let Some(statements) = session.compile(input) {
                println!("{}", AstPrinter::print_program(&statements));
                session.execute(&statements);
            }
        } else {
            session.run(input);
        }

        session.reset_errors();
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    init_logger(args.log)?;

    info!("CLI arguments: {:?}", args);

    let config = args.config();

    match &args.script {
        Some(path) if args.dump_tokens => {
            let status = dump_tokens(&read_source(path)?)?;
            if status != 0 {
                std::process::exit(status);
            }
        }

        Some(path) => {
            let status = run_file(path, config)?;
            if status != 0 {
                debug!("Exiting with status {}", status);
                std::process::exit(status);
            }
        }

        None => run_prompt(config)?,
    }

    Ok(())
}
