//! CLI driver for the language runtime.
//!
//! Thin wrapper around the three library entry points: reads a source file,
//! dispatches to `run`/`tokens`/`ast`, and prints the result. Exists so the
//! library can be exercised without the HTTP surface it's normally embedded
//! behind.

use std::fs;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use log::{debug, error, info};

#[derive(ClapParser, Debug)]
#[command(author, version, about = "Lexer, parser, and tree-walking evaluator for a small imperative language")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Specify the log level of the runtime.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

impl Cli {
    fn init() -> Self {
        Cli::parse()
    }
}

/// Log level for the CLI, separate from the library's own error taxonomy -
/// this only controls how much of the pipeline's progress gets printed.
#[derive(ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,
    #[value(alias("1"))]
    Warn,
    #[value(alias("2"))]
    Info,
    #[value(alias("3"))]
    Debug,
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a source file and print its output and return value.
    Run {
        /// Path to the source file.
        file: PathBuf,

        /// Read `input()` calls from this file instead of failing with
        /// "no standard input is attached".
        #[arg(long)]
        stdin_file: Option<PathBuf>,

        /// Print the `compile` result as JSON instead of plain text - the
        /// same shape an embedding HTTP layer would serialize.
        #[arg(long)]
        json: bool,
    },

    /// Print the token stream for a source file.
    Tokens {
        /// Path to the source file.
        file: PathBuf,

        /// Print the tokens as a JSON array instead of a text table.
        #[arg(long)]
        json: bool,
    },

    /// Print the parsed AST for a source file.
    Ast {
        /// Path to the source file.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::init();
    simple_logger::init_with_level((&cli.verbosity).into()).expect("logger should initialize once");

    match &cli.command {
        Command::Run { file, stdin_file, json } => run_command(file, stdin_file.as_deref(), *json),
        Command::Tokens { file, json } => tokens_command(file, *json),
        Command::Ast { file } => ast_command(file),
    }
}

fn read_source(path: &std::path::Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        error!("could not read {}: {e}", path.display());
        ExitCode::FAILURE
    })
}

fn run_command(file: &std::path::Path, stdin_file: Option<&std::path::Path>, json: bool) -> ExitCode {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };

    debug!("lexing and parsing {}", file.display());
    let mut opened_stdin = match stdin_file {
        Some(path) => match fs::File::open(path) {
            Ok(f) => Some(BufReader::new(f)),
            Err(e) => {
                error!("could not open {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let result = langrt::compile(
        &source,
        opened_stdin.as_mut().map(|r| r as &mut dyn std::io::BufRead),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result).expect("result is always serializable"));
        return if result.ok.is_some() { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }

    match result {
        langrt::CompileResult { ok: Some(ok), .. } => {
            info!(
                "compiled in {}ms, executed in {}ms",
                ok.compile_ms, ok.exec_ms
            );
            print!("{}", ok.output);
            match ok.return_value {
                Some(value) => println!("=> {value}"),
                None => println!("=> null"),
            }
            ExitCode::SUCCESS
        }
        langrt::CompileResult { err: Some(err), .. } => {
            print_error(&err);
            ExitCode::FAILURE
        }
        _ => unreachable!("compile always returns exactly one of ok/err"),
    }
}

fn tokens_command(file: &std::path::Path, json: bool) -> ExitCode {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };

    match langrt::tokenize(&source) {
        Ok(tokens) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens).expect("tokens are always serializable"));
            } else {
                for token in tokens {
                    println!("{:<14} {:<20} {}:{}", token.kind, token.value, token.line, token.column);
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn ast_command(file: &std::path::Path) -> ExitCode {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };

    match langrt::parse_to_ast(&source) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &langrt::ErrorInfo) {
    match (err.line, err.column) {
        (Some(line), Some(column)) => {
            error!("{}: {} (line {line}, column {column})", err.kind, err.message)
        }
        _ => error!("{}: {}", err.kind, err.message),
    }
}
