use cinder::{parse, tokenize, Interpreter};
use clap::{App, Arg, ErrorKind};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// Exit codes from sysexits.h.
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_NOINPUT: i32 = 66;
const EX_SOFTWARE: i32 = 70;

#[derive(Debug, Default)]
struct Outcome {
    parse_failed: bool,
    runtime_failed: bool,
}

impl Outcome {
    fn exit_code(&self) -> i32 {
        if self.runtime_failed {
            EX_SOFTWARE
        } else if self.parse_failed {
            EX_DATAERR
        } else {
            0
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = App::new("cinder")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a script, or starts an interactive prompt when none is given")
        .arg(
            Arg::with_name("echo")
                .long("echo")
                .help("Prints the value of each top-level expression statement"),
        )
        .arg(
            Arg::with_name("max-depth")
                .long("max-depth")
                .value_name("N")
                .takes_value(true)
                .help("Maximum function call depth"),
        )
        .arg(Arg::with_name("SCRIPT").help("Script to run").index(1))
        .get_matches_safe()
        .unwrap_or_else(|e| match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                eprintln!("{}", e.message);
                process::exit(EX_USAGE);
            }
        });

    let mut interpreter = Interpreter::new();
    if let Some(depth) = matches.value_of("max-depth") {
        match depth.parse::<usize>() {
            Ok(depth) => interpreter.set_max_call_depth(depth),
            Err(_) => {
                eprintln!("Invalid value for --max-depth: '{}'", depth);
                process::exit(EX_USAGE);
            }
        }
    }

    let code = match matches.value_of("SCRIPT") {
        Some(path) => {
            interpreter.set_echo(matches.is_present("echo"));
            run_file(&mut interpreter, path)
        }
        None => {
            interpreter.set_echo(true);
            run_prompt(&mut interpreter)
        }
    };
    process::exit(code);
}

fn run_file(interpreter: &mut Interpreter, path: &str) -> i32 {
    match fs::read_to_string(path) {
        Ok(source) => run(interpreter, &source).exit_code(),
        Err(e) => {
            eprintln!("Cannot read '{}': {}", path, e);
            EX_NOINPUT
        }
    }
}

fn run_prompt(interpreter: &mut Interpreter) -> i32 {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return EX_SOFTWARE;
        }
        match lines.next() {
            Some(Ok(line)) => {
                run(interpreter, &line);
            }
            Some(Err(e)) => {
                eprintln!("{}", e);
                return EX_NOINPUT;
            }
            None => return 0,
        }
    }
}

/// Runs whatever parsed, even when some statements were rejected.
fn run(interpreter: &mut Interpreter, source: &str) -> Outcome {
    let tokens = tokenize(source);
    let (statements, errors) = parse(&tokens);
    for error in &errors {
        eprintln!("{}", error);
    }
    debug!(statements = statements.len(), "running");
    let mut outcome = Outcome {
        parse_failed: !errors.is_empty(),
        ..Outcome::default()
    };
    if let Err(e) = interpreter.interpret(&statements) {
        eprintln!("{}", e);
        outcome.runtime_failed = true;
    }
    outcome
}
