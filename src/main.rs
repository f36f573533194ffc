use std::process::ExitCode;

use lispy::{Environment, Error, eval_program, init_tracing};

/// Drops whole lines that start with ';'. The reader itself has no
/// comment syntax.
fn strip_comments(source: &str) -> String {
    source
        .lines()
        .filter(|line| !line.starts_with(';'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn main() -> ExitCode {
    init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: lispy FILE");
        eprintln!("(run the `repl` binary for an interactive session)");
        return ExitCode::FAILURE;
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => strip_comments(&source),
        Err(e) => {
            eprintln!("Could not read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let global_env = Environment::new_global_populated();
    let result = match eval_program(&source, global_env) {
        Ok(_) => return ExitCode::SUCCESS,
        Err(Error::Parse(parse_err)) => parse_err.pretty_print(&path, &source),
        Err(Error::Eval(eval_err)) => eval_err.pretty_print(),
    };
    if let Err(e) = result {
        eprintln!("Could not report error: {}", e);
    }
    ExitCode::FAILURE
}
