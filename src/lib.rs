// Declare modules publicly so they are part of the library interface
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
pub mod types;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

pub use environment::{EnvError, Environment};
pub use evaluator::{Diagnostic, ErrorKind, EvalError, EvalResult, evaluate};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, Parser, parse_program, parse_str};
pub use source::Span;
pub use types::{Closure, Datum, NativeProcedure, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("SyntaxError: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Evaluates every top-level form in `source` in order, returning the
/// value of the last one.
pub fn eval_program(source: &str, env: Rc<RefCell<Environment>>) -> Result<Value, Error> {
    let program = parse_program(source)?;
    Ok(evaluate(&program, env)?)
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=lispy=debug` or
/// `RUST_LOG=lispy=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evals(source: &str, expected: Value) {
        let env = Environment::new_global_populated();
        match eval_program(source, env) {
            Ok(value) => assert_eq!(value, expected, "Source: '{}'", source),
            Err(e) => panic!("Evaluation failed for '{}': {}", source, e),
        }
    }

    #[test]
    fn test_first_order_operators() {
        evals(
            "
            (define (abs a)
                ((if (> a 0) + -) 0 a)
            )
            (list
                (abs 1)
                (abs -1)
            )
            ",
            Value::List(vec![Value::Integer(1), Value::Integer(1)]),
        );
    }

    #[test]
    fn test_define_function() {
        evals("(define (square x) (* x x)) (square 2)", Value::Integer(4));
    }

    #[test]
    fn test_recursion() {
        evals(
            "(define (f x)
                (if (> x 1)
                    (* x (f (- x 1)))
                    1))
             (f 6)",
            Value::Integer(720),
        );
    }

    #[test]
    fn test_state_persists_across_programs() {
        let env = Environment::new_global_populated();
        eval_program("(define x 41)", env.clone()).unwrap();
        assert_eq!(eval_program("(+ x 1)", env).unwrap(), Value::Integer(42));
    }

    #[test]
    fn test_errors_are_unified() {
        let env = Environment::new_global_populated();
        assert!(matches!(
            eval_program("(+ 1", env.clone()),
            Err(Error::Parse(ParseError::UnexpectedEof))
        ));
        assert!(matches!(
            eval_program(")", env.clone()),
            Err(Error::Parse(ParseError::UnexpectedClose(_)))
        ));
        match eval_program("undefined-thing", env) {
            Err(Error::Eval(err)) => {
                assert_eq!(
                    err.kind,
                    ErrorKind::Name("name 'undefined-thing' is not defined".into())
                );
            }
            other => panic!("expected NameError, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_program_aborts_remaining_forms() {
        let env = Environment::new_global_populated();
        assert!(eval_program("(define a 1) (car (list)) (define b 2)", env.clone()).is_err());
        assert!(Environment::lookup(&env, "a").is_ok());
        assert!(Environment::lookup(&env, "b").is_err());
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
