use crate::environment::{EnvError, Environment, ScopeSnapshot};
use crate::types::{Closure, Datum, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("NameError: {0}")]
    Name(String),
    #[error("ArityError: {0}")]
    Arity(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ArithmeticError: {0}")]
    Arithmetic(String),
}

/// Snapshot taken where an evaluation failed: the offending expression and
/// every scope from the failing frame out to the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub expression: String,
    pub scopes: Vec<ScopeSnapshot>,
}

impl Diagnostic {
    pub fn capture(datum: &Datum, env: &Rc<RefCell<Environment>>) -> Self {
        Diagnostic {
            expression: datum.to_string(),
            scopes: Environment::snapshot(env),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: ErrorKind,
    /// Filled in by the innermost `evaluate` the error passes through.
    pub diagnostic: Option<Box<Diagnostic>>,
}

impl EvalError {
    pub fn arity(message: impl Into<String>) -> Self {
        ErrorKind::Arity(message.into()).into()
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ErrorKind::Type(message.into()).into()
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        ErrorKind::Arithmetic(message.into()).into()
    }

    fn with_diagnostic(mut self, datum: &Datum, env: &Rc<RefCell<Environment>>) -> Self {
        if self.diagnostic.is_none() {
            debug!(error = %self.kind, expression = %datum, "evaluation aborted");
            self.diagnostic = Some(Box::new(Diagnostic::capture(datum, env)));
        }
        self
    }
}

impl From<ErrorKind> for EvalError {
    fn from(kind: ErrorKind) -> Self {
        EvalError {
            kind,
            diagnostic: None,
        }
    }
}

impl From<EnvError> for EvalError {
    fn from(err: EnvError) -> Self {
        match err {
            EnvError::UnboundVariable(_) => ErrorKind::Name(err.to_string()).into(),
            EnvError::ArityMismatch { .. } => ErrorKind::Arity(err.to_string()).into(),
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

// --- Form classification ---

/// The kinds of list form the evaluator distinguishes, chosen by the
/// literal head symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Quote,
    If,
    Set,
    Define,
    Lambda,
    Begin,
    Application,
}

impl Form {
    const SPECIAL: [Form; 6] = [
        Form::Quote,
        Form::If,
        Form::Set,
        Form::Define,
        Form::Lambda,
        Form::Begin,
    ];

    pub fn classify(head: &Datum) -> Form {
        match head.as_symbol() {
            Some("quote") => Form::Quote,
            Some("if") => Form::If,
            Some("set!") => Form::Set,
            Some("define") => Form::Define,
            Some("lambda") => Form::Lambda,
            Some("begin") => Form::Begin,
            _ => Form::Application,
        }
    }

    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Form::Quote => Some("quote"),
            Form::If => Some("if"),
            Form::Set => Some("set!"),
            Form::Define => Some("define"),
            Form::Lambda => Some("lambda"),
            Form::Begin => Some("begin"),
            Form::Application => None,
        }
    }
}

pub fn special_form_identifiers() -> HashSet<String> {
    Form::SPECIAL
        .iter()
        .filter_map(|form| form.keyword())
        .map(str::to_string)
        .collect()
}

// --- Evaluate Function ---

/// Evaluates a datum within the specified environment.
///
/// Recursion follows the structure of the program; there is no tail-call
/// elimination, so deep recursion is bounded by the native stack.
pub fn evaluate(datum: &Datum, env: Rc<RefCell<Environment>>) -> EvalResult {
    evaluate_datum(datum, &env).map_err(|err| err.with_diagnostic(datum, &env))
}

fn evaluate_datum(datum: &Datum, env: &Rc<RefCell<Environment>>) -> EvalResult {
    match datum {
        Datum::Symbol(name) => Ok(Environment::lookup(env, name)?),
        Datum::Integer(_) | Datum::Float(_) => Ok(Value::from(datum)),
        Datum::List(elements) => match elements.split_first() {
            Some((head, operands)) => match Form::classify(head) {
                Form::Quote => evaluate_quote(operands),
                Form::If => evaluate_if(operands, env),
                Form::Set => evaluate_set(operands, env),
                Form::Define => evaluate_define(operands, env),
                Form::Lambda => evaluate_lambda(operands, env),
                Form::Begin => evaluate_begin(operands, env),
                Form::Application => evaluate_application(head, operands, env),
            },
            None => Err(EvalError::type_error("cannot evaluate an empty application ()")),
        },
    }
}

fn evaluate_quote(operands: &[Datum]) -> EvalResult {
    match operands {
        [quoted] => Ok(Value::from(quoted)),
        _ => Err(EvalError::arity(format!(
            "quote expects exactly one argument, got {}",
            operands.len()
        ))),
    }
}

fn evaluate_if(operands: &[Datum], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let [test, consequent, alternate] = operands else {
        return Err(EvalError::arity(format!(
            "if expects a test, a consequent and an alternate, got {} arguments",
            operands.len()
        )));
    };
    let branch = if evaluate(test, env.clone())?.is_truthy() {
        consequent
    } else {
        alternate
    };
    evaluate(branch, env.clone())
}

fn evaluate_set(operands: &[Datum], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let [target, expr] = operands else {
        return Err(EvalError::arity(format!(
            "set! expects a variable and an expression, got {} arguments",
            operands.len()
        )));
    };
    let Datum::Symbol(name) = target else {
        return Err(EvalError::type_error(format!(
            "set! expects a symbol, got {}",
            target
        )));
    };
    let value = evaluate(expr, env.clone())?;
    Environment::set(env, name, value)?;
    Ok(Value::Unit)
}

fn evaluate_define(operands: &[Datum], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let [target, expr] = operands else {
        return Err(EvalError::arity(format!(
            "define expects a target and an expression, got {} arguments",
            operands.len()
        )));
    };
    match target {
        Datum::Symbol(name) => {
            let value = evaluate(expr, env.clone())?;
            trace!(name = %name, "define");
            env.borrow_mut().define(name.clone(), value);
            Ok(Value::Unit)
        }
        // (define (name param*) body) => (define name (lambda (param*) body))
        Datum::List(signature) => match signature.split_first() {
            Some((name @ Datum::Symbol(_), params)) => {
                let lambda = Datum::List(vec![
                    Datum::symbol("lambda"),
                    Datum::List(params.to_vec()),
                    expr.clone(),
                ]);
                evaluate_define(&[name.clone(), lambda], env)
            }
            _ => Err(EvalError::type_error(format!(
                "cannot bind to this target: {}",
                target
            ))),
        },
        _ => Err(EvalError::type_error(format!(
            "cannot bind to this target: {}",
            target
        ))),
    }
}

fn evaluate_lambda(operands: &[Datum], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let [params, body] = operands else {
        return Err(EvalError::arity(format!(
            "lambda expects a parameter list and a body, got {} arguments",
            operands.len()
        )));
    };
    let Datum::List(params) = params else {
        return Err(EvalError::type_error(format!(
            "lambda parameters must be a list, got {}",
            params
        )));
    };
    let params = params
        .iter()
        .map(|param| {
            param.as_symbol().map(str::to_string).ok_or_else(|| {
                EvalError::type_error(format!("lambda parameter must be a symbol, got {}", param))
            })
        })
        .collect::<EvalResult<Vec<String>>>()?;
    Ok(Value::Closure(Rc::new(Closure {
        params,
        body: body.clone(),
        env: env.clone(),
    })))
}

fn evaluate_begin(operands: &[Datum], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let mut result = Value::Unit;
    for expr in operands {
        result = evaluate(expr, env.clone())?;
    }
    Ok(result)
}

fn evaluate_application(
    operator: &Datum,
    operands: &[Datum],
    env: &Rc<RefCell<Environment>>,
) -> EvalResult {
    let procedure = evaluate(operator, env.clone())?;
    let args = operands
        .iter()
        .map(|operand| evaluate(operand, env.clone()))
        .collect::<EvalResult<Vec<Value>>>()?;
    apply(&procedure, args)
}

/// Invokes a closure or native procedure with already-evaluated arguments.
pub fn apply(procedure: &Value, args: Vec<Value>) -> EvalResult {
    match procedure {
        Value::Native(native) => native.call(&args),
        Value::Closure(closure) => {
            trace!(params = ?closure.params, args = args.len(), "invoking closure");
            let frame =
                Environment::with_bindings(&closure.params, args, Some(closure.env.clone()))?;
            evaluate(&closure.body, frame)
        }
        other => Err(EvalError::type_error(format!(
            "{} is not a procedure, it is a {}",
            other,
            other.type_name()
        ))),
    }
}
