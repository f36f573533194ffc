use crate::environment::Environment;
use crate::evaluator::EvalResult;
use std::cell::RefCell;
use std::fmt; // For custom display formatting
use std::rc::Rc;

/// A parsed expression. Produced once by the reader and never mutated
/// afterwards; the evaluator copies out of it rather than aliasing it.
#[derive(Debug, Clone)]
pub enum Datum {
    Integer(i64),
    Float(f64),
    Symbol(String),
    List(Vec<Datum>),
}

impl Datum {
    /// Classifies a raw token: integer first, then float, otherwise symbol.
    pub fn atom(token: &str) -> Datum {
        if let Ok(n) = token.parse::<i64>() {
            Datum::Integer(n)
        } else if let Ok(n) = token.parse::<f64>() {
            Datum::Float(n)
        } else {
            Datum::Symbol(token.to_string())
        }
    }

    pub fn symbol(name: &str) -> Datum {
        Datum::Symbol(name.to_string())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Datum::Symbol(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

// Structural: floats compare by bit pattern, so a parsed `nan` equals its re-read.
impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Integer(a), Datum::Integer(b)) => a == b,
            (Datum::Float(a), Datum::Float(b)) => a.to_bits() == b.to_bits(),
            (Datum::Symbol(a), Datum::Symbol(b)) => a == b,
            (Datum::List(a), Datum::List(b)) => a == b,
            _ => false,
        }
    }
}

// The printer. `parse(d.to_string())` rebuilds `d`.
impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Integer(n) => write!(f, "{}", n),
            // Debug keeps the fractional part ("1.0"), so floats stay floats on re-read
            Datum::Float(n) => write!(f, "{:?}", n),
            Datum::Symbol(s) => write!(f, "{}", s),
            Datum::List(items) => write_list(f, items),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

/// Runtime values. A superset of [`Datum`]: procedures never appear in
/// source text but are produced by `lambda` and the native table.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Symbol(String),
    List(Vec<Value>),
    Closure(Rc<Closure>),
    Native(NativeProcedure),
    /// Result of `define`, `set!` and an empty `begin`.
    Unit,
}

impl Value {
    /// Only numeric zero, the empty list and unit are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::List(items) => !items.is_empty(),
            Value::Unit => false,
            Value::Symbol(_) | Value::Closure(_) | Value::Native(_) => true,
        }
    }

    pub fn from_bool(b: bool) -> Value {
        Value::Integer(if b { 1 } else { 0 })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Closure(_) => "closure",
            Value::Native(_) => "native procedure",
            Value::Unit => "unit",
        }
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }
}

impl From<&Datum> for Value {
    fn from(datum: &Datum) -> Self {
        match datum {
            Datum::Integer(n) => Value::Integer(*n),
            Datum::Float(n) => Value::Float(*n),
            Datum::Symbol(s) => Value::Symbol(s.clone()),
            Datum::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

// Structural for data, identity for closures (their environments may be cyclic).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(items) => write_list(f, items),
            Value::Closure(closure) => write!(f, "#<closure ({})>", closure.params.join(" ")),
            Value::Native(native) => write!(f, "#<native:{}>", native.name),
            Value::Unit => write!(f, "#<unit>"),
        }
    }
}

/// A `lambda` value: parameters and body plus the environment it was
/// created in. The environment is shared with every other holder.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Datum,
    pub env: Rc<RefCell<Environment>>,
}

impl fmt::Debug for Closure {
    // The captured environment is left out; it usually contains this closure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body.to_string())
            .finish()
    }
}

pub type NativeFn = fn(&[Value]) -> EvalResult;

#[derive(Clone)]
pub struct NativeProcedure {
    name: String,
    func: NativeFn,
}

impl NativeProcedure {
    pub fn new(name: &str, func: NativeFn) -> Self {
        NativeProcedure {
            name: name.to_string(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> EvalResult {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Native({})", self.name)
    }
}

// Function pointers don't compare reliably, so natives compare by name.
impl PartialEq for NativeProcedure {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_classification_order() {
        assert_eq!(Datum::atom("1"), Datum::Integer(1));
        assert_eq!(Datum::atom("-17"), Datum::Integer(-17));
        assert_eq!(Datum::atom("1.0"), Datum::Float(1.0));
        assert_eq!(Datum::atom("2.5e3"), Datum::Float(2500.0));
        assert_eq!(Datum::atom("x"), Datum::symbol("x"));
        assert_eq!(Datum::atom("1+"), Datum::symbol("1+"));
        assert_eq!(Datum::atom("set!"), Datum::symbol("set!"));
    }

    #[test]
    fn test_integer_overflow_becomes_float() {
        assert_eq!(
            Datum::atom("99999999999999999999"),
            Datum::Float(99999999999999999999.0)
        );
    }

    #[test]
    fn test_datum_display() {
        let datum = Datum::List(vec![
            Datum::symbol("+"),
            Datum::Integer(1),
            Datum::Float(2.0),
            Datum::List(vec![]),
        ]);
        assert_eq!(datum.to_string(), "(+ 1 2.0 ())");
        assert_eq!(Datum::Float(0.25).to_string(), "0.25");
    }

    #[test]
    fn test_datum_equality_is_structural() {
        assert_eq!(Datum::atom("nan"), Datum::Float(f64::NAN));
        assert_eq!(Datum::atom("inf"), Datum::Float(f64::INFINITY));
        assert_ne!(Datum::Float(0.0), Datum::Float(-0.0));
        assert_ne!(Datum::Integer(1), Datum::Float(1.0));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Unit.is_truthy());
        assert!(Value::Integer(-1).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(Value::Symbol("nil".to_string()).is_truthy());
        assert!(Value::List(vec![Value::Integer(0)]).is_truthy());
    }

    #[test]
    fn test_value_from_datum_copies() {
        let datum = Datum::List(vec![Datum::symbol("a"), Datum::Integer(2)]);
        let value = Value::from(&datum);
        assert_eq!(
            value,
            Value::List(vec![Value::Symbol("a".to_string()), Value::Integer(2)])
        );
        assert_eq!(value.to_string(), datum.to_string());
    }

    #[test]
    fn test_integer_and_float_are_distinct_values() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }
}
