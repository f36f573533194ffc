use crate::environment::ScopeSnapshot;
use crate::{ErrorKind, EvalError, ParseError};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;

const EXPRESSION_ID: &str = "expression";

fn render_scopes(scopes: &[ScopeSnapshot]) -> String {
    let mut out = String::from("environment, innermost first:");
    for (depth, scope) in scopes.iter().enumerate() {
        out.push_str(&format!("\n  [{}]", depth));
        if scope.is_empty() {
            out.push_str(" (empty)");
        }
        for (name, value) in scope {
            out.push_str(&format!("\n    {} = {}", name, value));
        }
    }
    out
}

impl EvalError {
    /// Writes the error to stderr. When a diagnostic was captured the
    /// offending expression is shown with the scope chain as a note.
    pub fn pretty_print(&self) -> io::Result<()> {
        let Some(diagnostic) = &self.diagnostic else {
            eprintln!("Error: {}", self);
            return Ok(());
        };
        let expression = diagnostic.expression.as_str();
        let range = 0..expression.len();
        let label = match &self.kind {
            ErrorKind::Name(_) => "This symbol is not defined in any enclosing scope",
            ErrorKind::Arity(_) => "Wrong number of operands or arguments",
            ErrorKind::Type(_) => "This expression cannot be evaluated this way",
            ErrorKind::Arithmetic(_) => "Arithmetic failed while evaluating this",
        };
        Report::build(ReportKind::Error, (EXPRESSION_ID, range.clone()))
            .with_message(self.kind.to_string())
            .with_label(Label::new((EXPRESSION_ID, range)).with_message(label))
            .with_note(render_scopes(&diagnostic.scopes))
            .finish()
            .eprint((EXPRESSION_ID, Source::from(expression)))
    }
}

impl ParseError {
    /// Writes the syntax error to stderr, pointing into `input`.
    pub fn pretty_print(&self, source_id: &str, input: &str) -> io::Result<()> {
        let (range, label) = match self {
            ParseError::UnexpectedEof => {
                let idx = input.len();
                (idx..idx, "Expected ')' or another expression".to_string())
            }
            ParseError::UnexpectedClose(span) => {
                (span.to_range(), "No '(' matches this".to_string())
            }
            ParseError::TrailingInput(token) => (
                token.span.to_range(),
                "Only one expression was expected".to_string(),
            ),
            ParseError::LexerError(lex_err) => (lex_err.span.to_range(), lex_err.to_string()),
        };
        Report::build(ReportKind::Error, (source_id, range.clone()))
            .with_message(format!("SyntaxError: {}", self))
            .with_label(Label::new((source_id, range)).with_message(label))
            .finish()
            .eprint((source_id, Source::from(input)))
    }
}
