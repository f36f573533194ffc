use crate::Span;
use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::Datum;
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

/// Syntax errors raised by the reader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected )")]
    UnexpectedClose(Span),
    #[error("unexpected trailing input '{}' at {}", .0.kind, .0.span)]
    TrailingInput(Token),
    #[error("Lexer Error during parse: {0}")]
    LexerError(#[from] LexerError),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    // Tokens are consumed as they are read.
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    /// Reads one datum, consuming exactly the tokens that make it up.
    pub fn read_from(&mut self) -> ParseResult<Datum> {
        let token = self.tokens.next().ok_or(ParseError::UnexpectedEof)?;
        match token.kind {
            TokenKind::LParen => {
                let mut items = Vec::new();
                loop {
                    match self.tokens.peek() {
                        Some(Token {
                            kind: TokenKind::RParen,
                            ..
                        }) => {
                            self.tokens.next();
                            return Ok(Datum::List(items));
                        }
                        Some(_) => items.push(self.read_from()?),
                        None => return Err(ParseError::UnexpectedEof),
                    }
                }
            }
            TokenKind::RParen => Err(ParseError::UnexpectedClose(token.span)),
            TokenKind::Atom(text) => Ok(Datum::atom(&text)),
        }
    }

    /// Reads a single datum and requires the token stream to be exhausted.
    pub fn parse(mut self) -> ParseResult<Datum> {
        let datum = self.read_from()?;
        match self.tokens.next() {
            // A stray ')' reads the same here as anywhere else.
            Some(Token {
                kind: TokenKind::RParen,
                span,
            }) => Err(ParseError::UnexpectedClose(span)),
            Some(found) => Err(ParseError::TrailingInput(found)),
            None => Ok(datum),
        }
    }
}

/// Tokenizes and reads one datum.
pub fn parse_str(input: &str) -> ParseResult<Datum> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}

/// Reads any number of top-level forms as a single `(begin ...)`.
pub fn parse_program(input: &str) -> ParseResult<Datum> {
    let mut forms = vec![Datum::symbol("begin")];
    let mut parser = Parser::new(crate::lexer::tokenize(input)?);
    while parser.tokens.peek().is_some() {
        forms.push(parser.read_from()?);
    }
    Ok(Datum::List(forms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Datum {
        Datum::Integer(n)
    }

    fn sym(s: &str) -> Datum {
        Datum::symbol(s)
    }

    fn list(items: Vec<Datum>) -> Datum {
        Datum::List(items)
    }

    // Helper for asserting successful parsing
    fn assert_parse(input: &str, expected: Datum) {
        match parse_str(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper for asserting parse errors
    fn assert_parse_error(input: &str, expected_error_variant: ParseError) {
        match parse_str(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn assert_round_trip(input: &str) {
        let first = parse_str(input).expect("first parse");
        let second = parse_str(&first.to_string()).expect("second parse");
        assert_eq!(first, second, "Input: '{}'", input);
    }

    #[test]
    fn test_parse_atoms() {
        assert_parse("42", int(42));
        assert_parse("-7", int(-7));
        assert_parse("3.5", Datum::Float(3.5));
        assert_parse("1.0", Datum::Float(1.0));
        assert_parse("foo", sym("foo"));
        assert_parse("set!", sym("set!"));
    }

    #[test]
    fn test_parse_empty_list() {
        assert_parse("()", list(vec![]));
        assert_parse("(  )", list(vec![]));
    }

    #[test]
    fn test_parse_nested_list() {
        assert_parse(
            "(define (square x) (* x x))",
            list(vec![
                sym("define"),
                list(vec![sym("square"), sym("x")]),
                list(vec![sym("*"), sym("x"), sym("x")]),
            ]),
        );
        assert_parse("((()))", list(vec![list(vec![list(vec![])])]));
    }

    #[test]
    fn test_read_from_consumes_one_datum() {
        let tokens = crate::lexer::tokenize("(a b) c").unwrap();
        let mut parser = Parser::new(tokens);
        assert_eq!(parser.read_from().unwrap(), list(vec![sym("a"), sym("b")]));
        assert_eq!(parser.read_from().unwrap(), sym("c"));
        assert_eq!(parser.read_from(), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_parse_errors_eof() {
        assert_eq!(parse_str(""), Err(ParseError::UnexpectedEof));
        assert_eq!(parse_str("   "), Err(ParseError::UnexpectedEof));
        assert_parse_error("(", ParseError::UnexpectedEof);
        assert_parse_error("(1 (2 3)", ParseError::UnexpectedEof);
    }

    #[test]
    fn test_parse_errors_unexpected_close() {
        assert_eq!(
            parse_str(")"),
            Err(ParseError::UnexpectedClose(Span::new(0, 1)))
        );
        assert_eq!(parse_str(")").unwrap_err().to_string(), "unexpected )");
        assert_eq!(parse_str("").unwrap_err().to_string(), "unexpected end of input");
    }

    #[test]
    fn test_parse_errors_trailing_input() {
        let trailing = ParseError::TrailingInput(Token {
            kind: TokenKind::Atom("2".to_string()),
            span: Span::default(),
        });
        assert_parse_error("1 2", trailing.clone());
        assert_parse_error("(a) b", trailing);
    }

    #[test]
    fn test_stray_close_after_datum() {
        assert_eq!(
            parse_str("(a))"),
            Err(ParseError::UnexpectedClose(Span::new(3, 4)))
        );
        assert_eq!(parse_str("x )"), Err(ParseError::UnexpectedClose(Span::new(2, 3))));
        assert!(matches!(
            parse_program("(a))"),
            Err(ParseError::UnexpectedClose(_))
        ));
    }

    #[test]
    fn test_parse_program_wraps_in_begin() {
        assert_eq!(
            parse_program("(define x 1) x").unwrap(),
            list(vec![
                sym("begin"),
                list(vec![sym("define"), sym("x"), int(1)]),
                sym("x"),
            ])
        );
        assert_eq!(parse_program("").unwrap(), list(vec![sym("begin")]));
        assert_eq!(parse_program("(x"), Err(ParseError::UnexpectedEof));
        assert!(matches!(
            parse_program("x )"),
            Err(ParseError::UnexpectedClose(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        assert_round_trip("42");
        assert_round_trip("1.0");
        assert_round_trip("-0.5");
        assert_round_trip("()");
        assert_round_trip("(define (f x) (if (> x 1) (* x (f (- x 1))) 1))");
        assert_round_trip("  (a   (b\n c)\t1.25 (()) ) ");
        assert_round_trip("(1e300 1e-9 12345678901234567.0)");
        assert_round_trip("nan");
        assert_round_trip("(inf -inf NaN)");
    }

    #[test]
    fn test_printer_normalizes_whitespace() {
        let datum = parse_str("(  +\n 1\t(f  2.0 ) )").unwrap();
        assert_eq!(datum.to_string(), "(+ 1 (f 2.0))");
    }
}
