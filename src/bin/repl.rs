use std::cell::RefCell;
use std::rc::Rc;

use lispy::{
    Environment, Error, TokenKind, Value, eval_program, evaluator::special_form_identifiers,
    init_tracing, lexer::tokenize,
};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

const HISTORY_FILE: &str = "lispy_history.txt";

struct LispyCompleter {
    env: Rc<RefCell<Environment>>,
}

impl LispyCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        LispyCompleter { env }
    }
}

impl rustyline::completion::Completer for LispyCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Only complete when the cursor sits at the end of an atom.
        let prefix = match tokenize(&line[..pos]) {
            Ok(tokens) => match tokens.last() {
                Some(token) if token.span.end == pos => match &token.kind {
                    TokenKind::Atom(prefix) => prefix.clone(),
                    _ => return Ok((pos, vec![])),
                },
                _ => return Ok((pos, vec![])),
            },
            Err(_) => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&special_form_identifiers())
            .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: LispyCompleter,
}

struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        for (i, c) in ctx.input().chars().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched ')' at position {}",
                            i
                        ))));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> std::borrow::Cow<'l, str> {
        // Each open paren: its offset in `line` and in `highlighted`.
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();

        for (i, c) in line.char_indices() {
            match c {
                '(' => {
                    stack.push((i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' => {
                    if let Some((open_pos, open_offset)) = stack.pop() {
                        if pos > 0 && (open_pos == pos - 1 || i == pos - 1) {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching parens
                            highlighted
                                .replace_range(open_offset..=open_offset, "\x1b[1;34m(\x1b[0m");
                        } else {
                            highlighted.push(c);
                        }
                    } else {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched closing parens
                    }
                }
                _ => highlighted.push(c),
            }
        }

        std::borrow::Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    println!("Lispy REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let global_env = Environment::new_global_populated();
    let h = InputValidator {
        highlighter: ParenHighlighter,
        validator: ParenValidator,
        completer: LispyCompleter::new(global_env.clone()),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(rustyline::EditMode::Vi)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history.");
    }

    loop {
        let readline = rl.readline("lispy> ");
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                // Each line may hold several forms; the last value is printed.
                let report = match eval_program(trimmed_input, global_env.clone()) {
                    Ok(Value::Unit) => Ok(()),
                    Ok(value) => {
                        println!("{}", value);
                        Ok(())
                    }
                    Err(Error::Parse(parse_err)) => parse_err.pretty_print("REPL", trimmed_input),
                    Err(Error::Eval(eval_err)) => eval_err.pretty_print(),
                };
                if let Err(e) = report {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: &str = "\x1b[1;34m(\x1b[0m";
    const CLOSE: &str = "\x1b[34m)\x1b[0m";
    const STRAY: &str = "\x1b[31m)\x1b[0m";

    #[test]
    fn test_highlight_pair_at_cursor() {
        let out = ParenHighlighter.highlight("(a)(b)", 6);
        assert_eq!(out.as_ref(), format!("(a){}b{}", OPEN, CLOSE));
    }

    #[test]
    fn test_highlight_after_earlier_escape_codes() {
        // Cursor just after the '(' that follows a stray ')'.
        let out = ParenHighlighter.highlight(")(b)", 2);
        assert_eq!(out.as_ref(), format!("{}{}b{}", STRAY, OPEN, CLOSE));

        let out = ParenHighlighter.highlight("(a)(b) (c)", 8);
        assert_eq!(out.as_ref(), format!("(a)(b) {}c{}", OPEN, CLOSE));
    }

    #[test]
    fn test_highlight_leaves_unclosed_paren_plain() {
        let out = ParenHighlighter.highlight("(a", 2);
        assert_eq!(out.as_ref(), "(a");
    }
}
