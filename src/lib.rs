//! Public entry points: `compile`, `tokenize`, `parse_to_ast`.
//!
//! These three functions are the library's entire public surface. Each
//! wraps one stage (or the whole pipeline) of `lex -> parse -> evaluate`
//! and translates any phase's error into a uniform [`ErrorInfo`] rather
//! than leaking `error::LangError` variants to callers that only want a
//! `kind`/`message`/position.

pub mod ast;
pub mod builtin;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;

use std::io::BufRead;
use std::time::Instant;

use ast::{Program, Value};
use error::LangError;
use interpreter::Interpreter;
use lexer::Lexer;
use parser::Parser;
use serde::Serialize;

/// A single token as exposed to callers of [`tokenize`] - `kind` is the
/// closed external name (e.g. `"PLUS"`), not this crate's internal
/// `TokenKind` variant name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenOut {
    pub kind: &'static str,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

/// The uniform shape every failing entry point reports through, built from
/// a [`LangError`]'s `kind`/`Display`/`position`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl From<&LangError> for ErrorInfo {
    fn from(err: &LangError) -> Self {
        let (line, column) = match err.position() {
            Some((l, c)) => (Some(l), Some(c)),
            None => (None, None),
        };
        ErrorInfo {
            kind: err.kind(),
            message: err.to_string(),
            line,
            column,
        }
    }
}

/// The successful outcome of a [`compile`] call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompileOk {
    pub output: String,
    pub return_value: Option<String>,
    pub compile_ms: u128,
    pub exec_ms: u128,
}

/// `compile`'s result: either `ok` or `err`, never both.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompileResult {
    pub ok: Option<CompileOk>,
    pub err: Option<ErrorInfo>,
}

/// Lexes and parses `source`, then evaluates it, returning the program's
/// output and return value along with how long each phase took. `stdin`,
/// when given, backs the `input()` builtin; without it `input()` fails
/// with `InputUnavailable`.
pub fn compile(source: &str, stdin: Option<&mut dyn BufRead>) -> CompileResult {
    let compile_start = Instant::now();
    let program = match lex_and_parse(source) {
        Ok(program) => program,
        Err(err) => {
            return CompileResult {
                ok: None,
                err: Some(ErrorInfo::from(&err)),
            }
        }
    };
    let compile_ms = compile_start.elapsed().as_millis();

    let exec_start = Instant::now();
    let interpreter = match stdin {
        Some(stdin) => Interpreter::with_stdin(stdin),
        None => Interpreter::new(),
    };
    let outcome = match interpreter.run(&program) {
        Ok(outcome) => outcome,
        Err(err) => {
            let err = LangError::from(err);
            return CompileResult {
                ok: None,
                err: Some(ErrorInfo::from(&err)),
            };
        }
    };
    let exec_ms = exec_start.elapsed().as_millis();

    CompileResult {
        ok: Some(CompileOk {
            output: outcome.output,
            return_value: return_value_text(&outcome.value),
            compile_ms,
            exec_ms,
        }),
        err: None,
    }
}

/// `return_value: text|null` - `Value::Null` maps to `None`, everything
/// else renders through the language's own display rules.
fn return_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_display_string()),
    }
}

/// Lexes `source` into the external token shape, or an [`ErrorInfo`] if the
/// source does not lex cleanly.
pub fn tokenize(source: &str) -> Result<Vec<TokenOut>, ErrorInfo> {
    Lexer::new(source)
        .tokenize()
        .map(|tokens| {
            tokens
                .into_iter()
                .map(|t| TokenOut {
                    kind: t.kind.external_name(),
                    value: t.lexeme,
                    line: t.line,
                    column: t.column,
                })
                .collect()
        })
        .map_err(|e| ErrorInfo::from(&LangError::from(e)))
}

/// Lexes and parses `source`, returning an indented human-readable
/// rendering of the resulting AST, or an [`ErrorInfo`] on failure.
pub fn parse_to_ast(source: &str) -> Result<String, ErrorInfo> {
    lex_and_parse(source)
        .map(|program| ast_printer::render(&program))
        .map_err(|e| ErrorInfo::from(&e))
}

fn lex_and_parse(source: &str) -> Result<Program, LangError> {
    let tokens = Lexer::new(source).tokenize()?;
    let program = Parser::new(tokens).parse()?;
    Ok(program)
}

/// Explicit, match-driven AST pretty-printer - no `Debug`-derive reliance,
/// no dynamic introspection, so the rendering stays stable regardless of
/// how the AST types themselves are declared.
mod ast_printer {
    use crate::ast::{BinaryOperator, Expression, Param, Program, Statement, UnaryOperator};
    use std::fmt::Write as _;

    pub fn render(program: &Program) -> String {
        let mut out = String::new();
        writeln!(out, "Program").unwrap();
        for stmt in &program.statements {
            render_statement(stmt, 1, &mut out);
        }
        out
    }

    fn indent(out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
    }

    fn render_statement(stmt: &Statement, depth: usize, out: &mut String) {
        indent(out, depth);
        match stmt {
            Statement::TypedDeclaration { type_tag, name, value } => {
                writeln!(out, "TypedDeclaration name={name} type={}", type_tag.as_str()).unwrap();
                render_expression(value, depth + 1, out);
            }
            Statement::Assignment { name, value } => {
                writeln!(out, "Assignment name={name}").unwrap();
                render_expression(value, depth + 1, out);
            }
            Statement::ExpressionStatement(expr) => {
                writeln!(out, "ExpressionStatement").unwrap();
                render_expression(expr, depth + 1, out);
            }
            Statement::Block(stmts) => {
                writeln!(out, "Block").unwrap();
                for s in stmts {
                    render_statement(s, depth + 1, out);
                }
            }
            Statement::If { condition, then_branch, else_branch } => {
                writeln!(out, "If").unwrap();
                render_expression(condition, depth + 1, out);
                indent(out, depth + 1);
                writeln!(out, "Then").unwrap();
                for s in then_branch {
                    render_statement(s, depth + 2, out);
                }
                if let Some(else_branch) = else_branch {
                    indent(out, depth + 1);
                    writeln!(out, "Else").unwrap();
                    for s in else_branch {
                        render_statement(s, depth + 2, out);
                    }
                }
            }
            Statement::While { condition, body } => {
                writeln!(out, "While").unwrap();
                render_expression(condition, depth + 1, out);
                for s in body {
                    render_statement(s, depth + 1, out);
                }
            }
            Statement::For { init, condition, update, body } => {
                writeln!(out, "For").unwrap();
                if let Some(init) = init {
                    indent(out, depth + 1);
                    writeln!(out, "Init").unwrap();
                    render_statement(init, depth + 2, out);
                }
                if let Some(condition) = condition {
                    indent(out, depth + 1);
                    writeln!(out, "Condition").unwrap();
                    render_expression(condition, depth + 2, out);
                }
                if let Some(update) = update {
                    indent(out, depth + 1);
                    writeln!(out, "Update").unwrap();
                    render_statement(update, depth + 2, out);
                }
                for s in body {
                    render_statement(s, depth + 1, out);
                }
            }
            Statement::Return(expr) => {
                writeln!(out, "Return").unwrap();
                if let Some(expr) = expr {
                    render_expression(expr, depth + 1, out);
                }
            }
            Statement::FunctionDecl { name, params, body } => {
                writeln!(out, "FunctionDecl name={name} params=[{}]", render_params(params)).unwrap();
                for s in body {
                    render_statement(s, depth + 1, out);
                }
            }
        }
    }

    fn render_params(params: &[Param]) -> String {
        params
            .iter()
            .map(|p| match &p.type_tag {
                Some(tag) => format!("{}:{}", p.name, tag.as_str()),
                None => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_expression(expr: &Expression, depth: usize, out: &mut String) {
        indent(out, depth);
        match expr {
            Expression::IntLit(n) => writeln!(out, "IntLit value={n}").unwrap(),
            Expression::FloatLit(n) => writeln!(out, "FloatLit value={n}").unwrap(),
            Expression::StringLit(s) => writeln!(out, "StringLit value={s:?}").unwrap(),
            Expression::BoolLit(b) => writeln!(out, "BoolLit value={b}").unwrap(),
            Expression::Identifier(name) => writeln!(out, "Identifier name={name}").unwrap(),
            Expression::Unary { operator, operand } => {
                writeln!(out, "Unary operator={}", unary_name(operator)).unwrap();
                render_expression(operand, depth + 1, out);
            }
            Expression::Binary { left, operator, right } => {
                writeln!(out, "Binary operator={}", binary_name(operator)).unwrap();
                render_expression(left, depth + 1, out);
                render_expression(right, depth + 1, out);
            }
            Expression::Call { name, args } => {
                writeln!(out, "Call name={name}").unwrap();
                for arg in args {
                    render_expression(arg, depth + 1, out);
                }
            }
        }
    }

    fn unary_name(op: &UnaryOperator) -> &'static str {
        match op {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "not",
        }
    }

    fn binary_name(op: &BinaryOperator) -> &'static str {
        match op {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::Less => "<",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_runs_hello_world_and_reports_timings() {
        let result = compile(r#"fn main() { out("Hello, World!") }"#, None);
        let ok = result.ok.expect("should compile");
        assert_eq!(ok.output, "Hello, World!\n");
        assert_eq!(ok.return_value, None);
    }

    #[test]
    fn compile_reports_return_value_for_integer_literals() {
        let result = compile(r#"fn main() { out(42) }  42"#, None);
        let ok = result.ok.expect("should compile");
        assert_eq!(ok.output, "42\n");
    }

    #[test]
    fn compile_surfaces_lex_errors_with_position() {
        let result = compile("@", None);
        let err = result.err.expect("should fail to compile");
        assert_eq!(err.kind, "LexError");
        assert_eq!(err.line, Some(1));
        assert_eq!(err.column, Some(1));
    }

    #[test]
    fn compile_surfaces_runtime_errors_without_a_required_position() {
        let result = compile("fn main() { x = 1 / 0 }", None);
        let err = result.err.expect("should fail at runtime");
        assert_eq!(err.kind, "RuntimeError");
    }

    #[test]
    fn compile_reads_from_an_attached_stdin() {
        let mut stdin: &[u8] = b"Ada\n";
        let result = compile(r#"fn main() { out(input()) }"#, Some(&mut stdin));
        let ok = result.ok.expect("should compile");
        assert_eq!(ok.output, "Ada\n");
    }

    #[test]
    fn tokenize_reports_the_closed_external_kind_names() {
        let tokens = tokenize("int x = 1").expect("should lex");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec!["INT", "IDENTIFIER", "ASSIGN", "NUMBER", "EOF"]);
    }

    #[test]
    fn tokenize_ends_with_exactly_one_eof() {
        let tokens = tokenize("1 + 2\n\n").unwrap();
        assert_eq!(tokens.iter().filter(|t| t.kind == "EOF").count(), 1);
        assert_eq!(tokens.last().unwrap().kind, "EOF");
    }

    #[test]
    fn parse_to_ast_renders_an_indented_tree() {
        let text = parse_to_ast("int x = 1 + 2").expect("should parse");
        assert!(text.starts_with("Program\n"));
        assert!(text.contains("TypedDeclaration name=x type=int"));
        assert!(text.contains("Binary operator=+"));
    }

    #[test]
    fn parse_to_ast_fails_whenever_tokenize_would_fail() {
        assert!(tokenize("@").is_err());
        assert!(parse_to_ast("@").is_err());
    }

    #[test]
    fn parse_to_ast_surfaces_parse_errors() {
        let err = parse_to_ast("fn (").unwrap_err();
        assert_eq!(err.kind, "ParseError");
    }
}
