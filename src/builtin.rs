//! Built-in functions available to every program: `out`, `str`, `int`,
//! `float`, `input`. These are resolved by name at call time rather than
//! reserved at parse time (an identifier named `out` is just an identifier
//! until it's called), so this module only has to answer two questions for
//! the interpreter: is this name a builtin, and what does calling it do.
//!
//! `out` and `input` need access to the evaluation's output buffer and
//! (optional) standard input, so builtins take a [`BuiltinContext`] rather
//! than being bare `fn(&[Value]) -> Result<Value>` pointers - the one thing
//! here that can't be a pure function of its arguments.

use std::io::BufRead;

use crate::ast::Value;
use crate::error::RuntimeError;

/// The borrowed evaluation state a builtin may need: somewhere to append
/// text (`out`) and an optional input stream to read a line from
/// (`input`). Borrowed for the duration of a single call rather than
/// owned, so the interpreter keeps control of both.
pub struct BuiltinContext<'a> {
    pub output: &'a mut String,
    pub stdin: Option<&'a mut dyn BufRead>,
}

/// The closed set of builtin names. Checked before falling back to the
/// user-defined function table, per the evaluator's call resolution order.
pub fn is_builtin(name: &str) -> bool {
    matches!(name, "out" | "str" | "int" | "float" | "input")
}

/// Dispatches a builtin call. Callers are expected to have already
/// checked [`is_builtin`] - this is panic-free but returns
/// `UndefinedFunction` for anything else so a caller that forgets to check
/// still fails safely.
pub fn call(name: &str, args: Vec<Value>, ctx: &mut BuiltinContext) -> Result<Value, RuntimeError> {
    match name {
        "out" => builtin_out(args, ctx),
        "str" => builtin_str(args),
        "int" => builtin_int(args),
        "float" => builtin_float(args),
        "input" => builtin_input(args, ctx),
        other => Err(RuntimeError::UndefinedFunction(other.to_string())),
    }
}

fn expect_one(name: &str, args: &[Value]) -> Result<(), RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected: 1,
            got: args.len(),
        });
    }
    Ok(())
}

/// `out(v)` - appends `str(v) + "\n"` to the output buffer, returns `Null`.
fn builtin_out(args: Vec<Value>, ctx: &mut BuiltinContext) -> Result<Value, RuntimeError> {
    expect_one("out", &args)?;
    ctx.output.push_str(&args[0].to_display_string());
    ctx.output.push('\n');
    Ok(Value::Null)
}

/// `str(v)` - the textual representation used by `out` and by `+` when one
/// side is already a string.
fn builtin_str(args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_one("str", &args)?;
    Ok(Value::String(args[0].to_display_string()))
}

/// `int(v)` - parses a `String` as a decimal integer, truncates a `Float`
/// toward zero, maps `Bool` to 0/1. An unparsable string is a
/// `ConversionError`, not a panic.
fn builtin_int(args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_one("int", &args)?;
    Ok(Value::Int(to_int(&args[0])?))
}

/// `float(v)` - analogous to `int`, promoting to `Float` instead.
fn builtin_float(args: Vec<Value>) -> Result<Value, RuntimeError> {
    expect_one("float", &args)?;
    Ok(Value::Float(to_float(&args[0])?))
}

/// The `int(v)` coercion, also used by the evaluator to narrow typed
/// declarations and parameters tagged `int`.
pub fn to_int(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Float(n) => Ok(n.trunc() as i64),
        Value::Bool(b) => Ok(*b as i64),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RuntimeError::ConversionError(format!("cannot convert \"{}\" to int", s))),
        Value::Null => Err(RuntimeError::ConversionError("cannot convert null to int".to_string())),
    }
}

/// The `float(v)` coercion, also used by the evaluator to narrow typed
/// declarations and parameters tagged `float`.
pub fn to_float(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            RuntimeError::ConversionError(format!("cannot convert \"{}\" to float", s))
        }),
        Value::Null => Err(RuntimeError::ConversionError("cannot convert null to float".to_string())),
    }
}

/// `input(prompt?)` - writes an optional prompt to the output buffer, then
/// reads one line from the attached stdin (without its line terminator).
/// Fails with `InputUnavailable` when no stream is attached, e.g. a
/// `compile` call made without a `stdin` argument.
fn builtin_input(args: Vec<Value>, ctx: &mut BuiltinContext) -> Result<Value, RuntimeError> {
    if args.len() > 1 {
        return Err(RuntimeError::ArityMismatch {
            name: "input".to_string(),
            expected: 1,
            got: args.len(),
        });
    }
    if let Some(prompt) = args.first() {
        ctx.output.push_str(&prompt.to_display_string());
    }
    let stdin = ctx.stdin.as_mut().ok_or(RuntimeError::InputUnavailable)?;
    let mut line = String::new();
    stdin
        .read_line(&mut line)
        .map_err(|_| RuntimeError::InputUnavailable)?;
    if line.is_empty() {
        return Err(RuntimeError::InputUnavailable);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::String(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(output: &mut String) -> BuiltinContext<'_> {
        BuiltinContext { output, stdin: None }
    }

    #[test]
    fn out_appends_display_string_and_newline() {
        let mut output = String::new();
        let result = call("out", vec![Value::Int(42)], &mut ctx(&mut output)).unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(output, "42\n");
    }

    #[test]
    fn str_renders_bool_and_null() {
        let mut output = String::new();
        assert_eq!(
            call("str", vec![Value::Bool(true)], &mut ctx(&mut output)).unwrap(),
            Value::String("true".to_string())
        );
        assert_eq!(
            call("str", vec![Value::Null], &mut ctx(&mut output)).unwrap(),
            Value::String("null".to_string())
        );
    }

    #[test]
    fn int_truncates_float_toward_zero() {
        let mut output = String::new();
        assert_eq!(
            call("int", vec![Value::Float(-3.9)], &mut ctx(&mut output)).unwrap(),
            Value::Int(-3)
        );
    }

    #[test]
    fn int_parses_string() {
        let mut output = String::new();
        assert_eq!(
            call("int", vec![Value::String("123".to_string())], &mut ctx(&mut output)).unwrap(),
            Value::Int(123)
        );
    }

    #[test]
    fn int_on_unparsable_string_is_a_conversion_error() {
        let mut output = String::new();
        let err = call("int", vec![Value::String("nope".to_string())], &mut ctx(&mut output))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ConversionError(_)));
    }

    #[test]
    fn input_without_an_attached_stream_fails() {
        let mut output = String::new();
        let err = call("input", vec![], &mut ctx(&mut output)).unwrap_err();
        assert!(matches!(err, RuntimeError::InputUnavailable));
    }

    #[test]
    fn input_reads_a_line_without_its_terminator() {
        let mut output = String::new();
        let mut stdin: &[u8] = b"hello\nworld\n";
        let result = call(
            "input",
            vec![],
            &mut BuiltinContext { output: &mut output, stdin: Some(&mut stdin) },
        )
        .unwrap();
        assert_eq!(result, Value::String("hello".to_string()));
    }

    #[test]
    fn input_writes_its_prompt_to_the_output_buffer() {
        let mut output = String::new();
        let mut stdin: &[u8] = b"answer\n";
        call(
            "input",
            vec![Value::String("name? ".to_string())],
            &mut BuiltinContext { output: &mut output, stdin: Some(&mut stdin) },
        )
        .unwrap();
        assert_eq!(output, "name? ");
    }

    // ==================== EDGE CASES ====================

    #[test]
    fn out_with_wrong_arity_is_an_arity_mismatch() {
        let mut output = String::new();
        let err = call("out", vec![], &mut ctx(&mut output)).unwrap_err();
        assert!(matches!(err, RuntimeError::ArityMismatch { .. }));
    }

    #[test]
    fn unknown_name_is_undefined_function() {
        let mut output = String::new();
        let err = call("nope", vec![], &mut ctx(&mut output)).unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedFunction(_)));
    }
}
