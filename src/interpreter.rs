//! Tree-walking evaluator.
//!
//! Executes a [`Program`] against an [`Environment`], producing a final
//! [`Value`] and the text written by `out`/`input` prompts along the way.
//! Statement execution returns a [`Flow`] signal rather than using an
//! exception or a panic for `return`: `Flow::Normal` falls through,
//! `Flow::Returned(v)` unwinds block by block until it reaches the
//! function activation (or the top level, where it's an error) that should
//! consume it. This keeps the non-local exit entirely inside `Result`/
//! ordinary control flow, with nothing for user code to ever observe or
//! catch.

use std::collections::HashMap;
use std::io::BufRead;

use crate::ast::{BinaryOperator, Expression, Numeric, Param, Program, Statement, TypeTag, UnaryOperator, Value};
use crate::builtin::{self, BuiltinContext};
use crate::environment::Environment;
use crate::error::RuntimeError;

/// A user-defined function's declaration, captured once at startup so the
/// function table doesn't borrow from the `Program` it came from.
#[derive(Clone)]
struct FunctionEntry {
    params: Vec<Param>,
    body: Vec<Statement>,
}

/// The non-local signal a statement's execution can carry upward. Only
/// `Return` produces `Returned`; every other statement always produces
/// `Normal` once it (and anything it recursively executes) is done.
enum Flow {
    Normal,
    Returned(Value),
}

/// Executes one [`Program`]. Holds the environment chain, the function
/// table, the accumulated output buffer, and an optional input stream for
/// `input()` - everything a single `compile` call owns exclusively, per
/// the concurrency model (no state is shared across evaluations).
pub struct Interpreter<'a> {
    env: Environment,
    functions: HashMap<String, FunctionEntry>,
    output: String,
    stdin: Option<&'a mut dyn BufRead>,
    /// Number of function activations currently on the stack. `Return`
    /// outside of any function (`call_depth == 0`) is a `ReturnOutsideFunction`
    /// error rather than a silent no-op.
    call_depth: usize,
}

/// Everything a completed evaluation produced: the program's result value
/// and everything written via `out`/`input` prompts.
pub struct EvalOutcome {
    pub value: Value,
    pub output: String,
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            functions: HashMap::new(),
            output: String::new(),
            stdin: None,
            call_depth: 0,
        }
    }

    pub fn with_stdin(stdin: &'a mut dyn BufRead) -> Self {
        Self {
            env: Environment::new(),
            functions: HashMap::new(),
            output: String::new(),
            stdin: Some(stdin),
            call_depth: 0,
        }
    }

    /// Runs the whole program: collects every top-level `FunctionDecl` into
    /// the function table, then calls `main` if one exists, otherwise runs
    /// the top-level non-declaration statements in order and returns the
    /// value of the last top-level expression statement (or `Null`).
    pub fn run(mut self, program: &Program) -> Result<EvalOutcome, RuntimeError> {
        for stmt in &program.statements {
            if let Statement::FunctionDecl { name, params, body } = stmt {
                self.functions.insert(
                    name.clone(),
                    FunctionEntry {
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
            }
        }

        let value = if self.functions.contains_key("main") {
            self.call_function("main", Vec::new())?
        } else {
            let mut last = Value::Null;
            for stmt in &program.statements {
                if matches!(stmt, Statement::FunctionDecl { .. }) {
                    continue;
                }
                if let Statement::ExpressionStatement(expr) = stmt {
                    last = self.evaluate_expression(expr)?;
                } else {
                    self.execute_statement(stmt)?;
                }
            }
            last
        };

        Ok(EvalOutcome {
            value,
            output: self.output,
        })
    }

    // ---- statement execution --------------------------------------------

    /// Runs `stmts` inside a freshly pushed block frame, released on every
    /// exit path (normal, error, or return unwind) by `Environment`'s scope
    /// guard.
    fn execute_block(&mut self, stmts: &[Statement]) -> Result<Flow, RuntimeError> {
        let _guard = self.env.enter_block();
        self.execute_statements(stmts)
    }

    /// Runs `stmts` in the *current* frame, without pushing a new one -
    /// used for a function body, whose own frame is the call's activation
    /// frame rather than an extra nested block.
    fn execute_statements(&mut self, stmts: &[Statement]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.execute_statement(stmt)? {
                Flow::Normal => {}
                returned @ Flow::Returned(_) => return Ok(returned),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_statement(&mut self, stmt: &Statement) -> Result<Flow, RuntimeError> {
        match stmt {
            Statement::TypedDeclaration { type_tag, name, value } => {
                let v = self.evaluate_expression(value)?;
                let narrowed = narrow(type_tag, v)?;
                self.env.define(name, narrowed);
                Ok(Flow::Normal)
            }
            Statement::Assignment { name, value } => {
                let v = self.evaluate_expression(value)?;
                self.env.assign(name, v);
                Ok(Flow::Normal)
            }
            Statement::ExpressionStatement(expr) => {
                self.evaluate_expression(expr)?;
                Ok(Flow::Normal)
            }
            Statement::Block(stmts) => self.execute_block(stmts),
            Statement::If { condition, then_branch, else_branch } => {
                if self.evaluate_expression(condition)?.is_truthy() {
                    self.execute_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_block(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate_expression(condition)?.is_truthy() {
                    match self.execute_block(body)? {
                        Flow::Normal => {}
                        returned @ Flow::Returned(_) => return Ok(returned),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::For { init, condition, update, body } => {
                let _guard = self.env.enter_block();
                if let Some(init) = init {
                    self.execute_statement(init)?;
                }
                loop {
                    let should_run = match condition {
                        Some(cond) => self.evaluate_expression(cond)?.is_truthy(),
                        None => true,
                    };
                    if !should_run {
                        break;
                    }
                    match self.execute_block(body)? {
                        Flow::Normal => {}
                        returned @ Flow::Returned(_) => return Ok(returned),
                    }
                    if let Some(update) = update {
                        self.execute_statement(update)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(expr) => {
                if self.call_depth == 0 {
                    return Err(RuntimeError::ReturnOutsideFunction);
                }
                let value = match expr {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Returned(value))
            }
            Statement::FunctionDecl { .. } => {
                // Collected into the function table during `run`'s first pass.
                Ok(Flow::Normal)
            }
        }
    }

    // ---- expression evaluation -------------------------------------------

    fn evaluate_expression(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::IntLit(n) => Ok(Value::Int(*n)),
            Expression::FloatLit(n) => Ok(Value::Float(*n)),
            Expression::StringLit(s) => Ok(Value::String(s.clone())),
            Expression::BoolLit(b) => Ok(Value::Bool(*b)),
            Expression::Identifier(name) => self
                .env
                .get(name)
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
            Expression::Unary { operator, operand } => {
                let value = self.evaluate_expression(operand)?;
                evaluate_unary(operator, value)
            }
            Expression::Binary { left, operator, right } => self.evaluate_binary(operator, left, right),
            Expression::Call { name, args } => self.evaluate_call(name, args),
        }
    }

    /// `and`/`or` short-circuit and yield the last *evaluated* operand
    /// (not coerced to `Bool`); every other binary operator evaluates both
    /// sides first.
    fn evaluate_binary(
        &mut self,
        operator: &BinaryOperator,
        left: &Expression,
        right: &Expression,
    ) -> Result<Value, RuntimeError> {
        match operator {
            BinaryOperator::And => {
                let l = self.evaluate_expression(left)?;
                if !l.is_truthy() {
                    return Ok(l);
                }
                self.evaluate_expression(right)
            }
            BinaryOperator::Or => {
                let l = self.evaluate_expression(left)?;
                if l.is_truthy() {
                    return Ok(l);
                }
                self.evaluate_expression(right)
            }
            _ => {
                let l = self.evaluate_expression(left)?;
                let r = self.evaluate_expression(right)?;
                evaluate_binary_op(operator, l, r)
            }
        }
    }

    fn evaluate_call(&mut self, name: &str, args: &[Expression]) -> Result<Value, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_expression(arg)?);
        }

        if builtin::is_builtin(name) {
            let mut ctx = BuiltinContext {
                output: &mut self.output,
                stdin: self.stdin.as_deref_mut(),
            };
            return builtin::call(name, values, &mut ctx);
        }

        self.call_function(name, values)
    }

    /// Pushes a frame parented directly to the global frame (functions
    /// never see block scopes from their call site), binds parameters with
    /// type narrowing where tagged, and runs the body. Falling off the end
    /// yields `Null`.
    fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let entry = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;

        if args.len() != entry.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: entry.params.len(),
                got: args.len(),
            });
        }

        let _guard = self.env.enter_function();
        for (param, value) in entry.params.iter().zip(args) {
            let bound = match &param.type_tag {
                Some(tag) => narrow(tag, value)?,
                None => value,
            };
            self.env.define(&param.name, bound);
        }

        self.call_depth += 1;
        let result = self.execute_statements(&entry.body);
        self.call_depth -= 1;

        match result? {
            Flow::Returned(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
        }
    }
}

/// Narrows `value` to `tag` at bind time, per the `int(v)`/`float(v)`
/// coercions for numeric tags, `str`-style rendering for `string`, and
/// truthiness for `bool` (there is no `bool()` builtin - this is the only
/// place a value ever becomes a `Bool` by coercion rather than literal).
fn narrow(tag: &TypeTag, value: Value) -> Result<Value, RuntimeError> {
    match tag {
        TypeTag::Int => Ok(Value::Int(builtin::to_int(&value)?)),
        TypeTag::Float => Ok(Value::Float(builtin::to_float(&value)?)),
        TypeTag::String => Ok(Value::String(value.to_display_string())),
        TypeTag::Bool => Ok(Value::Bool(value.is_truthy())),
    }
}

fn evaluate_unary(operator: &UnaryOperator, value: Value) -> Result<Value, RuntimeError> {
    match operator {
        UnaryOperator::Negate => match value.as_numeric()? {
            Numeric::Int(n) => Ok(Value::Int(-n)),
            Numeric::Float(n) => Ok(Value::Float(-n)),
        },
        UnaryOperator::Not => Ok(Value::Bool(!value.is_truthy())),
    }
}

fn evaluate_binary_op(operator: &BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator {
        BinaryOperator::Add => evaluate_add(left, right),
        BinaryOperator::Subtract => evaluate_arithmetic(left, right, |a, b| a - b, |a, b| a.checked_sub(b)),
        BinaryOperator::Multiply => evaluate_arithmetic(left, right, |a, b| a * b, |a, b| a.checked_mul(b)),
        BinaryOperator::Divide => evaluate_divide(left, right),
        BinaryOperator::Modulo => evaluate_modulo(left, right),
        BinaryOperator::Equal => Ok(Value::Bool(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOperator::Greater => evaluate_comparison(left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOperator::Less => evaluate_comparison(left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOperator::GreaterEqual => {
            evaluate_comparison(left, right, |o| o != std::cmp::Ordering::Less)
        }
        BinaryOperator::LessEqual => {
            evaluate_comparison(left, right, |o| o != std::cmp::Ordering::Greater)
        }
        // `and`/`or` are short-circuited in `evaluate_binary` and never
        // reach this generic path.
        BinaryOperator::And | BinaryOperator::Or => unreachable!("short-circuit operators handled earlier"),
    }
}

/// `+`: string concatenation when either side is a `String` (coercing the
/// other side via `str`), else numeric addition with Int/Float promotion.
fn evaluate_add(left: Value, right: Value) -> Result<Value, RuntimeError> {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(format!(
            "{}{}",
            left.to_display_string(),
            right.to_display_string()
        )));
    }
    evaluate_arithmetic(left, right, |a, b| a + b, |a, b| a.checked_add(b))
}

/// Shared numeric-promotion path for `-`, `*`, and (string-excluded) `+`:
/// `Int op Int` stays `Int` via the checked variant (overflow is a
/// `TypeError` rather than silently wrapping); any `Float` operand
/// promotes both sides to `Float`.
fn evaluate_arithmetic(
    left: Value,
    right: Value,
    float_op: impl Fn(f64, f64) -> f64,
    int_op: impl Fn(i64, i64) -> Option<i64>,
) -> Result<Value, RuntimeError> {
    match (left.as_numeric()?, right.as_numeric()?) {
        (Numeric::Int(a), Numeric::Int(b)) => int_op(a, b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::TypeError("integer overflow".to_string())),
        (a, b) => Ok(Value::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

/// `/` truncates toward zero for `Int / Int`; any `Float` operand produces
/// a `Float` result via true division.
fn evaluate_divide(left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (left.as_numeric()?, right.as_numeric()?) {
        (Numeric::Int(a), Numeric::Int(b)) => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(a / b))
        }
        (a, b) => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(a.as_f64() / divisor))
        }
    }
}

fn evaluate_modulo(left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (left.as_numeric()?, right.as_numeric()?) {
        (Numeric::Int(a), Numeric::Int(b)) => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(a % b))
        }
        (a, b) => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(a.as_f64() % divisor))
        }
    }
}

/// `<`/`>`/`<=`/`>=`: numeric on both sides (with promotion), or
/// lexicographic on both `String`s; anything else is a `TypeError`.
fn evaluate_comparison(
    left: Value,
    right: Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    let ordering = match (&left, &right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            let a = left.as_numeric()?.as_f64();
            let b = right.as_numeric()?.as_f64();
            a.partial_cmp(&b)
                .ok_or_else(|| RuntimeError::TypeError("cannot compare NaN".to_string()))?
        }
    };
    Ok(Value::Bool(accept(ordering)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run_source(source: &str) -> EvalOutcome {
        let tokens = Lexer::new(source).tokenize().expect("should lex");
        let program = Parser::new(tokens).parse().expect("should parse");
        Interpreter::new().run(&program).expect("should evaluate")
    }

    fn run_source_err(source: &str) -> RuntimeError {
        let tokens = Lexer::new(source).tokenize().expect("should lex");
        let program = Parser::new(tokens).parse().expect("should parse");
        Interpreter::new().run(&program).unwrap_err()
    }

    #[test]
    fn hello_world() {
        let outcome = run_source(r#"fn main() { out("Hello, World!") }"#);
        assert_eq!(outcome.output, "Hello, World!\n");
        assert_eq!(outcome.value, Value::Null);
    }

    #[test]
    fn arithmetic_and_string_coercion() {
        let outcome = run_source(r#"fn main() { int x = 42  y = x * 2  out("Result: " + str(y)) }"#);
        assert_eq!(outcome.output, "Result: 84\n");
    }

    #[test]
    fn conditional_without_parens() {
        let outcome =
            run_source(r#"fn main() { int x = 42  if x > 40 { out("big") } else { out("small") } }"#);
        assert_eq!(outcome.output, "big\n");
    }

    #[test]
    fn while_loop() {
        let outcome = run_source(
            r#"fn main() { i = 0  while i < 3 { out("Count: " + str(i))  i = i + 1 } }"#,
        );
        assert_eq!(outcome.output, "Count: 0\nCount: 1\nCount: 2\n");
    }

    #[test]
    fn function_call_with_return() {
        let outcome =
            run_source("fn add(a int, b int) { return a + b }  fn main() { out(str(add(2, 3))) }");
        assert_eq!(outcome.output, "5\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let err = run_source_err("fn main() { x = 1 / 0 }");
        assert!(matches!(err, RuntimeError::DivisionByZero));
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        let outcome = run_source("fn main() { out(str(7 / 2)) }");
        assert_eq!(outcome.output, "3\n");
        let outcome = run_source("fn main() { out(str(-7 / 2)) }");
        assert_eq!(outcome.output, "-3\n");
    }

    #[test]
    fn numeric_equality_promotes_int_and_float() {
        let outcome = run_source("fn main() { out(str(1 == 1.0)) }");
        assert_eq!(outcome.output, "true\n");
    }

    #[test]
    fn left_associative_addition_matches_either_grouping() {
        let a = run_source("fn main() { out(str((1 + 2) + 3)) }");
        let b = run_source("fn main() { out(str(1 + (2 + 3))) }");
        assert_eq!(a.output, b.output);
    }

    #[test]
    fn short_circuit_and_never_evaluates_rhs() {
        let outcome =
            run_source(r#"fn side() { out("side") return true } fn main() { false and side() }"#);
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn short_circuit_or_never_evaluates_rhs() {
        let outcome =
            run_source(r#"fn side() { out("side") return true } fn main() { true or side() }"#);
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn block_scoped_variable_does_not_leak_out() {
        let outcome = run_source(
            r#"fn main() { int x = 1  if true { int x = 2 }  out(str(x)) }"#,
        );
        assert_eq!(outcome.output, "1\n");
    }

    #[test]
    fn untyped_assignment_updates_outer_binding() {
        let outcome = run_source(r#"fn main() { int x = 1  if true { x = 2 }  out(str(x)) }"#);
        assert_eq!(outcome.output, "2\n");
    }

    #[test]
    fn three_clause_for_loop_runs_as_c_style() {
        let outcome = run_source("fn main() { for int i = 0; i < 3; i = i + 1 { out(str(i)) } }");
        assert_eq!(outcome.output, "0\n1\n2\n");
    }

    #[test]
    fn function_activations_do_not_see_caller_block_locals() {
        let err = run_source_err(r#"fn f() { return outer } fn main() { int outer = 1  f() }"#);
        assert!(matches!(err, RuntimeError::UndefinedVariable(_)));
    }

    #[test]
    fn program_without_main_runs_top_level_statements_in_order() {
        let tokens = Lexer::new(r#"out("a")  out("b")  5"#).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let outcome = Interpreter::new().run(&program).unwrap();
        assert_eq!(outcome.output, "a\nb\n");
        assert_eq!(outcome.value, Value::Int(5));
    }

    // ==================== EDGE CASES ====================

    #[test]
    fn return_outside_function_is_an_error() {
        let tokens = Lexer::new("return 1").tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let err = Interpreter::new().run(&program).unwrap_err();
        assert!(matches!(err, RuntimeError::ReturnOutsideFunction));
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let err = run_source_err("fn add(a, b) { return a + b } fn main() { add(1) }");
        assert!(matches!(err, RuntimeError::ArityMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn undefined_variable_is_reported() {
        let err = run_source_err("fn main() { out(str(missing)) }");
        assert!(matches!(err, RuntimeError::UndefinedVariable(_)));
    }

    #[test]
    fn undefined_function_is_reported() {
        let err = run_source_err("fn main() { nope() }");
        assert!(matches!(err, RuntimeError::UndefinedFunction(_)));
    }

    #[test]
    fn adding_string_and_number_coerces_to_string() {
        let outcome = run_source(r#"fn main() { out("n=" + 5) }"#);
        assert_eq!(outcome.output, "n=5\n");
    }

    #[test]
    fn comparing_incompatible_types_is_a_type_error() {
        let err = run_source_err(r#"fn main() { x = "a" < 1 }"#);
        assert!(matches!(err, RuntimeError::TypeError(_)));
    }

    #[test]
    fn falling_off_the_end_of_a_function_yields_null() {
        let outcome = run_source(r#"fn f() { } fn main() { out(str(f())) }"#);
        assert_eq!(outcome.output, "null\n");
    }

    #[test]
    fn input_without_an_attached_stream_is_input_unavailable() {
        let err = run_source_err(r#"fn main() { input() }"#);
        assert!(matches!(err, RuntimeError::InputUnavailable));
    }

    #[test]
    fn input_reads_successive_lines_in_order() {
        let tokens = Lexer::new(r#"fn main() { out(input())  out(input()) }"#)
            .tokenize()
            .unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let mut stdin: &[u8] = b"first\nsecond\n";
        let outcome = Interpreter::with_stdin(&mut stdin).run(&program).unwrap();
        assert_eq!(outcome.output, "first\nsecond\n");
    }
}
