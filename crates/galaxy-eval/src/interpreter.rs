//! Tree-walking interpreter for mission programs.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use galaxy_types::ast::*;
use tracing::debug;

use crate::builtins;
use crate::config::EvalConfig;
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::members;
use crate::sandbox::{ConsoleEntry, ConsoleLevel};
use crate::value::{Fields, Function, Value};

/// How a statement finished.
#[derive(Debug)]
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Per-evaluation step counter.
///
/// Exhaustion is sticky: once over the limit every later tick fails too, so
/// a callback that swallows the error cannot keep the program running.
#[derive(Debug)]
struct Budget {
    used: Cell<u64>,
    limit: u64,
}

impl Budget {
    fn tick(&self) -> EvalResult<()> {
        let used = self.used.get().saturating_add(1);
        self.used.set(used);
        self.check()
    }

    fn check(&self) -> EvalResult<()> {
        if self.used.get() > self.limit {
            Err(EvalError::StepLimit(self.limit))
        } else {
            Ok(())
        }
    }
}

/// An assignable location.
enum Place {
    Binding(String),
    Property { object: Value, key: Value },
}

/// The mission interpreter.
///
/// Cheap to clone: clones share the step budget, call depth and console
/// buffer, which is how native callbacks stored inside streams re-enter the
/// interpreter that created them.
#[derive(Debug, Clone)]
pub struct Interpreter {
    budget: Rc<Budget>,
    depth: Rc<Cell<usize>>,
    console: Rc<RefCell<Vec<ConsoleEntry>>>,
    config: EvalConfig,
}

impl Interpreter {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            budget: Rc::new(Budget {
                used: Cell::new(0),
                limit: config.step_limit,
            }),
            depth: Rc::new(Cell::new(0)),
            console: Rc::new(RefCell::new(Vec::new())),
            config,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Steps consumed so far, capped at the limit.
    pub fn steps(&self) -> u64 {
        self.budget.used.get().min(self.budget.limit)
    }

    /// Fail if the step budget was exhausted anywhere, including inside a
    /// callback whose error was swallowed.
    pub fn check_budget(&self) -> EvalResult<()> {
        self.budget.check()
    }

    fn tick(&self) -> EvalResult<()> {
        self.budget.tick()
    }

    /// Record one console call.
    pub(crate) fn log(&self, level: ConsoleLevel, args: &[Value]) {
        let message = args.iter().map(Value::inspect).collect::<Vec<_>>().join(" ");
        debug!(target: "galaxy_eval::console", level = level.as_str(), "{message}");
        self.console.borrow_mut().push(ConsoleEntry { level, message });
    }

    pub(crate) fn take_logs(&self) -> Vec<ConsoleEntry> {
        std::mem::take(&mut *self.console.borrow_mut())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Programs
    // ══════════════════════════════════════════════════════════════════════

    /// Run a program as a function body and return what it returns.
    pub fn run(&self, program: &Program) -> EvalResult<Value> {
        let globals = Environment::global();
        builtins::install(&globals, self.config.capture_console);
        let scope = globals.function_child();
        let value = match self.exec_block(&program.body, &scope)? {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Break | Flow::Continue => Value::Undefined,
        };
        self.check_budget()?;
        Ok(value)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    /// Run statements in `env`, after hoisting their function declarations.
    fn exec_block(&self, stmts: &[Stmt], env: &Environment) -> EvalResult<Flow> {
        for stmt in stmts {
            if let Stmt::Function(decl) = stmt {
                if let Some(name) = &decl.name {
                    env.define(&name.name, closure(decl, env));
                }
            }
        }
        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&self, stmt: &Stmt, env: &Environment) -> EvalResult<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Import(import) => {
                builtins::check_import(import, env)?;
                Ok(Flow::Normal)
            }
            Stmt::VarDecl(decl) => {
                self.exec_var_decl(decl, env)?;
                Ok(Flow::Normal)
            }
            // Hoisted by the enclosing block.
            Stmt::Function(_) => Ok(Flow::Normal),
            Stmt::If(stmt) => {
                if self.eval_expr(&stmt.condition, env)?.is_truthy() {
                    self.exec_stmt(&stmt.then_branch, env)
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.exec_stmt(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(stmt) => self.exec_while(stmt, env),
            Stmt::For(stmt) => self.exec_for(stmt, env),
            Stmt::ForOf(stmt) => self.exec_for_of(stmt, env),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Throw(throw) => Err(EvalError::Thrown(self.eval_expr(&throw.value, env)?)),
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),
            Stmt::Block(block) => self.exec_block(&block.stmts, &env.child()),
            Stmt::Expr(stmt) => {
                self.eval_expr(&stmt.expr, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Empty(_) => Ok(Flow::Normal),
        }
    }

    fn exec_var_decl(&self, decl: &VarDecl, env: &Environment) -> EvalResult<()> {
        for declarator in &decl.declarators {
            let name = &declarator.name.name;
            let value = match &declarator.init {
                Some(init) => self.eval_expr(init, env)?,
                // `var x;` keeps an existing value.
                None if decl.kind == DeclKind::Var && env.get(name).is_some() => continue,
                None => Value::Undefined,
            };
            env.declare(name, value, decl.kind)?;
        }
        Ok(())
    }

    // ── Loops ─────────────────────────────────────────────────────────────

    fn exec_while(&self, stmt: &WhileStmt, env: &Environment) -> EvalResult<Flow> {
        loop {
            if !self.eval_expr(&stmt.condition, env)?.is_truthy() {
                return Ok(Flow::Normal);
            }
            match self.exec_stmt(&stmt.body, env)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
    }

    /// C-style `for`. A `let` loop variable gets a fresh binding per
    /// iteration, so closures created in the body see that iteration's value.
    fn exec_for(&self, stmt: &ForStmt, env: &Environment) -> EvalResult<Flow> {
        let loop_env = env.child();
        let mut per_iteration: Vec<(&str, DeclKind)> = Vec::new();
        if let Some(init) = &stmt.init {
            self.exec_stmt(init, &loop_env)?;
            if let Stmt::VarDecl(decl) = init.as_ref() {
                if decl.kind != DeclKind::Var {
                    per_iteration = decl
                        .declarators
                        .iter()
                        .map(|d| (d.name.name.as_str(), decl.kind))
                        .collect();
                }
            }
        }

        let mut iter_env = copy_bindings(&loop_env, env, &per_iteration)?;
        loop {
            self.tick()?;
            if let Some(condition) = &stmt.condition {
                if !self.eval_expr(condition, &iter_env)?.is_truthy() {
                    return Ok(Flow::Normal);
                }
            }
            match self.exec_stmt(&stmt.body, &iter_env)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            iter_env = copy_bindings(&iter_env, env, &per_iteration)?;
            if let Some(update) = &stmt.update {
                self.eval_expr(update, &iter_env)?;
            }
        }
    }

    fn exec_for_of(&self, stmt: &ForOfStmt, env: &Environment) -> EvalResult<Flow> {
        let iterable = self.eval_expr(&stmt.iterable, env)?;
        if !matches!(iterable, Value::Array(_) | Value::Str(_)) {
            return Err(EvalError::type_error(format!(
                "{} is not iterable",
                iterable.inspect()
            )));
        }
        let mut index = 0;
        while let Some(item) = nth_item(&iterable, index) {
            index += 1;
            let iter_env = env.child();
            iter_env.declare(&stmt.binding.name, item, stmt.kind)?;
            match self.exec_stmt(&stmt.body, &iter_env)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn eval_expr(&self, expr: &Expr, env: &Environment) -> EvalResult<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::from(s.as_str())),
            ExprKind::Template { quasis, exprs } => self.eval_template(quasis, exprs, env),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Array(elements) => self.eval_array(elements, env),
            ExprKind::Object(properties) => self.eval_object(properties, env),
            ExprKind::Function(decl) => Ok(closure(decl, env)),

            ExprKind::Identifier(name) => env
                .get(name)
                .ok_or_else(|| EvalError::Reference(name.clone())),

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, env),
            ExprKind::Update { op, prefix, target } => self.eval_update(*op, *prefix, target, env),
            ExprKind::Binary { left, op, right } => {
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                Ok(binary(*op, &left, &right))
            }
            ExprKind::Logical { left, op, right } => self.eval_logical(left, *op, right, env),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test, env)?.is_truthy() {
                    self.eval_expr(consequent, env)
                } else {
                    self.eval_expr(alternate, env)
                }
            }
            ExprKind::Assign { target, op, value } => self.eval_assign(target, *op, value, env),

            ExprKind::Member { object, property } => {
                let object = self.eval_expr(object, env)?;
                let key = self.eval_key(property, env)?;
                members::get_property(&object, &key)
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args, env),
            ExprKind::New { callee, args } => self.eval_new(callee, args, env),
        }
    }

    // ── Literals ──────────────────────────────────────────────────────────

    fn eval_template(&self, quasis: &[String], exprs: &[Expr], env: &Environment) -> EvalResult<Value> {
        let mut out = String::new();
        for (i, quasi) in quasis.iter().enumerate() {
            out.push_str(quasi);
            if let Some(expr) = exprs.get(i) {
                out.push_str(&self.eval_expr(expr, env)?.to_js_string());
            }
        }
        Ok(Value::from(out))
    }

    fn eval_array(&self, elements: &[Expr], env: &Environment) -> EvalResult<Value> {
        let items = elements
            .iter()
            .map(|e| self.eval_expr(e, env))
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(Value::array(items))
    }

    fn eval_object(&self, properties: &[Property], env: &Environment) -> EvalResult<Value> {
        let mut fields = Fields::new();
        for property in properties {
            let value = self.eval_expr(&property.value, env)?;
            fields.insert(property.key.name.clone(), value);
        }
        Ok(Value::object(fields))
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_unary(&self, op: UnaryOp, operand: &Expr, env: &Environment) -> EvalResult<Value> {
        // `typeof undeclared` is not an error.
        if let (UnaryOp::TypeOf, ExprKind::Identifier(name)) = (op, &operand.kind) {
            let type_of = env.get(name).map_or("undefined", |v| v.type_of());
            return Ok(Value::from(type_of));
        }
        let value = self.eval_expr(operand, env)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::from(value.type_of()),
        })
    }

    fn eval_update(&self, op: UpdateOp, prefix: bool, target: &Expr, env: &Environment) -> EvalResult<Value> {
        let place = self.resolve_place(target, env)?;
        let old = self.read_place(&place, env)?.to_number();
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.write_place(place, Value::Number(new), env)?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn eval_logical(&self, left: &Expr, op: LogicalOp, right: &Expr, env: &Environment) -> EvalResult<Value> {
        let left = self.eval_expr(left, env)?;
        let short_circuit = match op {
            LogicalOp::And => !left.is_truthy(),
            LogicalOp::Or => left.is_truthy(),
            LogicalOp::Nullish => !left.is_nullish(),
        };
        if short_circuit {
            Ok(left)
        } else {
            self.eval_expr(right, env)
        }
    }

    fn eval_assign(&self, target: &Expr, op: AssignOp, value: &Expr, env: &Environment) -> EvalResult<Value> {
        let place = self.resolve_place(target, env)?;
        let value = match op.binary() {
            None => self.eval_expr(value, env)?,
            Some(bin) => {
                let current = self.read_place(&place, env)?;
                let rhs = self.eval_expr(value, env)?;
                binary(bin, &current, &rhs)
            }
        };
        self.write_place(place, value.clone(), env)?;
        Ok(value)
    }

    // ── Places ────────────────────────────────────────────────────────────

    fn resolve_place(&self, target: &Expr, env: &Environment) -> EvalResult<Place> {
        match &target.kind {
            ExprKind::Identifier(name) => Ok(Place::Binding(name.clone())),
            ExprKind::Member { object, property } => Ok(Place::Property {
                object: self.eval_expr(object, env)?,
                key: self.eval_key(property, env)?,
            }),
            _ => Err(EvalError::type_error("Invalid assignment target")),
        }
    }

    fn read_place(&self, place: &Place, env: &Environment) -> EvalResult<Value> {
        match place {
            Place::Binding(name) => env.get(name).ok_or_else(|| EvalError::Reference(name.clone())),
            Place::Property { object, key } => members::get_property(object, key),
        }
    }

    fn write_place(&self, place: Place, value: Value, env: &Environment) -> EvalResult<()> {
        match place {
            Place::Binding(name) => env.assign(&name, value),
            Place::Property { object, key } => members::set_property(&object, &key, value),
        }
    }

    fn eval_key(&self, property: &MemberProperty, env: &Environment) -> EvalResult<Value> {
        match property {
            MemberProperty::Named(ident) => Ok(Value::from(ident.name.as_str())),
            MemberProperty::Computed(expr) => self.eval_expr(expr, env),
        }
    }

    // ── Calls ─────────────────────────────────────────────────────────────

    fn eval_args(&self, args: &[Expr], env: &Environment) -> EvalResult<Vec<Value>> {
        args.iter().map(|a| self.eval_expr(a, env)).collect()
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], env: &Environment) -> EvalResult<Value> {
        let function = self.eval_expr(callee, env)?;
        let args = self.eval_args(args, env)?;
        if !matches!(function, Value::Function(_)) {
            return Err(EvalError::type_error(format!(
                "{} is not a function",
                describe_callee(callee)
            )));
        }
        self.call(&function, args)
    }

    fn eval_new(&self, callee: &Expr, args: &[Expr], env: &Environment) -> EvalResult<Value> {
        let function = self.eval_expr(callee, env)?;
        let args = self.eval_args(args, env)?;
        match &function {
            Value::Function(f) => match f.as_ref() {
                Function::Native {
                    func,
                    constructor: true,
                    ..
                } => func(self, args),
                _ => Err(EvalError::type_error(format!("{} is not a constructor", f.name()))),
            },
            _ => Err(EvalError::type_error(format!(
                "{} is not a constructor",
                describe_callee(callee)
            ))),
        }
    }

    /// Call a function value with already-evaluated arguments.
    pub fn call(&self, function: &Value, args: Vec<Value>) -> EvalResult<Value> {
        let Value::Function(function) = function else {
            return Err(EvalError::type_error(format!(
                "{} is not a function",
                function.inspect()
            )));
        };
        match function.as_ref() {
            Function::Native {
                name,
                constructor: true,
                ..
            } => Err(EvalError::type_error(format!(
                "Class constructor {name} cannot be invoked without 'new'"
            ))),
            Function::Native { func, .. } => func(self, args),
            Function::Closure { decl, env } => {
                let depth = self.depth.get();
                if depth >= self.config.max_call_depth {
                    return Err(EvalError::CallDepth);
                }
                self.depth.set(depth + 1);
                let result = self.invoke(decl, env, args);
                self.depth.set(depth);
                result
            }
        }
    }

    fn invoke(&self, decl: &FunctionExpr, captured: &Environment, args: Vec<Value>) -> EvalResult<Value> {
        let scope = captured.function_child();
        let mut args = args.into_iter();
        for param in &decl.params {
            scope.define(&param.name, args.next().unwrap_or(Value::Undefined));
        }
        match &decl.body {
            FunctionBody::Expr(expr) => self.eval_expr(expr, &scope),
            FunctionBody::Block(block) => match self.exec_block(&block.stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::Undefined),
            },
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn closure(decl: &Rc<FunctionExpr>, env: &Environment) -> Value {
    Value::Function(Rc::new(Function::Closure {
        decl: Rc::clone(decl),
        env: env.clone(),
    }))
}

/// A new scope under `parent` holding copies of `names` from `from`.
fn copy_bindings(
    from: &Environment,
    parent: &Environment,
    names: &[(&str, DeclKind)],
) -> EvalResult<Environment> {
    if names.is_empty() {
        return Ok(from.clone());
    }
    let env = parent.child();
    for (name, kind) in names {
        env.declare(name, from.get(name).unwrap_or(Value::Undefined), *kind)?;
    }
    Ok(env)
}

fn nth_item(iterable: &Value, index: usize) -> Option<Value> {
    match iterable {
        Value::Array(items) => items.borrow().get(index).cloned(),
        Value::Str(s) => s.chars().nth(index).map(|c| Value::from(c.to_string())),
        _ => None,
    }
}

/// Source-like name of a callee for error messages, e.g. `results.push`.
fn describe_callee(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member {
            object,
            property: MemberProperty::Named(name),
        } => format!("{}.{}", describe_callee(object), name.name),
        ExprKind::Member { object, .. } => format!("{}[...]", describe_callee(object)),
        ExprKind::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        _ => "expression".to_string(),
    }
}

/// Apply a non-short-circuiting binary operator.
pub(crate) fn binary(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
        BinOp::LooseEq => Value::Bool(left.loose_eq(right)),
        BinOp::LooseNotEq => Value::Bool(!left.loose_eq(right)),
        BinOp::Less => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinOp::Greater => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinOp::LessEq => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinOp::GreaterEq => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

/// `+` concatenates as soon as either side is not a primitive number-like.
fn add(left: &Value, right: &Value) -> Value {
    let numeric = |v: &Value| {
        matches!(
            v,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
        )
    };
    if numeric(left) && numeric(right) {
        Value::Number(left.to_number() + right.to_number())
    } else {
        Value::from(format!("{}{}", left.to_js_string(), right.to_js_string()))
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_types::SourceFile;

    fn run(source: &str) -> EvalResult<Value> {
        run_with(source, EvalConfig::default())
    }

    fn run_with(source: &str, config: EvalConfig) -> EvalResult<Value> {
        let file = SourceFile::new("test.js", source);
        let program = galaxy_parser::parse_source(&file)
            .into_program()
            .unwrap_or_else(|errors| panic!("parse failed: {errors:?}"));
        Interpreter::new(config).run(&program)
    }

    fn num(source: &str) -> f64 {
        match run(source) {
            Ok(Value::Number(n)) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    fn string(source: &str) -> String {
        match run(source) {
            Ok(Value::Str(s)) => s.to_string(),
            other => panic!("expected a string, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(num("return 1 + 2 * 3"), 7.0);
        assert_eq!(num("return (1 + 2) * 3"), 9.0);
        assert_eq!(num("return 7 % 3"), 1.0);
        assert_eq!(num("return -7 % 3"), -1.0);
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(string("return 'a' + 1"), "a1");
        assert_eq!(string("return 1 + 2 + 'x'"), "3x");
        assert_eq!(string("return `n=${1 + 1}!`"), "n=2!");
        assert_eq!(string("return [1, 2] + ''"), "1,2");
    }

    #[test]
    fn test_comparisons() {
        assert!(matches!(run("return 'a' < 'b'"), Ok(Value::Bool(true))));
        assert!(matches!(run("return 2 >= 2"), Ok(Value::Bool(true))));
        assert!(matches!(run("return 1 < undefined"), Ok(Value::Bool(false))));
        assert!(matches!(run("return 1 == '1'"), Ok(Value::Bool(true))));
        assert!(matches!(run("return 1 === '1'"), Ok(Value::Bool(false))));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(num("let n = 0; false && (n = 1); true || (n = 2); return n"), 0.0);
        assert_eq!(num("return null ?? 5"), 5.0);
        assert_eq!(num("return 0 ?? 5"), 0.0);
        assert_eq!(num("return 0 || 5"), 5.0);
    }

    #[test]
    fn test_closures_share_scope() {
        let source = "
            let count = 0;
            const inc = () => { count += 1; };
            inc(); inc(); inc();
            return count;
        ";
        assert_eq!(num(source), 3.0);
    }

    #[test]
    fn test_function_hoisting() {
        assert_eq!(num("return twice(4); function twice(x) { return x * 2 }"), 8.0);
    }

    #[test]
    fn test_recursion() {
        let source = "
            function fact(n) { return n <= 1 ? 1 : n * fact(n - 1) }
            return fact(5);
        ";
        assert_eq!(num(source), 120.0);
    }

    #[test]
    fn test_loops() {
        assert_eq!(num("let s = 0; for (let i = 0; i < 5; i++) { s += i } return s"), 10.0);
        assert_eq!(num("let i = 0; while (true) { i++; if (i > 3) break; } return i"), 4.0);
        assert_eq!(
            num("let s = 0; for (const x of [1, 2, 3, 4]) { if (x % 2) continue; s += x } return s"),
            6.0
        );
    }

    #[test]
    fn test_for_let_binding_per_iteration() {
        let source = "
            const fns = [];
            for (let i = 0; i < 3; i++) { fns.push(() => i) }
            return fns.map(f => f()).join(',');
        ";
        assert_eq!(string(source), "0,1,2");
    }

    #[test]
    fn test_var_is_function_scoped() {
        assert_eq!(num("{ var v = 2 } return v"), 2.0);
        assert!(matches!(run("{ let l = 2 } return l"), Err(EvalError::Reference(_))));
    }

    #[test]
    fn test_update_expressions() {
        assert_eq!(num("let i = 5; const a = i++; return a * 10 + i"), 56.0);
        assert_eq!(num("let i = 5; const a = --i; return a * 10 + i"), 44.0);
        assert_eq!(num("const o = { n: 1 }; o.n++; o.n += 5; return o.n"), 7.0);
    }

    #[test]
    fn test_const_reassignment_fails() {
        assert!(matches!(run("const x = 1; x = 2"), Err(EvalError::ConstAssign(_))));
    }

    #[test]
    fn test_undeclared_assignment_fails() {
        assert!(matches!(run("ghost = 1"), Err(EvalError::Reference(_))));
    }

    #[test]
    fn test_typeof() {
        assert_eq!(string("return typeof nothing"), "undefined");
        assert_eq!(string("return typeof of"), "function");
        assert_eq!(string("return typeof []"), "object");
    }

    #[test]
    fn test_call_non_function_names_callee() {
        let err = run("const results = 1; results.push(2)").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: results.push is not a function");
    }

    #[test]
    fn test_call_depth_is_catchable_range_error() {
        let config = EvalConfig {
            max_call_depth: 16,
            ..EvalConfig::default()
        };
        let result = run_with("function f() { return f() } return f()", config);
        assert!(matches!(result, Err(EvalError::CallDepth)));
    }

    #[test]
    fn test_step_limit() {
        let config = EvalConfig {
            step_limit: 1_000,
            ..EvalConfig::default()
        };
        let result = run_with("while (true) {}", config);
        assert!(matches!(result, Err(EvalError::StepLimit(1_000))));
    }

    #[test]
    fn test_steps_are_deterministic() {
        let program = "let s = 0; for (let i = 0; i < 10; i++) { s += i } return s";
        let file = SourceFile::new("test.js", program);
        let program = galaxy_parser::parse_source(&file).into_program().unwrap();
        let a = Interpreter::new(EvalConfig::default());
        let b = Interpreter::new(EvalConfig::default());
        a.run(&program).unwrap();
        b.run(&program).unwrap();
        assert_eq!(a.steps(), b.steps());
        assert!(a.steps() > 0);
    }

    #[test]
    fn test_observable_requires_new() {
        let err = run("Observable(() => {})").unwrap_err();
        assert!(err.to_string().contains("cannot be invoked without 'new'"));
        assert!(run("new of(1)").is_err());
    }

    #[test]
    fn test_throw_is_uncaught() {
        let err = run("throw 'boom'").unwrap_err();
        assert_eq!(err.to_string(), "Uncaught boom");
    }
}
