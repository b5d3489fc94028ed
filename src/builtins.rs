///! Native procedures.
///!
///! Each entry carries its minimum argument count, whether it takes more,
///! and whether it is a macro. Macros get their arguments unevaluated and
///! return an expression that the evaluator then evaluates in the caller's
///! context; most of the ones here just rewrite into `make-function` or
///! `set` calls, built from the natives themselves so that rebinding a
///! name like `set` cannot change what they expand to.

use crate::env::EnvId;
use crate::error::{Error, Result};
use crate::eval::{Interpreter, Native};
use crate::value::Val;

macro_rules! native {
    ($name:literal, $aliases:expr, $min:literal, $variadic:literal, $macro:literal, $func:path) => {
        Native {
            name: $name,
            aliases: $aliases,
            min_args: $min,
            variadic: $variadic,
            is_macro: $macro,
            func: $func,
        }
    };
}

/// The native table every root context is populated from.
pub fn natives() -> Vec<Native> {
    vec![
        //       name             aliases   min  var    macro
        native!("add",            &["+"],   2, true,  false, add),
        native!("sub",            &["-"],   2, false, false, sub),
        native!("mul",            &["*"],   2, false, false, mul),
        native!("divi",           &["/"],   2, false, false, divi),
        native!("print",          &[],      1, true,  false, print),
        native!("quote",          &[],      1, false, true,  quote),
        native!("set",            &[],      2, false, false, set),
        native!("setq",           &[],      2, false, true,  setq),
        native!("def",            &[],      2, false, true,  def),
        native!("define",         &[],      2, false, false, define),
        native!("progn",          &[],      0, true,  false, progn),
        native!("make-function",  &[],      4, false, false, make_function),
        native!("lambda",         &[],      1, true,  true,  lambda),
        native!("function",       &[],      1, true,  true,  function),
        native!("macro",          &[],      1, true,  true,  macro_fn),
        native!("defun",          &[],      2, true,  true,  defun),
        native!("defmacro",       &[],      2, true,  true,  defmacro),
        native!("let",            &[],      1, true,  true,  let_form),
        native!("if",             &[],      2, true,  true,  if_form),
        native!("list",           &[],      0, true,  false, list),
        native!("pair",           &[],      2, false, false, pair),
        native!("first",          &[],      1, false, false, first),
        native!("rest",           &[],      1, false, false, rest),
        native!("second",         &[],      1, false, false, second),
        native!("third",          &[],      1, false, false, third),
        native!("eq?",            &["=="],  2, false, false, num_eq),
        native!("le",             &["<="],  2, false, false, le),
        native!("lt",             &["<"],   2, false, false, lt),
        native!("ge",             &[">="],  2, false, false, ge),
        native!("gt",             &[">"],   2, false, false, gt),
        native!("equal?",         &[],      2, false, false, equal),
        native!("not",            &[],      1, false, false, not),
        native!("null?",          &[],      1, false, false, null_p),
        native!("atom?",          &[],      1, false, false, atom_p),
        native!("str-to-num",     &[],      1, false, false, str_to_num),
    ]
}

// ── Argument helpers ──

fn number_arg(interp: &Interpreter, args: &[Val], i: usize) -> Result<f64> {
    args[i].as_number().ok_or_else(|| wrong_type(interp, "number", args[i]))
}

fn symbol_arg(interp: &Interpreter, args: &[Val], i: usize) -> Result<u32> {
    args[i].as_symbol().ok_or_else(|| wrong_type(interp, "symbol", args[i]))
}

fn string_arg<'a>(interp: &'a Interpreter, args: &[Val], i: usize) -> Result<&'a str> {
    interp
        .heap
        .get_string(args[i])
        .ok_or_else(|| wrong_type(interp, "string", args[i]))
}

pub(crate) fn wrong_type(interp: &Interpreter, expected: &str, got: Val) -> Error {
    Error::wrong_type(
        expected,
        format!("{} {}", interp.type_name(got), interp.render_debug(got, None)),
    )
}

fn native_val(interp: &Interpreter, name: &str) -> Result<Val> {
    interp
        .native_named(name)
        .ok_or_else(|| Error::undefined_name(name))
}

// ── Arithmetic ──

fn add(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    let mut sum = 0.0;
    for i in 0..args.len() {
        sum += number_arg(interp, args, i)?;
    }
    Ok(Val::number(sum))
}

fn binary_op(interp: &Interpreter, args: &[Val], op: fn(f64, f64) -> f64) -> Result<Val> {
    let a = number_arg(interp, args, 0)?;
    let b = number_arg(interp, args, 1)?;
    Ok(Val::number(op(a, b)))
}

fn sub(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    binary_op(interp, args, |a, b| a - b)
}

fn mul(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    binary_op(interp, args, |a, b| a * b)
}

fn divi(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    binary_op(interp, args, |a, b| a / b)
}

// ── Output ──

fn print(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    let text: String = args.iter().map(|v| interp.render(*v, None)).collect();
    let out = interp.output();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
    Ok(Val::nil())
}

// ── Quoting and assignment ──

/// Never reached through `eval`, which handles quote itself; kept callable
/// so the native has the same shape as every other macro.
fn quote(_interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(args[0])
}

fn set(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    let sym = symbol_arg(interp, args, 0)?;
    interp.envs.root_set(ctx, sym, args[1]);
    Ok(args[1])
}

/// (setq name value) → (set (quote name) value)
fn setq(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    let set = native_val(interp, "set")?;
    let name = interp.quoted(args[0]);
    Ok(interp.list(&[set, name, args[1]]))
}

/// (def name value) → (define (quote name) value)
fn def(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    let define = native_val(interp, "define")?;
    let name = interp.quoted(args[0]);
    Ok(interp.list(&[define, name, args[1]]))
}

/// Bind in the caller's own frame; an existing binding there is an error.
fn define(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    let sym = symbol_arg(interp, args, 0)?;
    interp.define_sym(ctx, sym, args[1])?;
    Ok(args[1])
}

fn progn(_interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(args.last().copied().unwrap_or(Val::nil()))
}

// ── Functions ──

/// (make-function formals body lexical? macro?)
fn make_function(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    let env = if args[2].is_true() { ctx } else { interp.root(ctx) };
    interp.make_closure(args[0], args[1], env, args[3].is_true())
}

/// Rewrite `(formals body...)` into a `make-function` call.
fn function_expansion(
    interp: &mut Interpreter,
    args: &[Val],
    lexical: bool,
    is_macro: bool,
) -> Result<Val> {
    let formals = args[0];
    if !interp.heap.is_list(formals) {
        return Err(wrong_type(interp, "formals list", formals));
    }
    let make_function = native_val(interp, "make-function")?;
    let body = interp.list(&args[1..]);
    let formals = interp.quoted(formals);
    let body = interp.quoted(body);
    let t = interp.t();
    let lexical = if lexical { interp.quoted(t) } else { Val::nil() };
    let is_macro = if is_macro { interp.quoted(t) } else { Val::nil() };
    Ok(interp.list(&[make_function, formals, body, lexical, is_macro]))
}

fn lambda(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    function_expansion(interp, args, true, false)
}

/// Like lambda, but closes over the root context instead of the current one.
fn function(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    function_expansion(interp, args, false, false)
}

fn macro_fn(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    function_expansion(interp, args, true, true)
}

/// (defun name formals body...) → (set (quote name) <lambda>)
fn named_function(interp: &mut Interpreter, args: &[Val], is_macro: bool) -> Result<Val> {
    symbol_arg(interp, args, 0)?;
    let set = native_val(interp, "set")?;
    let name = interp.quoted(args[0]);
    let function = function_expansion(interp, &args[1..], true, is_macro)?;
    Ok(interp.list(&[set, name, function]))
}

fn defun(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    named_function(interp, args, false)
}

fn defmacro(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    named_function(interp, args, true)
}

/// (let ((name value)...) body...) → ((lambda (name...) body...) value...)
fn let_form(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    let bindings = interp
        .heap
        .list_to_vec(args[0])
        .ok_or_else(|| wrong_type(interp, "binding list", args[0]))?;

    let mut names = Vec::with_capacity(bindings.len());
    let mut values = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match interp.heap.list_to_vec(binding).as_deref() {
            Some(&[name, value]) => {
                names.push(name);
                values.push(value);
            }
            _ => return Err(wrong_type(interp, "(name value)", binding)),
        }
    }

    let formals = interp.list(&names);
    let mut lambda_args = vec![formals];
    lambda_args.extend_from_slice(&args[1..]);
    let function = function_expansion(interp, &lambda_args, true, false)?;

    let mut call = vec![function];
    call.extend(values);
    Ok(interp.list(&call))
}

/// (if cond then [else]): the condition is evaluated here; the chosen
/// branch is handed back for the evaluator to run.
fn if_form(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    if args.len() > 3 {
        return Err(Error::arity_mismatch("2 or 3", args.len()));
    }
    if interp.eval(args[0], ctx)?.is_true() {
        Ok(args[1])
    } else {
        Ok(args.get(2).copied().unwrap_or(Val::nil()))
    }
}

// ── Lists ──

fn list(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.list(args))
}

fn pair(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.heap.cons(args[0], args[1]))
}

fn first(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.heap.nth(args[0], 0))
}

fn rest(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.heap.rest(args[0]).unwrap_or(Val::nil()))
}

fn second(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.heap.nth(args[0], 1))
}

fn third(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.heap.nth(args[0], 2))
}

// ── Predicates ──

fn compare(interp: &Interpreter, args: &[Val], cmp: fn(f64, f64) -> bool) -> Result<Val> {
    let a = number_arg(interp, args, 0)?;
    let b = number_arg(interp, args, 1)?;
    Ok(interp.boolean(cmp(a, b)))
}

fn num_eq(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    compare(interp, args, |a, b| a == b)
}

fn le(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    compare(interp, args, |a, b| a <= b)
}

fn lt(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    compare(interp, args, |a, b| a < b)
}

fn ge(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    compare(interp, args, |a, b| a >= b)
}

fn gt(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    compare(interp, args, |a, b| a > b)
}

fn equal(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.boolean(interp.equals(args[0], args[1])))
}

fn not(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.boolean(!args[0].is_true()))
}

fn null_p(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.boolean(args[0].is_nil()))
}

fn atom_p(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    Ok(interp.boolean(interp.heap.is_atom(args[0])))
}

// ── Conversion ──

/// Same shape as a number literal: `-`, digits, optionally `.` and more
/// digits. No exponent, no `inf` or `NaN`.
fn is_number_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn str_to_num(interp: &mut Interpreter, args: &[Val], _ctx: EnvId) -> Result<Val> {
    let text = string_arg(interp, args, 0)?.trim();
    match text.parse::<f64>() {
        Ok(n) if is_number_literal(text) => Ok(Val::number(n)),
        _ => Err(wrong_type(interp, "numeric string", args[0])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::capturing_interpreter;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> String {
        let mut interp = Interpreter::new();
        let root = interp.new_root_context();
        let v = interp.eval_str(src, root).unwrap();
        interp.render(v, None)
    }

    fn run_err(src: &str) -> ErrorKind {
        let mut interp = Interpreter::new();
        let root = interp.new_root_context();
        interp.eval_str(src, root).unwrap_err().kind().clone()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("(add 1 2.0 3)"), "6");
        assert_eq!(run("(+ 1 2)"), "3");
        assert_eq!(run("(sub 42 20.5)"), "21.5");
        assert_eq!(run("(- 1 3)"), "-2");
        assert_eq!(run("(mul 6 3)"), "18");
        assert_eq!(run("(divi 12 2)"), "6");
        assert_eq!(run("(/ 1 4)"), "0.25");
    }

    #[test]
    fn arithmetic_rejects_non_numbers() {
        assert!(matches!(run_err("(sub 'a 1)"), ErrorKind::WrongType { .. }));
        assert!(matches!(run_err("(add 1 2 \"3\")"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn print_writes_rendered_arguments() {
        let (mut interp, captured) = capturing_interpreter();
        let root = interp.new_root_context();
        let v = interp
            .eval_str("(print \"n = \" (add 1 1) \" \" '(a \"b\") \"\\n\")", root)
            .unwrap();
        assert!(v.is_nil());
        assert_eq!(captured.text(), "n = 2 (a b)\n");
    }

    #[test]
    fn set_and_setq_assign_globally() {
        assert_eq!(run("(progn (set 'foo 42) foo)"), "42");
        assert_eq!(run("(progn (setq foo 42) 99 foo)"), "42");
        assert_eq!(run("(setq foo 7)"), "7");
    }

    #[test]
    fn set_updates_enclosing_binding() {
        let src = "(progn \
                     (setq counter 0) \
                     (defun bump () (setq counter (add counter 1))) \
                     (bump) (bump) \
                     counter)";
        assert_eq!(run(src), "2");

        let mut interp = Interpreter::new();
        let root = interp.new_root_context();
        let v = interp.eval_str("((lambda (x) (setq x 5) x) 1)", root).unwrap();
        assert_eq!(v, Val::number(5.0));
        assert!(interp.get(root, "x").is_err());
    }

    #[test]
    fn set_wants_a_symbol() {
        assert!(matches!(run_err("(set 1 2)"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn def_binds_in_current_frame_only_once() {
        assert_eq!(run("(progn (def x 1) x)"), "1");
        assert_eq!(run_err("(progn (def x 1) (def x 2))"), ErrorKind::RedefinedName("x".into()));
        assert_eq!(run("(progn (def x 1) ((lambda () (def x 2) x)))"), "2");
        assert_eq!(run("(progn (def y (add 1 1)) y)"), "2");
        assert_eq!(run("(progn (define 'z 3) z)"), "3");
        assert!(matches!(run_err("(def 1 2)"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn progn_returns_last() {
        assert_eq!(run("(progn 1 2 3 4 5)"), "5");
        assert_eq!(run("(progn)"), "()");
    }

    #[test]
    fn function_captures_root_not_local_scope() {
        let src = "(progn \
                     (setq v 'global) \
                     (setq make (lambda (v) (list (lambda () v) (function () v)))) \
                     (setq fs (make 'local)) \
                     (list ((first fs)) ((second fs))))";
        assert_eq!(run(src), "(local global)");
    }

    #[test]
    fn make_function_validates_formals() {
        assert!(matches!(run_err("(lambda (1) 1)"), ErrorKind::WrongType { .. }));
        assert!(matches!(run_err("(lambda x 1)"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn defun_and_recursion() {
        let src = "(progn \
                     (defun fib (n) \
                       (if (<= n 1) 1 (add (fib (sub n 1)) (fib (sub n 2))))) \
                     (fib 10))";
        assert_eq!(run(src), "89");
    }

    #[test]
    fn let_binds_in_a_fresh_frame() {
        assert_eq!(run("(let ((a 1) (b 2)) (add a b))"), "3");
        assert_eq!(run("(progn (setq a 10) (let ((a 1)) a) a)"), "10");
        assert_eq!(run("(let () 4)"), "4");
        assert!(matches!(run_err("(let (a) a)"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn if_evaluates_only_chosen_branch() {
        assert_eq!(run("(if t 1 undefined-name)"), "1");
        assert_eq!(run("(if nil undefined-name 2)"), "2");
        assert_eq!(run("(if nil 1)"), "()");
        assert_eq!(run("(if 0 'zero-is-true 'no)"), "zero-is-true");
        assert!(matches!(run_err("(if t 1 2 3)"), ErrorKind::ArityMismatch { .. }));
    }

    #[test]
    fn list_accessors() {
        assert_eq!(run("(list 1 2 3)"), "(1 2 3)");
        assert_eq!(run("(list)"), "()");
        assert_eq!(run("(pair 1 (list 2))"), "(1 2)");
        assert_eq!(run("(pair 1 2)"), "(1 . 2)");
        assert_eq!(run("(first '(1 2 3))"), "1");
        assert_eq!(run("(rest '(1 2 3))"), "(2 3)");
        assert_eq!(run("(second '(1 2 3))"), "2");
        assert_eq!(run("(third '(1 2 3))"), "3");
        assert_eq!(run("(third '(1 2))"), "()");
        assert_eq!(run("(first 5)"), "()");
        assert_eq!(run("(rest nil)"), "()");
    }

    #[test]
    fn comparisons() {
        assert_eq!(run("(eq? 2 2.0)"), "t");
        assert_eq!(run("(== 2 3)"), "()");
        assert_eq!(run("(le 1 1)"), "t");
        assert_eq!(run("(<= 2 1)"), "()");
        assert_eq!(run("(< 1 2)"), "t");
        assert_eq!(run("(>= 1 2)"), "()");
        assert_eq!(run("(> 3 2)"), "t");
        assert!(matches!(run_err("(eq? 'a 'a)"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn structural_predicates() {
        assert_eq!(run("(equal? '(1 \"a\" (b)) (list 1 \"a\" '(b)))"), "t");
        assert_eq!(run("(equal? 'a 'b)"), "()");
        assert_eq!(run("(not nil)"), "t");
        assert_eq!(run("(not 0)"), "()");
        assert_eq!(run("(null? '())"), "t");
        assert_eq!(run("(atom? 'a)"), "t");
        assert_eq!(run("(atom? '(a))"), "()");
    }

    #[test]
    fn string_to_number() {
        assert_eq!(run("(str-to-num \"42\")"), "42");
        assert_eq!(run("(str-to-num \" -2.5 \")"), "-2.5");
        assert_eq!(run("(str-to-num \"3.\")"), "3");
        assert!(matches!(run_err("(str-to-num \"abc\")"), ErrorKind::WrongType { .. }));
        for text in ["1e3", "inf", "NaN", "-", ".5", "+1", ""] {
            let src = format!("(str-to-num \"{text}\")");
            assert!(matches!(run_err(&src), ErrorKind::WrongType { .. }), "{text}");
        }
        assert!(matches!(run_err("(str-to-num 4)"), ErrorKind::WrongType { .. }));
    }

    #[test]
    fn constants_and_aliases() {
        let mut interp = Interpreter::new();
        let root = interp.new_root_context();
        assert_eq!(interp.get(root, "+").unwrap(), interp.get(root, "add").unwrap());
        assert_eq!(interp.get(root, "==").unwrap(), interp.get(root, "eq?").unwrap());
        assert!(interp.get(root, "nil").unwrap().is_nil());
        assert!(interp.get(root, "null").unwrap().is_nil());
        assert_eq!(interp.get(root, "t").unwrap(), interp.t());
        assert!(interp.get(root, "argv").unwrap().is_nil());
    }
}
