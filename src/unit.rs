///! Unit-test support for Sic scripts.
///!
///! `install_unit` adds three counters and a handful of assertion macros to
///! a context. The macros do all their work while expanding and hand back a
///! quoted result, so evaluating the expansion is a no-op.

use tracing::debug;

use crate::env::EnvId;
use crate::error::{Error, Result};
use crate::eval::{Interpreter, Native, NativeFn};
use crate::value::Val;

const TEST_COUNT: &str = "TEST_COUNT";
const TEST_FAILURE_COUNT: &str = "TEST_FAILURE_COUNT";
const TEST_EXPECTED_FAILURES: &str = "TEST_EXPECTED_FAILURES";

fn unit_native(name: &'static str, min_args: usize, func: NativeFn) -> Native {
    Native {
        name,
        aliases: &[],
        min_args,
        variadic: true,
        is_macro: true,
        func,
    }
}

fn unit_natives() -> [Native; 5] {
    [
        unit_native("assert-eq?", 2, assert_eq_p),
        unit_native("assert-ne?", 2, assert_ne_p),
        unit_native("assert-true", 1, assert_true),
        unit_native("assert-false", 1, assert_false),
        unit_native("test", 1, test_form),
    ]
}

/// Define the test counters and assertion macros in `ctx`.
pub fn install_unit(interp: &mut Interpreter, ctx: EnvId) -> Result<()> {
    for name in [TEST_COUNT, TEST_FAILURE_COUNT, TEST_EXPECTED_FAILURES] {
        interp.define(ctx, name, Val::number(0.0))?;
    }
    for native in unit_natives() {
        let name = native.name;
        let val = match interp.native_named(name) {
            Some(val) => val,
            None => interp.register_native(native),
        };
        interp.define(ctx, name, val)?;
    }
    debug!(ctx, "unit-test support installed");
    Ok(())
}

fn counter(interp: &Interpreter, ctx: EnvId, name: &str) -> Result<i64> {
    let val = interp.get(ctx, name)?;
    val.as_number()
        .map(|n| n.trunc() as i64)
        .ok_or_else(|| Error::wrong_type("number", interp.render_debug(val, Some(ctx))))
}

fn increment(interp: &mut Interpreter, ctx: EnvId, name: &str) -> Result<i64> {
    let n = counter(interp, ctx, name)? + 1;
    interp.set(ctx, name, Val::number(n as f64))?;
    Ok(n)
}

/// Number of `test` forms run so far.
pub fn tests_run(interp: &Interpreter, ctx: EnvId) -> Result<i64> {
    counter(interp, ctx, TEST_COUNT)
}

/// Number of `test` forms that hit an assertion failure.
pub fn failures(interp: &Interpreter, ctx: EnvId) -> Result<i64> {
    counter(interp, ctx, TEST_FAILURE_COUNT)
}

/// How many failures the script declared it expects.
pub fn expected_failures(interp: &Interpreter, ctx: EnvId) -> Result<i64> {
    counter(interp, ctx, TEST_EXPECTED_FAILURES)
}

/// At least one test ran and the failure count is the expected one.
pub fn success(interp: &Interpreter, ctx: EnvId) -> Result<bool> {
    if tests_run(interp, ctx)? == 0 {
        return Ok(false);
    }
    Ok(expected_failures(interp, ctx)? == failures(interp, ctx)?)
}

fn with_description(interp: &Interpreter, mut msg: String, desc: Option<&Val>) -> String {
    if let Some(desc) = desc {
        msg.push(' ');
        msg.push_str(&interp.render(*desc, None));
    }
    msg
}

// (assert-eq? expected actual ["desc"])
fn assert_equality(interp: &mut Interpreter, args: &[Val], ctx: EnvId, want_equal: bool) -> Result<Val> {
    let left = interp.eval(args[0], ctx)?;
    let right = interp.eval(args[1], ctx)?;
    if interp.equals(left, right) == want_equal {
        let t = interp.t();
        return Ok(interp.quoted(t));
    }

    let prefix = if want_equal { "Expecting" } else { "Not expecting" };
    let msg = format!(
        "{prefix} '{}';  got '{}'.",
        interp.render(left, None),
        interp.render(right, None)
    );
    Err(Error::assertion(with_description(interp, msg, args.get(2))))
}

fn assert_eq_p(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    assert_equality(interp, args, ctx, true)
}

fn assert_ne_p(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    assert_equality(interp, args, ctx, false)
}

// (assert-true cond ["desc"])
fn assert_truth(interp: &mut Interpreter, args: &[Val], ctx: EnvId, want_true: bool) -> Result<Val> {
    if interp.eval(args[0], ctx)?.is_true() == want_true {
        let t = interp.t();
        return Ok(interp.quoted(t));
    }
    let msg = format!("Expression: '{}'.", interp.render(args[0], None));
    Err(Error::assertion(with_description(interp, msg, args.get(1))))
}

fn assert_true(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    assert_truth(interp, args, ctx, true)
}

fn assert_false(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    assert_truth(interp, args, ctx, false)
}

/// (test ["desc"] body...)
///
/// An assertion failure in the body is counted and reported; any other
/// error propagates.
fn test_form(interp: &mut Interpreter, args: &[Val], ctx: EnvId) -> Result<Val> {
    let n = increment(interp, ctx, TEST_COUNT)?;

    let (desc, body) = match interp.heap.get_string(args[0]) {
        Some(s) => (s.to_string(), &args[1..]),
        None => (String::new(), args),
    };

    for &expr in body {
        match interp.eval(expr, ctx) {
            Ok(_) => {}
            Err(err) if err.is_assertion_failure() => {
                increment(interp, ctx, TEST_FAILURE_COUNT)?;
                let line = format!("FAILED {n} {desc} {err}\n");
                let _ = interp.output().write_all(line.as_bytes());
                return Ok(interp.quoted(Val::nil()));
            }
            Err(err) => return Err(err),
        }
    }

    let line = format!("{n:03} PASSED\n");
    let _ = interp.output().write_all(line.as_bytes());
    let t = interp.t();
    Ok(interp.quoted(t))
}
