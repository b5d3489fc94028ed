///! Printer for Sic values.
///!
///! `render` is what the user sees: strings raw, lists as `(a b c)`, Nil as
///! `()`. `render_debug` quotes and escapes strings so the output reads back
///! as the same value. Callables are shown by name when a context is given
///! and some binding on its chain holds them.

use crate::env::EnvId;
use crate::eval::Interpreter;
use crate::heap::HeapObject;
use crate::value::Val;

/// Render a value for display.
pub fn render(interp: &Interpreter, val: Val, ctx: Option<EnvId>) -> String {
    let mut buf = String::new();
    write_val(interp, val, ctx, &mut buf, false);
    buf
}

/// Render a value as source text (strings quoted and escaped).
pub fn render_debug(interp: &Interpreter, val: Val, ctx: Option<EnvId>) -> String {
    let mut buf = String::new();
    write_val(interp, val, ctx, &mut buf, true);
    buf
}

/// The raw structural rendering: every pair as `(first . rest)`.
pub fn render_primitive(interp: &Interpreter, val: Val) -> String {
    match interp.heap.get(val) {
        Some(HeapObject::Pair(first, rest)) => format!(
            "({} . {})",
            render_primitive(interp, *first),
            render_primitive(interp, *rest)
        ),
        _ => render(interp, val, None),
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_finite() && n == n.trunc() && n.abs() < 1e18 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn write_val(interp: &Interpreter, val: Val, ctx: Option<EnvId>, buf: &mut String, quoting: bool) {
    if let Some(n) = val.as_number() {
        buf.push_str(&format_number(n));
        return;
    }
    if val.is_nil() {
        buf.push_str("()");
        return;
    }
    if let Some(sym_id) = val.as_symbol() {
        buf.push_str(interp.syms.name(sym_id));
        return;
    }
    if val == interp.quote() {
        buf.push_str("quote");
        return;
    }
    if interp.is_callable(val) {
        write_callable(interp, val, ctx, buf);
        return;
    }

    match interp.heap.get(val) {
        Some(HeapObject::Pair(_, _)) => write_list(interp, val, ctx, buf, quoting),
        Some(HeapObject::Str(s)) => {
            if quoting {
                write_escaped(s, buf);
            } else {
                buf.push_str(s);
            }
        }
        _ => buf.push_str(&format!("#<unknown 0x{:016x}>", val.0)),
    }
}

fn write_callable(interp: &Interpreter, val: Val, ctx: Option<EnvId>, buf: &mut String) {
    match ctx {
        Some(ctx) => {
            let name = interp
                .envs
                .name_of(ctx, val)
                .map(|sym| interp.syms.name(sym))
                .unwrap_or("unnamed callable");
            buf.push('[');
            buf.push_str(name);
            buf.push(']');
        }
        None if interp.is_macro(val) => buf.push_str("<macro>"),
        None => buf.push_str("<callable>"),
    }
}

fn write_escaped(s: &str, buf: &mut String) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\t' => buf.push_str("\\t"),
            '\x07' => buf.push_str("\\a"),
            '\x08' => buf.push_str("\\b"),
            '\x0B' => buf.push_str("\\v"),
            '\x0C' => buf.push_str("\\f"),
            _ => buf.push(c),
        }
    }
    buf.push('"');
}

fn write_list(interp: &Interpreter, val: Val, ctx: Option<EnvId>, buf: &mut String, quoting: bool) {
    buf.push('(');
    let mut current = val;
    let mut first = true;
    while let Some(HeapObject::Pair(head, tail)) = interp.heap.get(current) {
        if !first {
            buf.push(' ');
        }
        first = false;
        write_val(interp, *head, ctx, buf, quoting);
        current = *tail;
    }
    if !current.is_nil() {
        // Improper tail
        buf.push_str(" . ");
        write_val(interp, current, ctx, buf, quoting);
    }
    buf.push(')');
}
