///! Evaluator for Sic: a recursive tree-walking interpreter.
///!
///! The only hard-wired rule is `quote`. Everything else goes through the
///! callable protocol: evaluate the operator, then either expand a macro
///! (call it on the unevaluated arguments and evaluate what it returns) or
///! evaluate the arguments left to right and apply.
///!
///! Recursion depth is bounded only by the native stack. A runaway
///! recursion in Sic code overflows it and aborts the process; it is not
///! reported as an `Error`.

use std::collections::HashMap;
use std::io::{self, Write};

use tracing::{debug, trace};

use crate::builtins;
use crate::env::{EnvId, EnvStore};
use crate::error::{Error, Result};
use crate::heap::{Closure, Heap, HeapObject};
use crate::printer;
use crate::reader::Reader;
use crate::symbol::SymbolTable;
use crate::value::Val;

/// Host implementation of a native procedure. Gets the (evaluated, unless
/// the native is a macro) arguments and the caller's context.
pub type NativeFn = fn(&mut Interpreter, &[Val], EnvId) -> Result<Val>;

/// A native procedure and its calling contract.
#[derive(Clone)]
pub struct Native {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub min_args: usize,
    pub variadic: bool,
    pub is_macro: bool,
    pub func: NativeFn,
}

impl Native {
    pub fn check_arity(&self, got: usize) -> Result<()> {
        if got < self.min_args {
            let expected = if self.variadic {
                format!("at least {}", self.min_args)
            } else {
                self.min_args.to_string()
            };
            return Err(Error::arity_mismatch(expected, got));
        }
        if !self.variadic && got != self.min_args {
            return Err(Error::arity_mismatch(self.min_args.to_string(), got));
        }
        Ok(())
    }
}

pub struct Interpreter {
    pub heap: Heap,
    pub syms: SymbolTable,
    pub envs: EnvStore,
    natives: Vec<Native>,
    /// Natives below this index are installed in every root context.
    core_natives: usize,
    native_ids: HashMap<&'static str, u32>,
    output: Box<dyn Write>,
    quote: Val,
    sym_t: u32,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` and test reports go to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let mut syms = SymbolTable::new();
        let sym_t = syms.intern("t");

        let mut interp = Interpreter {
            heap: Heap::new(),
            syms,
            envs: EnvStore::new(),
            natives: Vec::new(),
            core_natives: 0,
            native_ids: HashMap::new(),
            output,
            quote: Val::nil(),
            sym_t,
        };
        for native in builtins::natives() {
            interp.register_native(native);
        }
        interp.core_natives = interp.natives.len();
        interp.quote = interp.native_named("quote").unwrap_or(Val::nil());
        interp
    }

    /// Add a native procedure to the table and return its value. It is
    /// not bound anywhere until someone defines it in a context.
    pub fn register_native(&mut self, native: Native) -> Val {
        let id = self.natives.len() as u32;
        self.native_ids.insert(native.name, id);
        self.natives.push(native);
        Val::native(id)
    }

    pub fn native(&self, val: Val) -> Option<&Native> {
        self.natives.get(val.as_native()? as usize)
    }

    pub fn native_named(&self, name: &str) -> Option<Val> {
        self.native_ids.get(name).map(|&id| Val::native(id))
    }

    /// A fresh root context with every native, the constants `nil`, `null`
    /// and `t`, and an empty `argv`.
    pub fn new_root_context(&mut self) -> EnvId {
        let root = self.envs.new_top_level();
        for (id, native) in self.natives.iter().enumerate().take(self.core_natives) {
            let val = Val::native(id as u32);
            for name in std::iter::once(&native.name).chain(native.aliases) {
                let sym = self.syms.intern(name);
                self.envs.define(root, sym, val);
            }
        }
        let t = self.t();
        for (name, val) in [("nil", Val::nil()), ("null", Val::nil()), ("t", t), ("argv", Val::nil())] {
            let sym = self.syms.intern(name);
            self.envs.define(root, sym, val);
        }
        debug!(root, "created root context");
        root
    }

    // ── Well-known values ──

    /// The `quote` native. Its identity is what makes a form a quotation.
    pub fn quote(&self) -> Val {
        self.quote
    }

    /// The canonical true value, the symbol `t`.
    pub fn t(&self) -> Val {
        Val::symbol(self.sym_t)
    }

    pub fn boolean(&self, b: bool) -> Val {
        if b {
            self.t()
        } else {
            Val::nil()
        }
    }

    pub fn symbol(&mut self, name: &str) -> Val {
        self.syms.intern_val(name)
    }

    pub fn string(&mut self, s: &str) -> Val {
        self.heap.alloc_string(s)
    }

    pub fn list(&mut self, vals: &[Val]) -> Val {
        self.heap.list(vals)
    }

    /// `(quote val)`, built with the quote native itself.
    pub fn quoted(&mut self, val: Val) -> Val {
        let quote = self.quote;
        self.heap.list(&[quote, val])
    }

    // ── Value queries ──

    pub fn is_callable(&self, val: Val) -> bool {
        val.as_native().is_some() || self.heap.is_closure(val)
    }

    pub fn is_macro(&self, val: Val) -> bool {
        if let Some(native) = self.native(val) {
            return native.is_macro;
        }
        self.heap.get_closure(val).is_some_and(|c| c.is_macro)
    }

    pub fn equals(&self, a: Val, b: Val) -> bool {
        self.heap.equals(a, b)
    }

    // ── Context operations by name ──

    pub fn define(&mut self, ctx: EnvId, name: &str, val: Val) -> Result<()> {
        let sym = self.syms.intern(name);
        self.define_sym(ctx, sym, val)
    }

    pub(crate) fn define_sym(&mut self, ctx: EnvId, sym: u32, val: Val) -> Result<()> {
        if self.envs.define(ctx, sym, val) {
            Ok(())
        } else {
            Err(Error::redefined_name(self.syms.name(sym)))
        }
    }

    pub fn get(&self, ctx: EnvId, name: &str) -> Result<Val> {
        self.syms
            .lookup(name)
            .and_then(|sym| self.envs.get(ctx, sym))
            .ok_or_else(|| Error::undefined_name(name))
    }

    pub fn set(&mut self, ctx: EnvId, name: &str, val: Val) -> Result<()> {
        let sym = self.syms.intern(name);
        if self.envs.set(ctx, sym, val) {
            Ok(())
        } else {
            Err(Error::undefined_name(name))
        }
    }

    pub fn root_set(&mut self, ctx: EnvId, name: &str, val: Val) {
        let sym = self.syms.intern(name);
        self.envs.root_set(ctx, sym, val);
    }

    pub fn root(&self, ctx: EnvId) -> EnvId {
        self.envs.root(ctx)
    }

    /// Reverse lookup for diagnostics. Linear in the size of the chain.
    pub fn name_of(&self, ctx: EnvId, val: Val) -> Option<&str> {
        self.envs.name_of(ctx, val).map(|sym| self.syms.name(sym))
    }

    // ── Reading and printing ──

    pub fn read(&mut self, reader: &mut Reader) -> Result<Option<Val>> {
        reader.read(&mut self.heap, &mut self.syms, self.quote)
    }

    /// Read the first expression in `src`.
    pub fn read_str(&mut self, src: &str) -> Result<Option<Val>> {
        self.read(&mut Reader::new(src))
    }

    pub fn render(&self, val: Val, ctx: Option<EnvId>) -> String {
        printer::render(self, val, ctx)
    }

    pub fn render_debug(&self, val: Val, ctx: Option<EnvId>) -> String {
        printer::render_debug(self, val, ctx)
    }

    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    // ── Evaluation ──

    /// Read and evaluate every expression in `src`; the last value wins.
    pub fn eval_str(&mut self, src: &str, ctx: EnvId) -> Result<Val> {
        let mut reader = Reader::new(src);
        let mut result = Val::nil();
        while let Some(expr) = self.read(&mut reader)? {
            result = self.eval(expr, ctx)?;
        }
        Ok(result)
    }

    /// Evaluate one expression. A failure picks up the rendering of `expr`
    /// as a backtrace line on its way out.
    pub fn eval(&mut self, expr: Val, ctx: EnvId) -> Result<Val> {
        trace!(expr = %self.render(expr, Some(ctx)), "eval");
        self.eval_inner(expr, ctx)
            .map_err(|err| err.traced(self.render(expr, Some(ctx))))
    }

    fn eval_inner(&mut self, expr: Val, ctx: EnvId) -> Result<Val> {
        // ── Symbol → lookup ──
        if let Some(sym) = expr.as_symbol() {
            return self
                .envs
                .get(ctx, sym)
                .ok_or_else(|| Error::undefined_name(self.syms.name(sym)));
        }

        // ── Self-evaluating ──
        if !self.heap.is_pair(expr) {
            return Ok(expr);
        }

        let operator = self.heap.first(expr).unwrap_or(Val::nil());
        let arg_list = self.heap.rest(expr).unwrap_or(Val::nil());
        let args = self
            .heap
            .list_to_vec(arg_list)
            .ok_or_else(|| Error::malformed(printer::render_primitive(self, expr)))?;

        let fun = self.eval(operator, ctx)?;

        // ── quote ──
        if fun == self.quote {
            if args.len() != 1 {
                return Err(Error::formals_mismatch(1, args.len()));
            }
            return Ok(args[0]);
        }

        if !self.is_callable(fun) {
            return Err(Error::not_a_function(self.render(fun, Some(ctx))));
        }

        // ── Macro: expand, then evaluate the expansion here ──
        if self.is_macro(fun) {
            let expansion = self.call(fun, arg_list, ctx)?;
            debug!(
                expansion = %self.render(expansion, Some(ctx)),
                "macro expanded"
            );
            return self.eval(expansion, ctx);
        }

        // ── Application ──
        let mut actual = Vec::with_capacity(args.len());
        for arg in args {
            actual.push(self.eval(arg, ctx)?);
        }
        let actual = self.heap.list(&actual);
        self.call(fun, actual, ctx)
    }

    /// Invoke a callable on an already-prepared argument list (evaluated
    /// for procedures, raw for macros).
    pub fn call(&mut self, fun: Val, actual: Val, ctx: EnvId) -> Result<Val> {
        let args = self
            .heap
            .list_to_vec(actual)
            .ok_or_else(|| Error::wrong_type("list", self.render(actual, Some(ctx))))?;

        if let Some(native) = self.native(fun).cloned() {
            return self.call_native(&native, fun, actual, &args, ctx);
        }
        if let Some(closure) = self.heap.get_closure(fun).cloned() {
            return self.call_closure(&closure, &args);
        }
        Err(Error::not_a_function(self.render(fun, Some(ctx))))
    }

    fn call_native(
        &mut self,
        native: &Native,
        fun: Val,
        actual: Val,
        args: &[Val],
        ctx: EnvId,
    ) -> Result<Val> {
        native.check_arity(args.len())?;
        trace!(native = native.name, argc = args.len(), "native call");
        (native.func)(self, args, ctx).map_err(|err| {
            let call = self.heap.cons(fun, actual);
            let line = self.render(call, Some(ctx));
            err.traced(line)
        })
    }

    fn call_closure(&mut self, closure: &Closure, args: &[Val]) -> Result<Val> {
        if closure.formals.len() != args.len() {
            return Err(Error::formals_mismatch(closure.formals.len(), args.len()));
        }

        // Fresh frame under the *defining* context: lexical scope.
        let frame = self.envs.new_child(closure.env);
        for (&sym, &val) in closure.formals.iter().zip(args) {
            self.define_sym(frame, sym, val)?;
        }

        let body = self.heap.list_to_vec(closure.body).unwrap_or_default();
        let mut result = Val::nil();
        for expr in body {
            result = self.eval(expr, frame)?;
        }
        Ok(result)
    }

    /// Build a closure from a formals list and a body list.
    pub fn make_closure(
        &mut self,
        formals: Val,
        body: Val,
        env: EnvId,
        is_macro: bool,
    ) -> Result<Val> {
        let formal_vals = self
            .heap
            .list_to_vec(formals)
            .ok_or_else(|| Error::wrong_type("list", self.render(formals, None)))?;
        let mut params = Vec::with_capacity(formal_vals.len());
        for f in formal_vals {
            let sym = f
                .as_symbol()
                .ok_or_else(|| Error::wrong_type("symbol", self.render(f, None)))?;
            params.push(sym);
        }
        if !self.heap.is_list(body) {
            return Err(Error::wrong_type("list", self.render(body, None)));
        }
        debug!(params = params.len(), env, is_macro, "closure created");
        Ok(self.heap.alloc_closure(Closure {
            formals: params,
            body,
            env,
            is_macro,
        }))
    }

    /// Describe a heap object's kind for messages.
    pub fn type_name(&self, val: Val) -> &'static str {
        if val.as_number().is_some() {
            return "number";
        }
        if val.is_nil() {
            return "nil";
        }
        if val.is_symbol() {
            return "symbol";
        }
        if val.as_native().is_some() {
            return "native";
        }
        match self.heap.get(val) {
            Some(HeapObject::Pair(_, _)) => "pair",
            Some(HeapObject::Str(_)) => "string",
            Some(HeapObject::Closure(_)) => "function",
            None => "unknown",
        }
    }
}
