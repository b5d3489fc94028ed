//! Sic: a small embeddable Lisp.
//!
//! Values are NaN-boxed words; pairs, strings and closures live in an
//! arena owned by the `Interpreter`, which also owns the symbol table,
//! every context frame and the native procedures.
//!
//! ```
//! let mut interp = sic::Interpreter::new();
//! let root = interp.new_root_context();
//! let v = interp.eval_str("(add 1 2.0 3)", root).unwrap();
//! assert_eq!(interp.render(v, None), "6");
//! ```

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod printer;
pub mod reader;
pub mod script;
pub mod symbol;
pub mod unit;
pub mod value;

#[cfg(test)]
mod testing;

pub use env::EnvId;
pub use error::{Error, ErrorKind, Result, SyntaxError};
pub use eval::{Interpreter, Native, NativeFn};
pub use printer::{render, render_debug};
pub use reader::Reader;
pub use script::run_script;
pub use unit::install_unit;
pub use value::Val;
