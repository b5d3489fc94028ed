///! Errors for Sic.
///!
///! Every failure is an `Error`: a flat `ErrorKind` plus the backtrace it
///! picked up on the way out. Each evaluator frame the error passes through
///! appends the rendering of the expression it was working on, so the
///! backtrace reads innermost first.

use std::fmt;

use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Reader failures.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum SyntaxError {
    #[error("Unterminated list.")]
    UnterminatedList,
    #[error("Unterminated string!")]
    UnterminatedString,
    #[error("Unknown token: '{0}'")]
    UnknownToken(char),
    #[error("Nothing to quote.")]
    DanglingQuote,
}

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum ErrorKind {
    #[error("{0}")]
    UndefinedName(String),
    #[error("{0}")]
    RedefinedName(String),
    #[error("Expecting {expected}; got {got}")]
    WrongType { expected: String, got: String },
    #[error("Expecting {expected}; got {got}")]
    ArityMismatch { expected: String, got: usize },
    #[error("{0}")]
    NotAFunction(String),
    #[error("{0}")]
    MalformedExpression(String),
    #[error("Expecting {expected} arguments; got {got}")]
    FormalsArgumentCountMismatch { expected: usize, got: usize },
    #[error(transparent)]
    SyntaxError(#[from] SyntaxError),
    #[error("{0}")]
    AssertionFailure(String),
}

impl ErrorKind {
    /// Short identifier used as the message prefix.
    pub fn id(&self) -> &'static str {
        match self {
            ErrorKind::UndefinedName(_) => "undefined_name",
            ErrorKind::RedefinedName(_) => "redefined_name",
            ErrorKind::WrongType { .. } => "wrong_type",
            ErrorKind::ArityMismatch { .. } => "arg_count",
            ErrorKind::NotAFunction(_) => "not_a_function",
            ErrorKind::MalformedExpression(_) => "malformed_expr",
            ErrorKind::FormalsArgumentCountMismatch { .. } => "fn_arg_mismatch",
            ErrorKind::SyntaxError(_) => "syntax_error",
            ErrorKind::AssertionFailure(_) => "assertion_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    backtrace: Vec<String>,
}

impl Error {
    pub fn undefined_name(name: impl Into<String>) -> Self {
        Self::from(ErrorKind::UndefinedName(name.into()))
    }

    pub fn redefined_name(name: impl Into<String>) -> Self {
        Self::from(ErrorKind::RedefinedName(name.into()))
    }

    pub fn wrong_type(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::from(ErrorKind::WrongType {
            expected: expected.into(),
            got: got.into(),
        })
    }

    pub fn arity_mismatch(expected: impl Into<String>, got: usize) -> Self {
        Self::from(ErrorKind::ArityMismatch {
            expected: expected.into(),
            got,
        })
    }

    pub fn not_a_function(what: impl Into<String>) -> Self {
        Self::from(ErrorKind::NotAFunction(what.into()))
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        Self::from(ErrorKind::MalformedExpression(what.into()))
    }

    pub fn formals_mismatch(expected: usize, got: usize) -> Self {
        Self::from(ErrorKind::FormalsArgumentCountMismatch { expected, got })
    }

    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::from(ErrorKind::AssertionFailure(msg.into()))
    }

    /// Append one backtrace line and hand the error back.
    pub fn traced(mut self, line: impl Into<String>) -> Self {
        self.backtrace.push(line.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn trace(&self) -> &[String] {
        &self.backtrace
    }

    pub fn is_assertion_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::AssertionFailure(_))
    }

    /// Backtrace rendered one `  > line` per entry.
    pub fn backtrace(&self) -> String {
        self.backtrace
            .iter()
            .map(|line| format!("  > {line}\n"))
            .collect()
    }

    /// The message followed by the backtrace.
    pub fn long_message(&self) -> String {
        format!("{self}\n{}", self.backtrace())
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Vec::new(),
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Self::from(ErrorKind::from(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind.id(), self.kind)
    }
}

impl std::error::Error for Error {}
