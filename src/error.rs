//! Shared error utilities used across the compilation pipeline.
//!
//! Every stage reports at most one fault and returns it upwards; nothing below
//! `main` terminates the process. Diagnostics render in the classic
//! `file:line:column: kind message` shape so editors can jump to them.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Coarse classification of a fault. The discriminant doubles as the process
/// exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Invalid = 1,
  Unsupported = 2,
  Unknown = 3,
  Types = 4,
}

impl ErrorKind {
  pub fn code(self) -> i32 {
    self as i32
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ErrorKind::Invalid => "invalid",
      ErrorKind::Unsupported => "unsupported",
      ErrorKind::Unknown => "unknown",
      ErrorKind::Types => "types",
    };
    f.write_str(name)
  }
}

/// 1-based line/column cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
  pub line: usize,
  pub column: usize,
}

impl Position {
  pub fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }
}

impl Default for Position {
  fn default() -> Self {
    Self { line: 1, column: 1 }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A file identity plus a snapshot of the cursor. The file is shared between
/// all tokens of one source, the position is copied so later cursor movement
/// never changes an existing location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub file: Rc<Path>,
  pub position: Position,
}

impl Location {
  pub fn new(file: Rc<Path>, position: Position) -> Self {
    Self { file, position }
  }

  /// Build a diagnostic anchored at this location.
  pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> CompileError {
    DiagnosticSnafu {
      kind,
      message,
      file: &*self.file,
      position: self.position,
    }
    .build()
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{}:{position}: {kind} {message}", file.display()))]
  Diagnostic {
    kind: ErrorKind,
    message: String,
    file: PathBuf,
    position: Position,
  },

  #[snafu(display("{}: {source}", path.display()))]
  Read { path: PathBuf, source: io::Error },
}

impl CompileError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      CompileError::Diagnostic { kind, .. } => *kind,
      CompileError::Read { .. } => ErrorKind::Invalid,
    }
  }

  /// Status the driver should exit with after printing this error.
  pub fn exit_code(&self) -> i32 {
    self.kind().code()
  }

  /// Position of the fault, when it was raised against source text.
  pub fn position(&self) -> Option<Position> {
    match self {
      CompileError::Diagnostic { position, .. } => Some(*position),
      CompileError::Read { .. } => None,
    }
  }
}
