//! Syntax tree produced by the parser.
//!
//! Nodes are immutable once built and each one can name the location a
//! diagnostic about it should point at.

use crate::error::Location;
use crate::ty::Type;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Rem => "%",
    }
  }
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Identifier {
    name: String,
    location: Location,
  },
  String {
    value: String,
    location: Location,
  },
  Integer {
    value: i64,
    location: Location,
  },
  Float {
    value: f64,
    location: Location,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
    /// Location of the operator token.
    location: Location,
  },
  Call {
    callee: Box<Expr>,
    arguments: Vec<Expr>,
  },
}

impl Expr {
  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, location: Location) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
      location,
    }
  }

  pub fn call(callee: Expr, arguments: Vec<Expr>) -> Self {
    Self::Call {
      callee: Box::new(callee),
      arguments,
    }
  }

  pub fn location(&self) -> &Location {
    match self {
      Expr::Identifier { location, .. }
      | Expr::String { location, .. }
      | Expr::Integer { location, .. }
      | Expr::Float { location, .. }
      | Expr::Binary { location, .. } => location,
      Expr::Call { callee, .. } => callee.location(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
  pub name: String,
  pub ty: Type,
  pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: String,
  pub parameters: Vec<Parameter>,
  pub body: Vec<Stmt>,
  pub return_type: Type,
  /// Location of the function name.
  pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Function(Function),
  Return(Expr),
  Expr(Expr),
}

impl Stmt {
  pub fn location(&self) -> &Location {
    match self {
      Stmt::Function(function) => &function.location,
      Stmt::Return(value) | Stmt::Expr(value) => value.location(),
    }
  }
}

/// Whole compilation unit. `location` is where the input ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub body: Vec<Stmt>,
  pub location: Location,
}
