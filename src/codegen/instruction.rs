//! Target-neutral instruction stream handed to a `Backend`.

use crate::ty::Type;

/// Register file a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
  General,
  Float,
}

impl RegisterClass {
  /// Floats use the floating-point file; integers and string addresses the
  /// general one.
  pub fn of(ty: Type) -> Self {
    match ty {
      Type::Float => RegisterClass::Float,
      Type::Void | Type::Integer | Type::String => RegisterClass::General,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
  pub index: u8,
  pub class: RegisterClass,
}

impl Register {
  pub fn new(index: u8, class: RegisterClass) -> Self {
    Self { index, class }
  }

  /// Register number `index` in the file that holds values of type `ty`.
  pub fn typed(index: u8, ty: Type) -> Self {
    Self::new(index, RegisterClass::of(ty))
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
  Register(Register),
  Integer(i64),
  Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
  Add,
  Sub,
  Mul,
  Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
  Call {
    label: String,
  },
  Return,
  Move {
    destination: Register,
    source: Operand,
  },
  /// Address of string literal `literal` from the data segment.
  LoadAddress {
    destination: Register,
    literal: usize,
  },
  /// Reload the incoming parameter spilled by the block prologue.
  LoadParameter {
    destination: Register,
    index: usize,
  },
  Arithmetic {
    op: Arithmetic,
    output: Register,
    lhs: Register,
    rhs: Register,
  },
  /// `output = minuend - lhs * rhs`
  MultiplySubtract {
    output: Register,
    lhs: Register,
    rhs: Register,
    minuend: Register,
  },
  Push(Register),
  Pop(Register),
}
