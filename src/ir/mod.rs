//! Typed intermediate representation.
//!
//! A program is a flat list of blocks, one per function, plus a pool of string
//! literals. Every value knows its static type; calls are both values and
//! instructions so that a call used only for its effect still gets emitted.

mod lower;

pub use lower::generate;

use crate::ast::BinaryOp;
use crate::error::Location;
use crate::ty::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
  pub parameters: Vec<Type>,
  pub return_type: Type,
}

/// Index of a block in `Code::blocks` together with the signature it had when
/// the reference was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReference {
  pub index: usize,
  pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
  pub callee: BlockReference,
  pub arguments: Vec<Value>,
  pub location: Location,
}

impl Call {
  pub fn ty(&self) -> Type {
    self.callee.signature.return_type
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
  pub op: BinaryOp,
  pub lhs: Box<Value>,
  pub rhs: Box<Value>,
  pub ty: Type,
  pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Integer(i64),
  Float(f64),
  /// Index into `Code::strings`.
  StringReference(usize),
  Block(BlockReference),
  Call(Call),
  /// Positional parameter of the enclosing block.
  Parameter {
    index: usize,
    ty: Type,
  },
  Binary(Binary),
}

impl Value {
  pub fn ty(&self) -> Type {
    match self {
      Value::Integer(_) => Type::Integer,
      Value::Float(_) => Type::Float,
      Value::StringReference(_) => Type::String,
      Value::Block(reference) => reference.signature.return_type,
      Value::Call(call) => call.ty(),
      Value::Parameter { ty, .. } => *ty,
      Value::Binary(binary) => binary.ty,
    }
  }

  /// Values that also act as instructions when used as a bare statement.
  pub fn into_instruction(self) -> Option<Instruction> {
    match self {
      Value::Call(call) => Some(Instruction::Call(call)),
      _ => None,
    }
  }

  /// True when lowering this value may emit a call.
  pub fn contains_call(&self) -> bool {
    match self {
      Value::Call(_) => true,
      Value::Binary(binary) => binary.lhs.contains_call() || binary.rhs.contains_call(),
      _ => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
  Call(Call),
  Return { value: Value, location: Location },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
  pub name: String,
  pub signature: Signature,
  pub parameter_names: Vec<String>,
  pub instructions: Vec<Instruction>,
  /// Set once a `Return` has been appended.
  pub returned: bool,
  pub location: Location,
}

impl Block {
  pub fn new(
    name: String,
    signature: Signature,
    parameter_names: Vec<String>,
    location: Location,
  ) -> Self {
    Self {
      name,
      signature,
      parameter_names,
      instructions: Vec::new(),
      returned: false,
      location,
    }
  }

  pub fn push(&mut self, instruction: Instruction) {
    if matches!(instruction, Instruction::Return { .. }) {
      self.returned = true;
    }
    self.instructions.push(instruction);
  }

  pub fn parameter(&self, name: &str) -> Option<usize> {
    self.parameter_names.iter().position(|param| param == name)
  }
}

/// The whole lowered program.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
  pub blocks: Vec<Block>,
  /// Literal pool; indices are dense and assigned in first-use order.
  pub strings: Vec<String>,
  /// Where the source ended, for whole-program diagnostics.
  pub location: Location,
}

impl Code {
  pub fn new(location: Location) -> Self {
    Self {
      blocks: Vec::new(),
      strings: Vec::new(),
      location,
    }
  }

  pub fn block(&self, name: &str) -> Option<usize> {
    self.blocks.iter().position(|block| block.name == name)
  }

  /// Append a literal and return its pool index. Equal literals are not
  /// merged; every occurrence gets its own slot.
  pub fn add_string(&mut self, value: impl Into<String>) -> usize {
    self.strings.push(value.into());
    self.strings.len() - 1
  }
}
