//! Code generation: lower the IR into a backend instruction stream.
//!
//! Register plan: arguments go to registers 0..8 by position, results come
//! back in register 0, and binary operations use three fixed scratch
//! registers. Values that must survive a call or a nested operation are saved
//! on the stack around it. The register file (general or float) always
//! follows the static type of the value.

pub mod aarch64;
pub mod backend;
pub mod instruction;

pub use aarch64::Aarch64Backend;
pub use backend::Backend;
pub use instruction::{Arithmetic, Instruction, Operand, Register, RegisterClass};

use crate::ast::BinaryOp;
use crate::error::{CompileResult, ErrorKind, Location};
use crate::ir::{self, Binary, Call, Code, Value};
use crate::ty::Type;

const RETURN_REGISTER: u8 = 0;
const SCRATCH_LHS: u8 = 9;
const SCRATCH_RHS: u8 = 10;
const SCRATCH_OUT: u8 = 11;
const SCRATCH_LOAD: u8 = 12;

/// Registers available for passing arguments.
pub const MAX_ARGUMENTS: usize = 8;

/// Drive `backend` over the whole program.
#[tracing::instrument(skip_all, fields(block_count = code.blocks.len()))]
pub fn generate<B: Backend + ?Sized>(code: &Code, backend: &mut B) -> CompileResult<()> {
  if code.block("main").is_none() {
    return Err(
      code
        .location
        .error(ErrorKind::Invalid, "program: main function is undefined"),
    );
  }

  backend.entry_point();

  let mut generator = AsmGenerator { code, backend };
  for block in &code.blocks {
    generator.lower_block(block)?;
  }

  for literal in &code.strings {
    generator.backend.string_literal(literal);
  }
  generator.backend.finish_data_segment();
  Ok(())
}

struct AsmGenerator<'a, B: Backend + ?Sized> {
  code: &'a Code,
  backend: &'a mut B,
}

impl<B: Backend + ?Sized> AsmGenerator<'_, B> {
  fn emit(&mut self, instruction: Instruction) {
    self.backend.instruction(&instruction);
  }

  fn lower_block(&mut self, block: &ir::Block) -> CompileResult<()> {
    if block.signature.parameters.len() > MAX_ARGUMENTS {
      return Err(block.location.error(
        ErrorKind::Unsupported,
        format!("function: more than {MAX_ARGUMENTS} parameters"),
      ));
    }

    tracing::debug!(name = %block.name, "emitting block");
    self.backend.label_start(block);
    for instruction in &block.instructions {
      let last = self.lower_instruction(instruction)?;
      self.emit(last);
    }
    self.backend.label_end(block);
    Ok(())
  }

  /// Emit whatever setup `instruction` needs and return the instruction that
  /// completes it.
  fn lower_instruction(&mut self, instruction: &ir::Instruction) -> CompileResult<Instruction> {
    match instruction {
      ir::Instruction::Call(call) => self.lower_call(call),
      ir::Instruction::Return { value, location } => {
        let source = self.lower_value(value, location)?;
        self.emit(Instruction::Move {
          destination: Register::typed(RETURN_REGISTER, value.ty()),
          source,
        });
        Ok(Instruction::Return)
      }
    }
  }

  fn lower_call(&mut self, call: &Call) -> CompileResult<Instruction> {
    let code = self.code;
    let callee = &code.blocks[call.callee.index];
    let parameters = &callee.signature.parameters;

    if call.arguments.len() != parameters.len() {
      return Err(call.location.error(
        ErrorKind::Invalid,
        format!(
          "call: expected {} got {}",
          count(parameters.len()),
          count(call.arguments.len())
        ),
      ));
    }
    for (position, (expected, argument)) in parameters.iter().zip(&call.arguments).enumerate() {
      if argument.ty() != *expected {
        return Err(call.location.error(
          ErrorKind::Types,
          format!(
            "mismatched: expected argument at position {position} to be of type {expected} but got argument of type {}",
            argument.ty()
          ),
        ));
      }
    }
    if call.arguments.len() > MAX_ARGUMENTS {
      return Err(call.location.error(
        ErrorKind::Unsupported,
        format!("call: more than {MAX_ARGUMENTS} arguments"),
      ));
    }

    let mut saved = Vec::new();
    for (position, argument) in call.arguments.iter().enumerate() {
      let source = self.lower_value(argument, &call.location)?;
      let destination = Register::typed(position as u8, argument.ty());
      self.emit(Instruction::Move {
        destination,
        source,
      });
      if call.arguments[position + 1..].iter().any(Value::contains_call) {
        self.emit(Instruction::Push(destination));
        saved.push(destination);
      }
    }
    for register in saved.into_iter().rev() {
      self.emit(Instruction::Pop(register));
    }

    Ok(Instruction::Call {
      label: callee.name.clone(),
    })
  }

  /// Lower `value` to an operand, emitting any instructions needed to
  /// materialise it. `at` anchors diagnostics.
  fn lower_value(&mut self, value: &Value, at: &Location) -> CompileResult<Operand> {
    match value {
      Value::Integer(value) => Ok(Operand::Integer(*value)),
      Value::Float(value) => Ok(Operand::Float(*value)),
      Value::StringReference(index) => {
        let destination = Register::typed(SCRATCH_LOAD, Type::String);
        self.emit(Instruction::LoadAddress {
          destination,
          literal: *index,
        });
        Ok(Operand::Register(destination))
      }
      Value::Parameter { index, ty } => {
        let destination = Register::typed(SCRATCH_LOAD, *ty);
        self.emit(Instruction::LoadParameter {
          destination,
          index: *index,
        });
        Ok(Operand::Register(destination))
      }
      Value::Call(call) => {
        let instruction = self.lower_call(call)?;
        self.emit(instruction);
        Ok(Operand::Register(Register::typed(RETURN_REGISTER, call.ty())))
      }
      Value::Binary(binary) => self.lower_binary(binary),
      Value::Block(_) => Err(at.error(
        ErrorKind::Unsupported,
        "value: functions cannot be used as values",
      )),
    }
  }

  fn lower_binary(&mut self, binary: &Binary) -> CompileResult<Operand> {
    let lhs = Register::typed(SCRATCH_LHS, binary.ty);
    let rhs = Register::typed(SCRATCH_RHS, binary.ty);
    let output = Register::typed(SCRATCH_OUT, binary.ty);

    let op = match (binary.op, binary.ty) {
      (BinaryOp::Add, _) => Arithmetic::Add,
      (BinaryOp::Sub, _) => Arithmetic::Sub,
      (BinaryOp::Mul, _) => Arithmetic::Mul,
      (BinaryOp::Div, _) | (BinaryOp::Rem, Type::Integer) => Arithmetic::Div,
      (BinaryOp::Rem, ty) => {
        return Err(binary.location.error(
          ErrorKind::Unsupported,
          format!("operator '%' on {ty}"),
        ));
      }
    };

    let source = self.lower_value(&binary.lhs, &binary.location)?;
    self.emit(Instruction::Move {
      destination: lhs,
      source,
    });

    let spill = matches!(*binary.rhs, Value::Binary(_) | Value::Call(_));
    if spill {
      self.emit(Instruction::Push(lhs));
    }
    let source = self.lower_value(&binary.rhs, &binary.location)?;
    if spill {
      self.emit(Instruction::Pop(lhs));
    }
    self.emit(Instruction::Move {
      destination: rhs,
      source,
    });

    self.emit(Instruction::Arithmetic {
      op,
      output,
      lhs,
      rhs,
    });
    if binary.op == BinaryOp::Rem {
      self.emit(Instruction::MultiplySubtract {
        output,
        lhs: output,
        rhs,
        minuend: lhs,
      });
    }

    Ok(Operand::Register(output))
  }
}

fn count(n: usize) -> String {
  if n == 1 {
    format!("{n} argument")
  } else {
    format!("{n} arguments")
  }
}
