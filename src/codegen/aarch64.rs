//! Textual AArch64 backend (GNU assembler syntax, Linux system calls).
//!
//! Every block gets a frame record so the link register survives nested
//! calls; incoming parameters are spilled right above it:
//!
//! ```text
//! x29 + 16 + 8*i   parameter i
//! x29 + 8          saved x30
//! x29              saved x29
//! ```

use std::fmt::Write;

use crate::ir::Block;
use crate::ty::Type;

use super::backend::Backend;
use super::instruction::{Arithmetic, Instruction, Operand, Register, RegisterClass};

/// Bytes below the first parameter slot: the saved x29/x30 pair.
const FRAME_RECORD: usize = 16;
const SLOT: usize = 8;

#[derive(Debug, Default)]
pub struct Aarch64Backend {
  text: String,
  data: String,
  strings: Vec<String>,
  /// Frame size of the block being emitted.
  frame_size: usize,
}

impl Aarch64Backend {
  pub fn new() -> Self {
    Self::default()
  }

  fn line(&mut self, line: impl AsRef<str>) {
    self.text.push('\t');
    self.text.push_str(line.as_ref());
    self.text.push('\n');
  }

  fn render(&self, instruction: &Instruction) -> String {
    match instruction {
      Instruction::Call { label } => format!("bl {label}"),
      Instruction::Return => format!("ldp x29, x30, [sp], #{}\n\tret", self.frame_size),
      Instruction::Move {
        destination,
        source,
      } => {
        let mnemonic = match destination.class {
          RegisterClass::General => "mov",
          RegisterClass::Float => "fmov",
        };
        format!("{mnemonic} {}, {}", register(*destination), operand(source))
      }
      Instruction::LoadAddress {
        destination,
        literal,
      } => format!("adr {}, {}", register(*destination), string_label(*literal)),
      Instruction::LoadParameter { destination, index } => {
        format!("ldr {}, [x29, #{}]", register(*destination), parameter_offset(*index))
      }
      Instruction::Arithmetic {
        op,
        output,
        lhs,
        rhs,
      } => {
        let mnemonic = match op {
          Arithmetic::Add => "add",
          Arithmetic::Sub => "sub",
          Arithmetic::Mul => "mul",
          Arithmetic::Div => "div",
        };
        let mnemonic = match (op, output.class) {
          (_, RegisterClass::Float) => format!("f{mnemonic}"),
          (Arithmetic::Div, RegisterClass::General) => format!("s{mnemonic}"),
          _ => mnemonic.to_string(),
        };
        format!(
          "{mnemonic} {}, {}, {}",
          register(*output),
          register(*lhs),
          register(*rhs)
        )
      }
      Instruction::MultiplySubtract {
        output,
        lhs,
        rhs,
        minuend,
      } => format!(
        "msub {}, {}, {}, {}",
        register(*output),
        register(*lhs),
        register(*rhs),
        register(*minuend)
      ),
      Instruction::Push(reg) => format!("str {}, [sp, #-16]!", register(*reg)),
      Instruction::Pop(reg) => format!("ldr {}, [sp], #16", register(*reg)),
    }
  }
}

impl Backend for Aarch64Backend {
  fn entry_point(&mut self) {
    self.text.push_str(".global _start\n");
    self.text.push_str("_start:\n");
    self.line("bl main");
    self.line("mov w8, #93");
    self.line("mov w0, wzr");
    self.line("svc #0");
  }

  fn label_start(&mut self, block: &Block) {
    let parameters = &block.signature.parameters;
    self.frame_size = frame_size(parameters.len());

    let _ = writeln!(self.text, ".global {}", block.name);
    let _ = writeln!(self.text, "{}:", block.name);
    self.line(format!("stp x29, x30, [sp, #-{}]!", self.frame_size));
    self.line("mov x29, sp");
    for (index, ty) in parameters.iter().enumerate() {
      let incoming = register(Register::typed(index as u8, *ty));
      self.line(format!("str {incoming}, [x29, #{}]", parameter_offset(index)));
    }
  }

  fn label_end(&mut self, block: &Block) {
    if !block.returned && block.signature.return_type == Type::Void {
      self.instruction(&Instruction::Return);
    }
  }

  fn instruction(&mut self, instruction: &Instruction) {
    let rendered = self.render(instruction);
    self.line(rendered);
  }

  fn string_literal(&mut self, value: &str) {
    self.strings.push(value.to_string());
  }

  fn finish_data_segment(&mut self) {
    for (index, value) in self.strings.iter().enumerate() {
      let _ = writeln!(self.data, "{}:", string_label(index));
      let _ = writeln!(self.data, "\t.asciz \"{}\"", escape(value));
    }
  }

  fn output(&self) -> String {
    format!(".text\n{}\n.data\n{}", self.text, self.data)
  }
}

fn register(register: Register) -> String {
  match register.class {
    RegisterClass::General => format!("x{}", register.index),
    RegisterClass::Float => format!("d{}", register.index),
  }
}

/// Immediates keep a decimal point for floats so they never read as integers.
fn operand(operand: &Operand) -> String {
  match operand {
    Operand::Register(reg) => register(*reg),
    Operand::Integer(value) => format!("#{value}"),
    Operand::Float(value) => format!("#{value:?}"),
  }
}

/// Local to the object file, and `.` never appears in an identifier, so pool
/// labels cannot collide with function names.
fn string_label(index: usize) -> String {
  format!(".Lstr{index}")
}

/// Quote `value` for `.asciz` so the assembled bytes are exactly the literal.
fn escape(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for byte in value.bytes() {
    match byte {
      b'\\' => escaped.push_str("\\\\"),
      b'"' => escaped.push_str("\\\""),
      b'\n' => escaped.push_str("\\n"),
      b'\t' => escaped.push_str("\\t"),
      0x20..=0x7e => escaped.push(byte as char),
      _ => {
        let _ = write!(escaped, "\\{byte:03o}");
      }
    }
  }
  escaped
}

fn parameter_offset(index: usize) -> usize {
  FRAME_RECORD + SLOT * index
}

/// Frame record plus parameter slots, kept 16-byte aligned.
fn frame_size(parameters: usize) -> usize {
  (FRAME_RECORD + SLOT * parameters).next_multiple_of(16)
}
