use crate::ir::Block;

use super::instruction::Instruction;

/// A target that turns the instruction stream into assembly text.
///
/// The generator drives a backend in a fixed order: `entry_point` once, then
/// `label_start`, the block's instructions and `label_end` for each block,
/// then every pooled string and finally `finish_data_segment`.
pub trait Backend {
  /// Program entry that calls `main` and exits.
  fn entry_point(&mut self);

  fn label_start(&mut self, block: &Block);

  /// Close a block. Void blocks without an explicit return get one here.
  fn label_end(&mut self, block: &Block);

  fn instruction(&mut self, instruction: &Instruction);

  fn string_literal(&mut self, value: &str);

  fn finish_data_segment(&mut self);

  /// The assembled program text.
  fn output(&self) -> String;
}
