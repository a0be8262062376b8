//! AST → IR lowering with all semantic checks.
//!
//! The only mutable state is the block currently being built. Functions may
//! not nest, so there is never more than one.

use std::collections::HashSet;

use crate::ast::{BinaryOp, Expr, Function, Program, Stmt};
use crate::error::{CompileResult, ErrorKind, Location};
use crate::ty::Type;

use super::{Binary, Block, BlockReference, Call, Code, Instruction, Signature, Value};

/// Symbols the emitted program defines on its own.
const RESERVED_NAMES: &[&str] = &["_start"];

/// Lower a parsed program into IR.
#[tracing::instrument(skip_all, fields(stmt_count = program.body.len()))]
pub fn generate(program: &Program) -> CompileResult<Code> {
  let mut generator = IrGenerator {
    code: Code::new(program.location.clone()),
    current: None,
  };
  for stmt in &program.body {
    generator.lower_stmt(stmt)?;
  }
  Ok(generator.code)
}

struct IrGenerator {
  code: Code,
  current: Option<Block>,
}

impl IrGenerator {
  fn lower_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::Function(function) => self.lower_function(function),
      Stmt::Return(value) => self.lower_return(value),
      Stmt::Expr(expr) => {
        let value = self.lower_expr(expr)?;
        if let Some(instruction) = value.into_instruction()
          && let Some(block) = self.current.as_mut()
        {
          block.push(instruction);
        }
        Ok(())
      }
    }
  }

  fn lower_function(&mut self, function: &Function) -> CompileResult<()> {
    if self.current.is_some() {
      return Err(function.location.error(
        ErrorKind::Invalid,
        "function: function cannot be defined inside another function",
      ));
    }
    if RESERVED_NAMES.contains(&function.name.as_str()) {
      return Err(function.location.error(
        ErrorKind::Invalid,
        format!("function: {} is a reserved name", function.name),
      ));
    }
    if self.code.block(&function.name).is_some() {
      return Err(
        function
          .location
          .error(ErrorKind::Invalid, "function: function name is already used"),
      );
    }

    let mut names = HashSet::new();
    for param in &function.parameters {
      if !names.insert(param.name.as_str()) {
        return Err(param.location.error(
          ErrorKind::Invalid,
          format!("function: parameter {} is already used", param.name),
        ));
      }
    }

    let signature = Signature {
      parameters: function.parameters.iter().map(|param| param.ty).collect(),
      return_type: function.return_type,
    };
    let parameter_names = function
      .parameters
      .iter()
      .map(|param| param.name.clone())
      .collect();
    self.current = Some(Block::new(
      function.name.clone(),
      signature,
      parameter_names,
      function.location.clone(),
    ));

    for stmt in &function.body {
      self.lower_stmt(stmt)?;
    }

    let block = self.current.take().ok_or_else(|| {
      function
        .location
        .error(ErrorKind::Invalid, "function: no block is open for the function body")
    })?;
    if !block.returned && block.signature.return_type != Type::Void {
      return Err(function.location.error(
        ErrorKind::Invalid,
        format!(
          "function: expected to return an expression with a type of {}",
          block.signature.return_type
        ),
      ));
    }

    tracing::debug!(name = %block.name, instructions = block.instructions.len(), "lowered block");
    self.code.blocks.push(block);
    Ok(())
  }

  fn lower_return(&mut self, expr: &Expr) -> CompileResult<()> {
    let location = expr.location().clone();
    let outside = || {
      location.error(
        ErrorKind::Invalid,
        "return statement: return statement must be in a function",
      )
    };
    let expected = self
      .current
      .as_ref()
      .map(|block| block.signature.return_type)
      .ok_or_else(outside)?;

    let value = self.lower_expr(expr)?;

    if expected == Type::Void {
      return Err(location.error(
        ErrorKind::Invalid,
        "return statement: the function return type is void",
      ));
    }
    if value.ty() != expected {
      return Err(location.error(
        ErrorKind::Types,
        format!(
          "mismatched: expected the return value to be of type {expected} but got a value of type {}",
          value.ty()
        ),
      ));
    }

    let block = self.current.as_mut().ok_or_else(outside)?;
    block.push(Instruction::Return { value, location });
    Ok(())
  }

  fn lower_expr(&mut self, expr: &Expr) -> CompileResult<Value> {
    let Some(block) = self.current.as_ref() else {
      return Err(expr.location().error(
        ErrorKind::Invalid,
        "expression: expected the expression to be inside a function",
      ));
    };

    match expr {
      Expr::Integer { value, .. } => Ok(Value::Integer(*value)),
      Expr::Float { value, .. } => Ok(Value::Float(*value)),
      Expr::String { value, .. } => {
        Ok(Value::StringReference(self.code.add_string(value.as_str())))
      }
      Expr::Identifier { name, location } => {
        if let Some(index) = block.parameter(name) {
          return Ok(Value::Parameter {
            index,
            ty: block.signature.parameters[index],
          });
        }
        match self.code.block(name) {
          Some(index) => Ok(Value::Block(self.reference(index))),
          None => Err(location.error(ErrorKind::Invalid, format!("{name} is not defined"))),
        }
      }
      Expr::Binary {
        op,
        lhs,
        rhs,
        location,
      } => {
        let lhs = self.lower_expr(lhs)?;
        let rhs = self.lower_expr(rhs)?;
        let ty = binary_type(*op, lhs.ty(), rhs.ty(), location)?;
        Ok(Value::Binary(Binary {
          op: *op,
          lhs: Box::new(lhs),
          rhs: Box::new(rhs),
          ty,
          location: location.clone(),
        }))
      }
      Expr::Call { callee, arguments } => self.lower_call(callee, arguments).map(Value::Call),
    }
  }

  fn lower_call(&mut self, callee: &Expr, arguments: &[Expr]) -> CompileResult<Call> {
    let Expr::Identifier { name, location } = callee else {
      return Err(
        callee
          .location()
          .error(ErrorKind::Invalid, "call: expression is not a callable"),
      );
    };
    let Some(index) = self.code.block(name) else {
      return Err(location.error(ErrorKind::Invalid, format!("call: {name} is not a function")));
    };
    let callee = self.reference(index);

    let arguments = arguments
      .iter()
      .map(|argument| self.lower_expr(argument))
      .collect::<CompileResult<Vec<_>>>()?;

    Ok(Call {
      callee,
      arguments,
      location: location.clone(),
    })
  }

  fn reference(&self, index: usize) -> BlockReference {
    BlockReference {
      index,
      signature: self.code.blocks[index].signature.clone(),
    }
  }
}

fn binary_type(op: BinaryOp, lhs: Type, rhs: Type, location: &Location) -> CompileResult<Type> {
  if lhs != rhs {
    return Err(location.error(
      ErrorKind::Types,
      format!("mismatched: cannot apply '{}' to {lhs} and {rhs}", op.symbol()),
    ));
  }
  if !lhs.is_numeric() {
    return Err(location.error(
      ErrorKind::Unsupported,
      format!("operator '{}' on {lhs}", op.symbol()),
    ));
  }
  Ok(lhs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;
  use pretty_assertions::assert_eq;
  use std::path::Path;

  fn lower(source: &str) -> CompileResult<Code> {
    let file = Path::new("test.pasm");
    let program = parse(tokenize(source, file)?, file)?;
    generate(&program)
  }

  fn error(source: &str) -> (ErrorKind, String) {
    let err = lower(source).unwrap_err();
    (err.kind(), err.to_string())
  }

  #[test]
  fn builds_one_block_per_function() {
    let code =
      lower("fn add(a int, b int) int { return a + b } fn main() void { add(1, 2) }").unwrap();
    let names: Vec<_> = code.blocks.iter().map(|block| block.name.as_str()).collect();
    assert_eq!(names, vec!["add", "main"]);

    let add = &code.blocks[0];
    assert!(add.returned);
    assert_eq!(add.signature.parameters, vec![Type::Integer, Type::Integer]);
    let [Instruction::Return { value: Value::Binary(binary), .. }] = &add.instructions[..] else {
      panic!("expected a single return of a binary operation");
    };
    assert_eq!(*binary.lhs, Value::Parameter { index: 0, ty: Type::Integer });
    assert_eq!(*binary.rhs, Value::Parameter { index: 1, ty: Type::Integer });

    let main = &code.blocks[1];
    assert!(!main.returned);
    let [Instruction::Call(call)] = &main.instructions[..] else {
      panic!("expected a bare call");
    };
    assert_eq!(call.callee.index, 0);
    assert_eq!(call.ty(), Type::Integer);
    assert_eq!(call.arguments, vec![Value::Integer(1), Value::Integer(2)]);
  }

  #[test]
  fn bare_literals_are_not_instructions() {
    let code = lower("fn main() void { 1 \"s\" }").unwrap();
    assert!(code.blocks[0].instructions.is_empty());
    assert_eq!(code.strings, vec!["s".to_string()]);
  }

  #[test]
  fn identical_strings_get_separate_slots() {
    let code = lower("fn s() string { return \"a\" } fn t() string { return \"a\" }").unwrap();
    assert_eq!(code.strings, vec!["a".to_string(), "a".to_string()]);
    let [Instruction::Return { value, .. }] = &code.blocks[1].instructions[..] else {
      panic!("expected a return");
    };
    assert_eq!(*value, Value::StringReference(1));
  }

  #[test]
  fn entry_symbol_cannot_be_redefined() {
    let (kind, message) = error("fn _start() void {} fn main() void {}");
    assert_eq!(kind, ErrorKind::Invalid);
    assert_eq!(message, "test.pasm:1:4: invalid function: _start is a reserved name");
  }

  #[test]
  fn nested_functions_are_invalid() {
    let (kind, message) = error("fn outer() void { fn inner() void {} }");
    assert_eq!(kind, ErrorKind::Invalid);
    assert!(message.contains("cannot be defined inside another function"));
  }

  #[test]
  fn duplicate_names_are_invalid() {
    let (kind, message) = error("fn f() void {} fn f() void {}");
    assert_eq!(kind, ErrorKind::Invalid);
    assert_eq!(message, "test.pasm:1:19: invalid function: function name is already used");

    let (kind, _) = error("fn f(a int, a int) void {}");
    assert_eq!(kind, ErrorKind::Invalid);
  }

  #[test]
  fn missing_return_names_the_expected_type() {
    let (kind, message) = error("fn f() float { }");
    assert_eq!(kind, ErrorKind::Invalid);
    assert!(message.ends_with("expected to return an expression with a type of float"));
  }

  #[test]
  fn return_placement_is_checked() {
    assert_eq!(error("return 1").0, ErrorKind::Invalid);
    assert_eq!(error("fn f() void { return 1 }").0, ErrorKind::Invalid);
  }

  #[test]
  fn return_type_must_match() {
    let (kind, message) = error("fn f() int { return \"x\" }");
    assert_eq!(kind, ErrorKind::Types);
    assert!(message.contains(
      "expected the return value to be of type integer but got a value of type string"
    ));
  }

  #[test]
  fn calls_only_reach_earlier_functions() {
    let (kind, message) = error("fn main() void { foo() } fn foo() void {}");
    assert_eq!(kind, ErrorKind::Invalid);
    assert!(message.ends_with("call: foo is not a function"));

    assert_eq!(error("fn f() void { f() }").0, ErrorKind::Invalid);
  }

  #[test]
  fn only_identifiers_are_callable() {
    assert_eq!(error("fn main() void { 1(2) }").0, ErrorKind::Invalid);
  }

  #[test]
  fn unknown_identifiers_are_invalid() {
    let (kind, message) = error("fn main() int { return x }");
    assert_eq!(kind, ErrorKind::Invalid);
    assert!(message.ends_with("x is not defined"));
  }

  #[test]
  fn binary_operands_must_agree() {
    assert_eq!(error("fn f() int { return 1 + 2.0 }").0, ErrorKind::Types);
    assert_eq!(error("fn f() string { return \"a\" + \"b\" }").0, ErrorKind::Unsupported);
    let code = lower("fn f(x float) float { return x * 2.5 }").unwrap();
    let [Instruction::Return { value, .. }] = &code.blocks[0].instructions[..] else {
      panic!("expected a return");
    };
    assert_eq!(value.ty(), Type::Float);
  }

  #[test]
  fn argument_checks_are_left_to_codegen() {
    assert!(lower("fn f() void {} fn main() void { f(1) }").is_ok());
  }

  #[test]
  fn top_level_expressions_are_invalid() {
    assert_eq!(error("1 + 2").0, ErrorKind::Invalid);
  }
}
