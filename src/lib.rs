//! Crate root: wires together the compilation pipeline.
//!
//! Data flows strictly forward through small stages:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `preprocessor` splices `include`d files into that stream.
//! - `parser` owns all syntactic knowledge and returns the program AST.
//! - `ir` lowers the AST into typed blocks and performs every semantic check.
//! - `codegen` lowers the IR through a `Backend` into assembly text.
//! - `error` centralises diagnostics shared by the other modules.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod ir;
pub mod parser;
pub mod preprocessor;
pub mod tokenizer;
pub mod ty;

use std::fs;
use std::path::{Path, PathBuf};

use snafu::ResultExt;

pub use codegen::{Aarch64Backend, Backend};
pub use config::CompileOptions;
pub use error::{CompileError, CompileResult, ErrorKind, Position};

/// Compile `source`, read from `path`, into AArch64 assembly.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn compile_source(
  source: &str,
  path: &Path,
  options: &CompileOptions,
) -> CompileResult<String> {
  let mut backend = Aarch64Backend::new();
  compile_with(source, path, options, &mut backend)?;
  Ok(backend.output())
}

/// Run the whole pipeline, leaving the result in `backend`.
pub fn compile_with<B: Backend + ?Sized>(
  source: &str,
  path: &Path,
  options: &CompileOptions,
  backend: &mut B,
) -> CompileResult<()> {
  let tokens = tokenizer::tokenize(source, path)?;
  let tokens = preprocessor::preprocess(tokens, path, options)?;
  tracing::debug!(?tokens, "tokens");

  let program = parser::parse(tokens, path)?;
  tracing::debug!(?program, "ast");

  let code = ir::generate(&program)?;
  tracing::debug!(?code, "ir");

  codegen::generate(&code, backend)
}

/// Read and compile the file at `path`.
pub fn compile_file(path: &Path, options: &CompileOptions) -> CompileResult<String> {
  let source = fs::read_to_string(path).context(error::ReadSnafu { path })?;
  compile_source(&source, path, options)
}

/// `<stem>.s` in the current directory, the default output for `input`.
pub fn output_path(input: &Path) -> PathBuf {
  let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
  name.push(".s");
  PathBuf::from(name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn output_is_named_after_the_stem() {
    assert_eq!(output_path(Path::new("src/prog.pasm")), PathBuf::from("prog.s"));
    assert_eq!(output_path(Path::new("prog")), PathBuf::from("prog.s"));
    assert_eq!(output_path(Path::new("prog.v1.pasm")), PathBuf::from("prog.v1.s"));
  }
}
