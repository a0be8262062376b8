//! `include "path"` expansion.
//!
//! Directives are replaced in place by the tokens of the referenced file,
//! depth first, so nested includes land before the includer's remaining
//! tokens. Each resolved file is spliced at most once per compilation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::config::CompileOptions;
use crate::error::{CompileResult, ErrorKind, ReadSnafu};
use crate::tokenizer::{Token, TokenKind, tokenize};

/// Expand every include directive in `tokens`, which were lexed from `root`.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn preprocess(
  tokens: Vec<Token>,
  root: &Path,
  options: &CompileOptions,
) -> CompileResult<Vec<Token>> {
  let mut preprocessor = Preprocessor {
    options,
    seen: HashSet::from([canonical(root)]),
  };
  let mut output = Vec::with_capacity(tokens.len());
  preprocessor.expand(tokens, &mut output)?;
  Ok(output)
}

struct Preprocessor<'a> {
  options: &'a CompileOptions,
  seen: HashSet<PathBuf>,
}

impl Preprocessor<'_> {
  fn expand(&mut self, tokens: Vec<Token>, output: &mut Vec<Token>) -> CompileResult<()> {
    let mut stream = tokens.into_iter();

    while let Some(token) = stream.next() {
      if !token.is_word("include") {
        output.push(token);
        continue;
      }

      let (name, location) = match stream.next() {
        Some(Token {
          kind: TokenKind::String(name),
          location,
        }) if !name.is_empty() => (name, location),
        Some(other) => {
          return Err(other.location.error(
            ErrorKind::Invalid,
            "syntax: expected the file path to be a string",
          ));
        }
        None => {
          return Err(token.location.error(
            ErrorKind::Invalid,
            "syntax: expected the file path to be a string",
          ));
        }
      };

      let Some(path) = self.resolve(&name, &location.file) else {
        return Err(location.error(ErrorKind::Invalid, format!("include: {name} is not a file")));
      };

      if !self.seen.insert(canonical(&path)) {
        tracing::debug!(path = %path.display(), "skipping repeated include");
        continue;
      }

      tracing::debug!(path = %path.display(), "including");
      let source = fs::read_to_string(&path).context(ReadSnafu { path: path.clone() })?;
      let mut included = tokenize(&source, &path)?;
      included.pop();
      self.expand(included, output)?;
    }

    Ok(())
  }

  /// The includer's directory first, then each library root in order.
  fn resolve(&self, name: &str, includer: &Path) -> Option<PathBuf> {
    let sibling = includer
      .parent()
      .map(|dir| dir.join(name))
      .unwrap_or_else(|| PathBuf::from(name));

    std::iter::once(sibling)
      .chain(self.options.library_paths.iter().map(|root| root.join(name)))
      .find(|candidate| candidate.is_file())
  }
}

fn canonical(path: &Path) -> PathBuf {
  fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use tempfile::TempDir;

  fn words(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(|token| token.kind.to_string()).collect()
  }

  fn run(dir: &TempDir, root: &str, options: &CompileOptions) -> CompileResult<Vec<Token>> {
    let path = dir.path().join(root);
    let source = fs::read_to_string(&path).unwrap();
    let tokens = tokenize(&source, &path)?;
    preprocess(tokens, &path, options)
  }

  #[test]
  fn splices_included_tokens_in_place() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.pasm"), "a include \"b.pasm\" d").unwrap();
    fs::write(dir.path().join("b.pasm"), "b c").unwrap();

    let tokens = run(&dir, "main.pasm", &CompileOptions::new()).unwrap();
    assert_eq!(words(&tokens), vec!["a", "b", "c", "d", "EOF"]);
  }

  #[test]
  fn nested_includes_expand_before_the_rest() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("main.pasm"), "include \"sub/one.pasm\" z").unwrap();
    fs::write(dir.path().join("sub/one.pasm"), "x include \"two.pasm\" y").unwrap();
    fs::write(dir.path().join("sub/two.pasm"), "inner").unwrap();

    let tokens = run(&dir, "main.pasm", &CompileOptions::new()).unwrap();
    assert_eq!(words(&tokens), vec!["x", "inner", "y", "z", "EOF"]);
  }

  #[test]
  fn repeated_includes_contribute_once() {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("main.pasm"),
      "include \"lib.pasm\" include \"./lib.pasm\" end",
    )
    .unwrap();
    fs::write(dir.path().join("lib.pasm"), "shared").unwrap();

    let tokens = run(&dir, "main.pasm", &CompileOptions::new()).unwrap();
    assert_eq!(words(&tokens), vec!["shared", "end", "EOF"]);
  }

  #[test]
  fn including_the_root_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.pasm"), "include \"main.pasm\" only").unwrap();

    let tokens = run(&dir, "main.pasm", &CompileOptions::new()).unwrap();
    assert_eq!(words(&tokens), vec!["only", "EOF"]);
  }

  #[test]
  fn falls_back_to_library_roots() {
    let dir = TempDir::new().unwrap();
    let lib = TempDir::new().unwrap();
    fs::write(dir.path().join("main.pasm"), "include \"io.pasm\"").unwrap();
    fs::write(lib.path().join("io.pasm"), "print").unwrap();

    let options = CompileOptions::new().with_library_path(lib.path());
    let tokens = run(&dir, "main.pasm", &options).unwrap();
    assert_eq!(words(&tokens), vec!["print", "EOF"]);
  }

  #[test]
  fn missing_file_is_invalid() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.pasm"), "include \"nope.pasm\"").unwrap();

    let err = run(&dir, "main.pasm", &CompileOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert!(err.to_string().ends_with("invalid include: nope.pasm is not a file"));
  }

  #[test]
  fn include_requires_a_non_empty_string() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.pasm"), "include foo").unwrap();
    fs::write(dir.path().join("b.pasm"), "include \"\"").unwrap();

    for root in ["a.pasm", "b.pasm"] {
      let err = run(&dir, root, &CompileOptions::new()).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Invalid);
    }
  }
}
