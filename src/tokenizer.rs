//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is intentionally tiny – it knows nothing about semantics.
//! Keywords such as `fn`, `return` and `include` come out as plain
//! identifiers; the parser and preprocessor decide what they mean.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::error::{CompileResult, ErrorKind, Location, Position};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  Identifier(String),
  String(String),
  Integer(i64),
  Float(f64),
  OpenParen,
  CloseParen,
  OpenBrace,
  CloseBrace,
  Colon,
  Period,
  Comma,
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  Eof,
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TokenKind::Identifier(name) => write!(f, "{name}"),
      TokenKind::String(value) => write!(f, "\"{value}\""),
      TokenKind::Integer(value) => write!(f, "{value}"),
      TokenKind::Float(value) => write!(f, "{value:?}"),
      TokenKind::OpenParen => f.write_str("("),
      TokenKind::CloseParen => f.write_str(")"),
      TokenKind::OpenBrace => f.write_str("{"),
      TokenKind::CloseBrace => f.write_str("}"),
      TokenKind::Colon => f.write_str(":"),
      TokenKind::Period => f.write_str("."),
      TokenKind::Comma => f.write_str(","),
      TokenKind::Plus => f.write_str("+"),
      TokenKind::Minus => f.write_str("-"),
      TokenKind::Star => f.write_str("*"),
      TokenKind::Slash => f.write_str("/"),
      TokenKind::Percent => f.write_str("%"),
      TokenKind::Eof => f.write_str("EOF"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub location: Location,
}

impl Token {
  pub fn new(kind: TokenKind, location: Location) -> Self {
    Self { kind, location }
  }

  /// True for an identifier spelled exactly `word`.
  pub fn is_word(&self, word: &str) -> bool {
    matches!(&self.kind, TokenKind::Identifier(name) if name == word)
  }
}

/// Lex `input` read from `file` into a flat vector of tokens terminated by an
/// `Eof` marker positioned at the final cursor.
#[tracing::instrument(skip_all, fields(file = %file.display(), source_len = input.len()))]
pub fn tokenize(input: &str, file: &Path) -> CompileResult<Vec<Token>> {
  let mut lexer = Lexer::new(input, Rc::from(file));
  let tokens = lexer.run()?;
  tracing::trace!(count = tokens.len(), "tokenized");
  Ok(tokens)
}

struct Lexer<'a> {
  chars: std::iter::Peekable<std::str::Chars<'a>>,
  file: Rc<Path>,
  position: Position,
}

impl<'a> Lexer<'a> {
  fn new(input: &'a str, file: Rc<Path>) -> Self {
    Self {
      chars: input.chars().peekable(),
      file,
      position: Position::default(),
    }
  }

  fn location(&self) -> Location {
    Location::new(Rc::clone(&self.file), self.position)
  }

  /// Consume one character, keeping the cursor in step.
  fn bump(&mut self) -> Option<char> {
    let c = self.chars.next()?;
    if c == '\n' {
      self.position.line += 1;
      self.position.column = 1;
    } else {
      self.position.column += 1;
    }
    Some(c)
  }

  fn run(&mut self) -> CompileResult<Vec<Token>> {
    let mut tokens = Vec::new();

    while let Some(&c) = self.chars.peek() {
      if c.is_whitespace() {
        self.bump();
        continue;
      }

      let start = self.location();

      let kind = match c {
        '"' => self.read_string(&start)?,
        c if c.is_ascii_digit() => self.read_number(&start)?,
        c if c.is_alphabetic() || c == '_' => self.read_identifier(),
        _ => {
          self.bump();
          match c {
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Period,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            other => return Err(start.error(ErrorKind::Invalid, format!("token '{other}'"))),
          }
        }
      };

      tokens.push(Token::new(kind, start));
    }

    tokens.push(Token::new(TokenKind::Eof, self.location()));
    Ok(tokens)
  }

  /// Everything up to the next double quote is taken verbatim.
  fn read_string(&mut self, start: &Location) -> CompileResult<TokenKind> {
    self.bump();
    let mut literal = String::new();
    loop {
      match self.bump() {
        Some('"') => return Ok(TokenKind::String(literal)),
        Some(c) => literal.push(c),
        None => return Err(start.error(ErrorKind::Invalid, "unterminated string literal")),
      }
    }
  }

  fn read_number(&mut self, start: &Location) -> CompileResult<TokenKind> {
    let mut literal = String::new();
    while let Some(&c) = self.chars.peek()
      && (c.is_ascii_digit() || c == '.')
    {
      literal.push(c);
      self.bump();
    }

    if literal.contains('.') {
      literal
        .parse::<f64>()
        .map(TokenKind::Float)
        .map_err(|err| start.error(ErrorKind::Invalid, format!("number '{literal}': {err}")))
    } else {
      literal
        .parse::<i64>()
        .map(TokenKind::Integer)
        .map_err(|err| start.error(ErrorKind::Invalid, format!("number '{literal}': {err}")))
    }
  }

  fn read_identifier(&mut self) -> TokenKind {
    let mut literal = String::new();
    while let Some(&c) = self.chars.peek()
      && (c.is_alphanumeric() || c == '_')
    {
      literal.push(c);
      self.bump();
    }
    TokenKind::Identifier(literal)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source, Path::new("test.pasm"))
      .unwrap()
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn lexes_function_header() {
    assert_eq!(
      kinds("fn add(a int) int {}"),
      vec![
        TokenKind::Identifier("fn".into()),
        TokenKind::Identifier("add".into()),
        TokenKind::OpenParen,
        TokenKind::Identifier("a".into()),
        TokenKind::Identifier("int".into()),
        TokenKind::CloseParen,
        TokenKind::Identifier("int".into()),
        TokenKind::OpenBrace,
        TokenKind::CloseBrace,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn numbers_with_a_period_are_floats() {
    assert_eq!(
      kinds("12 3.5 % x_1"),
      vec![
        TokenKind::Integer(12),
        TokenKind::Float(3.5),
        TokenKind::Percent,
        TokenKind::Identifier("x_1".into()),
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn strings_are_taken_verbatim() {
    assert_eq!(
      kinds(r#""hello \n world""#),
      vec![TokenKind::String(r"hello \n world".into()), TokenKind::Eof]
    );
  }

  #[test]
  fn tracks_lines_and_columns() {
    let tokens = tokenize("fn\n  main", Path::new("test.pasm")).unwrap();
    assert_eq!(tokens[0].location.position, Position::new(1, 1));
    assert_eq!(tokens[1].location.position, Position::new(2, 3));
    assert_eq!(tokens[2].location.position, Position::new(2, 7));
  }

  #[test]
  fn rejects_unknown_characters() {
    let err = tokenize("fn main() void {\n  $\n}", Path::new("bad.pasm")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(err.to_string(), "bad.pasm:2:3: invalid token '$'");
  }

  #[test]
  fn rejects_unterminated_strings() {
    let err = tokenize("\"abc", Path::new("bad.pasm")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(err.position(), Some(Position::new(1, 1)));
  }

  #[test]
  fn rejects_malformed_numbers() {
    let err = tokenize("1.2.3", Path::new("bad.pasm")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
  }
}
