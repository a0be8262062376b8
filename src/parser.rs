//! Recursive-descent parser producing a statement list and expression AST.
//!
//! Statements are keyword-triggered by identifier text (`fn`, `return`);
//! everything else is an expression statement. Expressions use precedence
//! climbing: after a primary term we keep extending the left-hand side while
//! the next token binds tighter than the current threshold. A `(` directly
//! after a term is a call and binds tighter than any operator.

use std::path::Path;
use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, Function, Parameter, Program, Stmt};
use crate::error::{CompileResult, ErrorKind, Location, Position};
use crate::tokenizer::{Token, TokenKind};
use crate::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
  Lowest,
  Sum,
  Product,
  Call,
}

/// What a token does when it follows a complete term.
#[derive(Debug, Clone, Copy)]
enum Infix {
  Binary(BinaryOp),
  Call,
}

fn infix(kind: &TokenKind) -> Option<(Precedence, Infix)> {
  let entry = match kind {
    TokenKind::Plus => (Precedence::Sum, Infix::Binary(BinaryOp::Add)),
    TokenKind::Minus => (Precedence::Sum, Infix::Binary(BinaryOp::Sub)),
    TokenKind::Star => (Precedence::Product, Infix::Binary(BinaryOp::Mul)),
    TokenKind::Slash => (Precedence::Product, Infix::Binary(BinaryOp::Div)),
    TokenKind::Percent => (Precedence::Product, Infix::Binary(BinaryOp::Rem)),
    TokenKind::OpenParen => (Precedence::Call, Infix::Call),
    _ => return None,
  };
  Some(entry)
}

/// Parse an `Eof`-terminated token stream into a program. `file` is only used
/// to anchor diagnostics when the stream is empty.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: Vec<Token>, file: &Path) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, file);
  let mut body = Vec::new();

  while !stream.is_eof() {
    body.push(parse_stmt(&mut stream)?);
  }

  Ok(Program {
    body,
    location: stream.peek().location.clone(),
  })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let token = stream.peek();
  if token.is_word("fn") {
    return parse_function(stream).map(Stmt::Function);
  }
  if token.is_word("return") {
    stream.advance();
    return parse_expr(stream, Precedence::Lowest).map(Stmt::Return);
  }
  parse_expr(stream, Precedence::Lowest).map(Stmt::Expr)
}

fn parse_function(stream: &mut TokenStream) -> CompileResult<Function> {
  stream.advance();

  let (name, location) =
    stream.identifier("syntax: expected the function name to be an identifier")?;
  let parameters = parse_parameters(stream)?;
  let return_type = parse_type(stream)?;
  let body = parse_body(stream)?;

  Ok(Function {
    name,
    parameters,
    body,
    return_type,
    location,
  })
}

fn parse_parameters(stream: &mut TokenStream) -> CompileResult<Vec<Parameter>> {
  stream.expect(
    &TokenKind::OpenParen,
    "syntax: expected the function parameters to start with '('",
  )?;

  let mut parameters = Vec::new();
  loop {
    if stream.eat(&TokenKind::CloseParen) {
      break;
    }

    let (name, location) =
      stream.identifier("syntax: expected the parameter name to be an identifier")?;
    let ty = parse_type(stream)?;
    parameters.push(Parameter { name, ty, location });

    if stream.eat(&TokenKind::Comma) {
      continue;
    }
    stream.expect(
      &TokenKind::CloseParen,
      "syntax: expected the function parameters to end with ')'",
    )?;
    break;
  }

  Ok(parameters)
}

fn parse_type(stream: &mut TokenStream) -> CompileResult<Type> {
  let token = stream.advance();
  let ty = match &token.kind {
    TokenKind::Identifier(word) => Type::from_keyword(word),
    _ => None,
  };
  ty.ok_or_else(|| {
    token
      .location
      .error(ErrorKind::Unsupported, format!("type '{}'", token.kind))
  })
}

fn parse_body(stream: &mut TokenStream) -> CompileResult<Vec<Stmt>> {
  stream.expect(
    &TokenKind::OpenBrace,
    "syntax: expected the function body to start with '{'",
  )?;

  let mut body = Vec::new();
  while !stream.eat(&TokenKind::CloseBrace) {
    if stream.is_eof() {
      return Err(
        stream
          .peek()
          .location
          .error(ErrorKind::Invalid, "syntax: expected the function body to end with '}'"),
      );
    }
    body.push(parse_stmt(stream)?);
  }

  Ok(body)
}

fn parse_expr(stream: &mut TokenStream, threshold: Precedence) -> CompileResult<Expr> {
  let mut lhs = parse_primary(stream)?;

  while let Some((precedence, action)) = infix(&stream.peek().kind)
    && precedence > threshold
  {
    let operator = stream.advance();
    lhs = match action {
      Infix::Binary(op) => {
        let rhs = parse_expr(stream, precedence)?;
        Expr::binary(op, lhs, rhs, operator.location)
      }
      Infix::Call => Expr::call(lhs, parse_arguments(stream)?),
    };
  }

  Ok(lhs)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<Expr> {
  let token = stream.advance();
  let location = token.location;
  let expr = match token.kind {
    TokenKind::Identifier(name) => Expr::Identifier { name, location },
    TokenKind::String(value) => Expr::String { value, location },
    TokenKind::Integer(value) => Expr::Integer { value, location },
    TokenKind::Float(value) => Expr::Float { value, location },
    other => {
      return Err(location.error(ErrorKind::Unknown, format!("expression '{other}'")));
    }
  };
  Ok(expr)
}

/// Arguments after the opening parenthesis, through the closing one.
fn parse_arguments(stream: &mut TokenStream) -> CompileResult<Vec<Expr>> {
  let mut arguments = Vec::new();
  loop {
    if stream.eat(&TokenKind::CloseParen) {
      break;
    }
    if stream.is_eof() {
      return Err(
        stream
          .peek()
          .location
          .error(ErrorKind::Invalid, "syntax: expected the call arguments to end with ')'"),
      );
    }

    arguments.push(parse_expr(stream, Precedence::Lowest)?);

    if stream.eat(&TokenKind::Comma) {
      continue;
    }
    stream.expect(
      &TokenKind::CloseParen,
      "syntax: expected the call arguments to end with ')'",
    )?;
    break;
  }
  Ok(arguments)
}

/// Cursor over the token vector. The trailing `Eof` is never stepped past.
struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
}

impl TokenStream {
  fn new(mut tokens: Vec<Token>, file: &Path) -> Self {
    if !matches!(tokens.last().map(|token| &token.kind), Some(TokenKind::Eof)) {
      let location = tokens
        .last()
        .map(|token| token.location.clone())
        .unwrap_or_else(|| Location::new(Rc::from(file), Position::default()));
      tokens.push(Token::new(TokenKind::Eof, location));
    }
    Self { tokens, pos: 0 }
  }

  fn peek(&self) -> &Token {
    &self.tokens[self.pos]
  }

  /// Take the current token; at `Eof` the cursor stays put.
  fn advance(&mut self) -> Token {
    let token = self.tokens[self.pos].clone();
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    token
  }

  /// Consume the current token if it is `kind`.
  fn eat(&mut self, kind: &TokenKind) -> bool {
    if &self.peek().kind == kind {
      self.advance();
      return true;
    }
    false
  }

  fn expect(&mut self, kind: &TokenKind, message: &str) -> CompileResult<()> {
    if self.eat(kind) {
      Ok(())
    } else {
      Err(self.peek().location.error(ErrorKind::Invalid, message))
    }
  }

  fn identifier(&mut self, message: &str) -> CompileResult<(String, Location)> {
    if let TokenKind::Identifier(name) = &self.peek().kind {
      let name = name.clone();
      let location = self.advance().location;
      return Ok((name, location));
    }
    Err(self.peek().location.error(ErrorKind::Invalid, message))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().kind, TokenKind::Eof)
  }
}
