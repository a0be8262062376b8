use std::fmt;

/// Value types of the language. Closed set, compared by equality wherever
/// type checking happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
  Void,
  Integer,
  Float,
  String,
}

impl Type {
  /// Map a type keyword to its type.
  pub fn from_keyword(word: &str) -> Option<Self> {
    match word {
      "void" => Some(Type::Void),
      "int" => Some(Type::Integer),
      "float" => Some(Type::Float),
      "string" => Some(Type::String),
      _ => None,
    }
  }

  pub fn is_numeric(self) -> bool {
    matches!(self, Type::Integer | Type::Float)
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Type::Void => "void",
      Type::Integer => "integer",
      Type::Float => "float",
      Type::String => "string",
    };
    f.write_str(name)
  }
}
