//! Compilation options shared by the driver and the library entry points.

use std::env;
use std::path::PathBuf;

/// Knobs that influence how a compilation unit is assembled.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
  /// Ordered library roots consulted by `include` after the includer's own
  /// directory. First existing file wins.
  pub library_paths: Vec<PathBuf>,
}

impl CompileOptions {
  /// Options with no library roots.
  pub fn new() -> Self {
    Self::default()
  }

  /// Default library roots for an installed toolchain: the install prefix,
  /// every `PATH` entry, the user's home, then `./lib` and `../lib`.
  pub fn from_env() -> Self {
    let mut library_paths = Vec::new();

    if let Ok(exe) = env::current_exe()
      && let Some(prefix) = exe.parent().and_then(|bin| bin.parent())
    {
      library_paths.push(prefix.join("lib").join("pasm"));
    }

    if let Some(path) = env::var_os("PATH") {
      library_paths.extend(env::split_paths(&path).map(|dir| dir.join("pasm").join("lib")));
    }

    if let Some(home) = env::var_os("HOME") {
      library_paths.push(PathBuf::from(home).join("pasm").join("lib"));
    }

    library_paths.push(PathBuf::from("lib"));
    library_paths.push(PathBuf::from("..").join("lib"));

    Self { library_paths }
  }

  /// Search `path` before every root already configured.
  pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.library_paths.insert(0, path.into());
    self
  }
}
