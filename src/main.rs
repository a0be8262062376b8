use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pasm::CompileOptions;

/// Compile a pasm source file to AArch64 assembly.
#[derive(Debug, Parser)]
#[command(name = "pasm", version, about)]
struct Args {
  /// Source file to compile
  file_path: PathBuf,

  /// Where to write the assembly (defaults to `<stem>.s` in the current directory)
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Extra library roots searched by `include`, in order, before the defaults
  #[arg(short = 'L', long = "library-path")]
  library_paths: Vec<PathBuf>,

  /// Log tokens, AST and IR while compiling
  #[arg(long)]
  emit_outputs: bool,
}

fn main() {
  let args = Args::parse();

  let default_filter = if args.emit_outputs { "pasm=debug" } else { "warn" };
  let _ = tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    )
    .with_writer(std::io::stderr)
    .try_init();

  if !args.file_path.is_file() {
    eprintln!("{} is not a file", args.file_path.display());
    process::exit(1);
  }

  let options = args
    .library_paths
    .iter()
    .rev()
    .fold(CompileOptions::from_env(), |options, path| options.with_library_path(path));

  let asm = match pasm::compile_file(&args.file_path, &options) {
    Ok(asm) => asm,
    Err(err) => {
      eprintln!("{err}");
      process::exit(err.exit_code());
    }
  };

  if args.emit_outputs {
    tracing::info!("assembly:\n{asm}");
  }

  let output = args
    .output
    .unwrap_or_else(|| pasm::output_path(&args.file_path));
  if let Err(err) = fs::write(&output, asm) {
    eprintln!("{}: {err}", output.display());
    process::exit(1);
  }
}
