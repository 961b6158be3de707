//! minic compiler CLI
//!
//! Reads one source buffer (file or stdin), runs the pipeline, and writes
//! the result (file or stdout). Any lexer/parser/checker failure goes to
//! stderr with a non-zero exit and no partial output.

use clap::{Parser as ClapParser, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// x86-64 assembly listing (GNU assembler flavor)
    #[default]
    Asm,
    /// Three-address-code listing
    Tac,
}

#[derive(ClapParser)]
#[command(name = "minicc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "minic compiler - compile a C subset to x86-64 assembly", long_about = None)]
struct Cli {
    /// Input source file (defaults to standard input)
    #[arg(short = 'i', long = "input_file", value_name = "PATH")]
    input_file: Option<PathBuf>,

    /// Output file (defaults to standard output)
    #[arg(short = 'o', long = "output_file", value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// What to emit
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    emit: Emit,

    /// Execute the program in the TAC VM and write main's return value
    #[arg(long)]
    run: bool,

    /// TOML configuration file for code generation options
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let source = match read_input(cli.input_file.as_deref()) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let output = match produce_output(&source, &config, cli.emit, cli.run) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_output(cli.output_file.as_deref(), &output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<minicc::CompilerConfig, String> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read config '{}': {}", path.display(), e))?;
            minicc::CompilerConfig::from_toml(&text)
        }
        None => Ok(minicc::CompilerConfig::default()),
    }
}

fn read_input(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("failed to read '{}': {}", path.display(), e)),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|e| format!("failed to read standard input: {}", e))?;
            Ok(source)
        }
    }
}

fn produce_output(
    source: &str,
    config: &minicc::CompilerConfig,
    emit: Emit,
    run: bool,
) -> Result<String, String> {
    if run {
        let value = minicc::run_source(source)?;
        return Ok(format!("{}\n", value));
    }

    match emit {
        Emit::Asm => {
            let asm = minicc::compile_to_asm(source, config)?;
            Ok(format!("{}\n", asm))
        }
        Emit::Tac => {
            let program = minicc::compile_to_tac(source)?;
            Ok(format!("{}\n", program.listing()))
        }
    }
}

fn write_output(path: Option<&Path>, output: &str) -> Result<(), String> {
    match path {
        Some(path) => fs::write(path, output)
            .map_err(|e| format!("failed to write '{}': {}", path.display(), e)),
        None => io::stdout()
            .write_all(output.as_bytes())
            .map_err(|e| format!("failed to write standard output: {}", e)),
    }
}
