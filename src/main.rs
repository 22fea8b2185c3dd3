use clap::Parser;
use mdbg::config::Config;
use mdbg::console::Repl;
use mdbg::debugger::process::Child;
use mdbg::debugger::Debugger;
use std::path::PathBuf;
use std::process::ExitCode;

/// A lightweight source-level debugger for x86-64 Linux executables.
#[derive(Parser)]
struct Args {
    /// Path to the program to debug.
    program: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprint!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let child = Child::new(&args.program.to_string_lossy(), &[]);
    let installed = match child.install() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to launch {}: {e}", args.program.display());
            return ExitCode::FAILURE;
        }
    };

    let mut debugger = match Debugger::new(&args.program, installed) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("failed to load debug information: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = debugger.wait_for_signal() {
        eprintln!("failed to attach: {e}");
        return ExitCode::FAILURE;
    }

    let config = Config::default();
    let mut repl = match Repl::new(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failed to start console: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = repl.run(&mut debugger) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
