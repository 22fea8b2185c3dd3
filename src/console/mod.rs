pub mod view;

use crate::config::Config;
use crate::debugger::address::GlobalAddress;
use crate::debugger::register::Register;
use crate::debugger::{Debugger, StopReason};
use rustyline::DefaultEditor;
use view::FileView;

/// Reads a line, dispatches it. Carries no control-flow logic of its own
/// beyond parsing and matching against [`Debugger`] operations.
pub struct Repl {
    editor: DefaultEditor,
    history_path: std::path::PathBuf,
    view: FileView,
    source_context_lines: u64,
}

impl Repl {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        let _ = editor.load_history(&config.history_path);
        Ok(Self {
            editor,
            history_path: config.history_path.clone(),
            view: FileView::new(),
            source_context_lines: config.source_context_lines,
        })
    }

    pub fn run(&mut self, debugger: &mut Debugger) -> anyhow::Result<()> {
        loop {
            let line = match self.editor.readline("(mdbg) ") {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            self.editor.add_history_entry(line.as_str()).ok();

            match self.dispatch(debugger, &line) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => eprintln!("{e:#}"),
            }
        }
        let _ = self.editor.save_history(&self.history_path);
        Ok(())
    }

    /// Returns `Ok(false)` when the session should end.
    fn dispatch(&mut self, debugger: &mut Debugger, line: &str) -> anyhow::Result<bool> {
        let mut tokens = line.split_whitespace();
        let Some(cmd) = tokens.next() else {
            return Ok(true);
        };
        let args: Vec<&str> = tokens.collect();

        let keep_going = if matches(cmd, "continue") {
            self.show_stop(debugger.continue_execution()?, debugger)?
        } else if matches(cmd, "break") {
            let addr = parse_hex(args.first().ok_or_else(missing_arg)?)?;
            debugger.set_breakpoint(GlobalAddress::from(addr), true)?;
            true
        } else if matches(cmd, "stepi") {
            self.show_stop(debugger.step_instruction()?, debugger)?
        } else if matches(cmd, "stepl") {
            self.show_stop(debugger.step_in()?, debugger)?
        } else if matches(cmd, "next") {
            self.show_stop(debugger.step_over()?, debugger)?
        } else if matches(cmd, "finish") {
            self.show_stop(debugger.step_out()?, debugger)?
        } else if matches(cmd, "registers") {
            self.registers(debugger, &args)?;
            true
        } else if matches(cmd, "memory") {
            self.memory(debugger, &args)?;
            true
        } else if matches(cmd, "quit") {
            false
        } else {
            eprintln!("Unknown command");
            true
        };
        Ok(keep_going)
    }

    /// Returns `false` when the stop means the session is over: the tracee
    /// exited or crashed, so resuming it further would be a precondition
    /// violation.
    fn show_stop(&self, reason: StopReason, debugger: &Debugger) -> anyhow::Result<bool> {
        match reason {
            StopReason::Exited(_) => {
                println!("Process finished running.");
                Ok(false)
            }
            StopReason::Segfault => Ok(false),
            StopReason::Breakpoint(_) | StopReason::SingleStep | StopReason::OtherTrap => {
                if let Ok(place) = debugger.place_at_pc() {
                    print!("{}", self.view.render_source(&place, self.source_context_lines)?);
                }
                Ok(true)
            }
        }
    }

    fn registers(&self, debugger: &Debugger, args: &[&str]) -> anyhow::Result<()> {
        match args.first().copied() {
            None | Some("print") => {
                for reg in crate::debugger::register::LIST {
                    let value = debugger.read_register(*reg)?;
                    println!("{:>8} {value:#018x}", reg.name_of());
                }
            }
            Some("read") => {
                let name = args.get(1).ok_or_else(missing_arg)?;
                let reg = Register::from_name(name)?;
                println!("{:#018x}", debugger.read_register(reg)?);
            }
            Some("write") => {
                let name = args.get(1).ok_or_else(missing_arg)?;
                let value = parse_hex(args.get(2).ok_or_else(missing_arg)?)?;
                let reg = Register::from_name(name)?;
                debugger.write_register(reg, value as u64)?;
            }
            Some(other) => eprintln!("Unknown registers subcommand: {other}"),
        }
        Ok(())
    }

    fn memory(&self, debugger: &Debugger, args: &[&str]) -> anyhow::Result<()> {
        match args.first().copied() {
            Some("read") => {
                let addr = parse_hex(args.get(1).ok_or_else(missing_arg)?)?;
                println!("{:#x}", debugger.read_memory(GlobalAddress::from(addr))?);
            }
            Some("write") => {
                let addr = parse_hex(args.get(1).ok_or_else(missing_arg)?)?;
                let value = parse_hex(args.get(2).ok_or_else(missing_arg)?)?;
                debugger.write_memory(GlobalAddress::from(addr), value as u8)?;
            }
            _ => eprintln!("Unknown memory subcommand"),
        }
        Ok(())
    }
}

/// A command matches if `token` is a prefix of `name`.
fn matches(token: &str, name: &str) -> bool {
    !token.is_empty() && name.starts_with(token)
}

fn parse_hex(arg: &str) -> anyhow::Result<usize> {
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    usize::from_str_radix(digits, 16).map_err(|_| anyhow::anyhow!("invalid hex value: {arg}"))
}

fn missing_arg() -> anyhow::Error {
    anyhow::anyhow!("missing argument")
}
