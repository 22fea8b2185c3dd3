pub mod address;
pub mod breakpoint;
pub mod dwarf;
pub mod error;
pub mod process;
pub mod register;
mod step;

use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::breakpoint::Breakpoint;
use crate::debugger::dwarf::{DebugInformation, Place};
use crate::debugger::error::{Error, Result};
use crate::debugger::process::{Child, Installed};
use crate::weak_error;
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::path::Path;

/// The reason `wait_for_signal` returned control to the caller.
#[derive(Debug)]
pub enum StopReason {
    /// A software breakpoint fired; `PC` has already been fixed up to point
    /// back at the trapped instruction.
    Breakpoint(RelocatedAddress),
    /// The previous resume was a single step.
    SingleStep,
    /// Some other `SIGTRAP`; ignored.
    OtherTrap,
    /// `SIGSEGV`.
    Segfault,
    /// Any other signal, interpreted as "the program finished."
    Exited(i32),
}

/// The control plane of the debugger: tracee pid, load offset, breakpoint
/// table, and DWARF context. Single tracee, single thread, single host.
pub struct Debugger {
    pid: Pid,
    load_offset: Option<usize>,
    breakpoints: HashMap<GlobalAddress, Breakpoint>,
    dwarf: DebugInformation,
}

impl Debugger {
    pub fn new(program: &Path, child: Child<Installed>) -> Result<Self> {
        let dwarf = DebugInformation::load(program)?;
        Ok(Self {
            pid: child.pid(),
            load_offset: None,
            breakpoints: HashMap::new(),
            dwarf,
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    fn load_offset(&self) -> usize {
        self.load_offset.expect("load offset read before first stop")
    }

    fn to_abs(&self, rel: GlobalAddress) -> RelocatedAddress {
        rel.relocate(self.load_offset())
    }

    fn to_rel(&self, abs: RelocatedAddress) -> GlobalAddress {
        abs.into_global(self.load_offset())
    }

    /// Blocks on the tracee and classifies why it stopped. Initializes the
    /// load offset on the very first call, after the kernel's exec-trace
    /// stop, to avoid racing the child's own image mapping.
    pub fn wait_for_signal(&mut self) -> Result<StopReason> {
        let status = waitpid(self.pid, None).map_err(Error::Waitpid)?;

        if self.load_offset.is_none() {
            self.load_offset = Some(if self.dwarf.is_pie() {
                dwarf::read_load_offset(self.pid)?
            } else {
                0
            });
            println!(
                "Process {} loaded at {:#x}",
                self.pid,
                self.load_offset()
            );
        }

        match status {
            WaitStatus::Exited(_, code) => Ok(StopReason::Exited(code)),
            WaitStatus::Signaled(..) => Ok(StopReason::Exited(1)),
            WaitStatus::Stopped(pid, Signal::SIGTRAP) => {
                let siginfo = ptrace::getsiginfo(pid).map_err(Error::Ptrace)?;
                match siginfo.si_code {
                    0x80 /* SI_KERNEL */ | 1 /* TRAP_BRKPT */ => {
                        let pc = register::read(self.pid, register::Register::PC)?;
                        let trap_addr = RelocatedAddress::from(pc as usize - 1);
                        register::write(self.pid, register::Register::PC, trap_addr.as_usize() as u64)?;
                        let rel = self.to_rel(trap_addr);
                        if let Some(place) = weak_error!(self.dwarf.line_from_pc(rel)) {
                            println!("Hit breakpoint at {trap_addr}");
                            println!("{}:{}", place.file.display(), place.line_number);
                        } else {
                            println!("Hit breakpoint at {trap_addr}");
                        }
                        Ok(StopReason::Breakpoint(trap_addr))
                    }
                    2 /* TRAP_TRACE */ => Ok(StopReason::SingleStep),
                    _ => Ok(StopReason::OtherTrap),
                }
            }
            WaitStatus::Stopped(pid, Signal::SIGSEGV) => {
                let pc = register::read(pid, register::Register::PC)?;
                let rel = self.to_rel(RelocatedAddress::from(pc as usize));
                if let Some(place) = weak_error!(self.dwarf.line_from_pc(rel)) {
                    println!("segfault on line {}", place.line_number);
                } else {
                    println!("segfault at {rel}");
                }
                Ok(StopReason::Segfault)
            }
            // Neither SIGTRAP nor SIGSEGV: treat the tracee as finished and
            // let the caller report it (see console::Repl::show_stop, which
            // prints the same message for every `Exited` reason).
            WaitStatus::Stopped(..) => Ok(StopReason::Exited(0)),
            _ => Ok(StopReason::Exited(0)),
        }
    }

    // --- breakpoint management -------------------------------------------

    pub fn set_breakpoint(&mut self, rel: GlobalAddress, verbose: bool) -> Result<()> {
        let bp = Breakpoint::new(self.pid, self.to_abs(rel));
        bp.enable()?;
        if verbose {
            println!("Set breakpoint at {rel}");
        }
        self.breakpoints.insert(rel, bp);
        Ok(())
    }

    pub fn remove_breakpoint(&mut self, rel: GlobalAddress, verbose: bool) -> Result<()> {
        if let Some(bp) = self.breakpoints.remove(&rel) {
            bp.disable()?;
            if verbose {
                println!("Removed breakpoint at {rel}");
            }
        }
        Ok(())
    }

    pub fn disable_breakpoint(&mut self, rel: GlobalAddress, verbose: bool) -> Result<()> {
        if let Some(bp) = self.breakpoints.get(&rel) {
            bp.disable()?;
            if verbose {
                println!("Disabled breakpoint at {rel}");
            }
        }
        Ok(())
    }

    pub fn set_breakpoint_at_function(&mut self, name: &str) -> Result<()> {
        let addr = self.dwarf.function_by_name(name)?;
        self.set_breakpoint(addr, true)
    }

    pub fn set_breakpoint_at_line(&mut self, file: &str, line: u64) -> Result<()> {
        let addr = self.dwarf.source_line(file, line)?;
        self.set_breakpoint(addr, true)
    }

    fn enabled_breakpoint_at(&self, rel: GlobalAddress) -> bool {
        self.breakpoints
            .get(&rel)
            .map(|bp| bp.is_enabled())
            .unwrap_or(false)
    }

    /// Every key currently in the breakpoint table, for introspection
    /// (Invariant C: each key's relocated breakpoint address is `key + L`).
    pub fn breakpoint_addresses(&self) -> Vec<GlobalAddress> {
        self.breakpoints.keys().copied().collect()
    }

    // --- memory I/O ---------------------------------------------------

    pub fn read_memory(&self, rel: GlobalAddress) -> Result<u64> {
        let abs = self.to_abs(rel);
        let word =
            ptrace::read(self.pid, abs.as_usize() as ptrace::AddressType).map_err(Error::Ptrace)?;
        Ok(word as u64)
    }

    pub fn write_memory(&self, rel: GlobalAddress, byte: u8) -> Result<()> {
        let abs = self.to_abs(rel);
        let addr = abs.as_usize() as ptrace::AddressType;
        let word = ptrace::read(self.pid, addr).map_err(Error::Ptrace)? as u64;
        let patched = (word & !0xff) | byte as u64;
        unsafe {
            ptrace::write(self.pid, addr, patched as *mut std::ffi::c_void).map_err(Error::Ptrace)?;
        }
        Ok(())
    }

    // --- registers ------------------------------------------------------

    pub fn read_register(&self, reg: register::Register) -> Result<u64> {
        register::read(self.pid, reg)
    }

    pub fn write_register(&self, reg: register::Register, value: u64) -> Result<()> {
        register::write(self.pid, reg, value)
    }

    pub fn current_pc(&self) -> Result<GlobalAddress> {
        let pc = register::read(self.pid, register::Register::PC)?;
        Ok(self.to_rel(RelocatedAddress::from(pc as usize)))
    }

    fn return_address(&self) -> Result<GlobalAddress> {
        let fp = register::read(self.pid, register::Register::FP)?;
        let ret_abs = RelocatedAddress::from(fp as usize) + 8;
        let word = ptrace::read(self.pid, ret_abs.as_usize() as ptrace::AddressType)
            .map_err(Error::Ptrace)? as u64;
        Ok(self.to_rel(RelocatedAddress::from(word as usize)))
    }

    pub fn place_at_pc(&self) -> Result<Place> {
        self.dwarf.line_from_pc(self.current_pc()?)
    }

    pub fn dwarf(&self) -> &DebugInformation {
        &self.dwarf
    }

    // --- resume primitives ----------------------------------------------

    fn raw_single_step(&mut self) -> Result<StopReason> {
        ptrace::step(self.pid, None).map_err(Error::Ptrace)?;
        self.wait_for_signal()
    }

    /// The transparency primitive: a single user-visible instruction step
    /// that stays invisible to an enabled breakpoint at the current PC.
    pub fn single_step_instruction(&mut self) -> Result<StopReason> {
        let pc = self.current_pc()?;
        if self.enabled_breakpoint_at(pc) {
            let bp = self.breakpoints.get(&pc).expect("checked above");
            bp.disable()?;
            let reason = self.raw_single_step()?;
            // breakpoint may have been removed by the step's own handling
            if let Some(bp) = self.breakpoints.get(&pc) {
                bp.enable()?;
            }
            Ok(reason)
        } else {
            self.raw_single_step()
        }
    }

    pub fn continue_execution(&mut self) -> Result<StopReason> {
        self.single_step_instruction()?;
        ptrace::cont(self.pid, None).map_err(Error::Ptrace)?;
        self.wait_for_signal()
    }

    // --- source-level stepping -------------------------------------------

    pub fn step_instruction(&mut self) -> Result<StopReason> {
        self.single_step_instruction()
    }

    pub fn step_in(&mut self) -> Result<StopReason> {
        step::step_in(self)
    }

    pub fn step_over(&mut self) -> Result<StopReason> {
        step::step_over(self)
    }

    pub fn step_out(&mut self) -> Result<StopReason> {
        step::step_out(self)
    }
}
