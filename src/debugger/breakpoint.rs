use crate::debugger::address::RelocatedAddress;
use crate::debugger::error::{Error, Result};
use nix::sys::ptrace;
use nix::unistd::Pid;
use std::cell::Cell;

const TRAP_INSTRUCTION: u64 = 0xcc;

/// A single software breakpoint: one `int3` byte patched into tracee memory.
///
/// Invariant A: while `enabled`, the byte at `addr` is `0xcc` and `saved_byte`
/// holds the byte that was there before. While disabled, the byte at `addr`
/// equals `saved_byte`.
pub struct Breakpoint {
    pid: Pid,
    addr: RelocatedAddress,
    saved_byte: Cell<u8>,
    enabled: Cell<bool>,
}

impl Breakpoint {
    pub fn new(pid: Pid, addr: RelocatedAddress) -> Self {
        Self {
            pid,
            addr,
            saved_byte: Cell::new(0),
            enabled: Cell::new(false),
        }
    }

    pub fn addr(&self) -> RelocatedAddress {
        self.addr
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn enable(&self) -> Result<()> {
        if self.enabled.get() {
            return Ok(());
        }
        let word = read_word(self.pid, self.addr)?;
        self.saved_byte.set((word & 0xff) as u8);
        let patched = (word & !0xff) | TRAP_INSTRUCTION;
        write_word(self.pid, self.addr, patched)?;
        self.enabled.set(true);
        Ok(())
    }

    pub fn disable(&self) -> Result<()> {
        if !self.enabled.get() {
            return Ok(());
        }
        let word = read_word(self.pid, self.addr)?;
        let restored = (word & !0xff) | self.saved_byte.get() as u64;
        write_word(self.pid, self.addr, restored)?;
        self.enabled.set(false);
        Ok(())
    }
}

fn read_word(pid: Pid, addr: RelocatedAddress) -> Result<u64> {
    let word = ptrace::read(pid, addr.as_usize() as ptrace::AddressType).map_err(Error::Ptrace)?;
    Ok(word as u64)
}

fn write_word(pid: Pid, addr: RelocatedAddress, word: u64) -> Result<()> {
    unsafe {
        ptrace::write(
            pid,
            addr.as_usize() as ptrace::AddressType,
            word as *mut std::ffi::c_void,
        )
        .map_err(Error::Ptrace)
    }
}
