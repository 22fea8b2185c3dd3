use crate::debugger::error::{Error, Result};
use nix::sys::ptrace;
use nix::unistd::Pid;
use strum_macros::{Display, EnumString};

/// The 27 integer registers ptrace's `GETREGS`/`SETREGS` expose, in the order
/// `nix::libc::user_regs_struct` lays them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Register {
    R15,
    R14,
    R13,
    R12,
    Rbp,
    Rbx,
    R11,
    R10,
    R9,
    R8,
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    OrigRax,
    Rip,
    Cs,
    Eflags,
    Rsp,
    Ss,
    FsBase,
    GsBase,
    Ds,
    Es,
    Fs,
    Gs,
}

impl Register {
    /// Program counter alias.
    pub const PC: Register = Register::Rip;
    /// Frame pointer alias.
    pub const FP: Register = Register::Rbp;

    pub fn name_of(self) -> String {
        self.to_string()
    }

    pub fn from_name(name: &str) -> Result<Register> {
        name.parse()
            .map_err(|_| Error::UnknownRegister(name.to_string()))
    }
}

impl From<gimli::Register> for Register {
    fn from(reg: gimli::Register) -> Self {
        match reg.0 {
            0 => Register::Rax,
            1 => Register::Rdx,
            2 => Register::Rcx,
            3 => Register::Rbx,
            4 => Register::Rsi,
            5 => Register::Rdi,
            6 => Register::Rbp,
            7 => Register::Rsp,
            8 => Register::R8,
            9 => Register::R9,
            10 => Register::R10,
            11 => Register::R11,
            12 => Register::R12,
            13 => Register::R13,
            14 => Register::R14,
            15 => Register::R15,
            16 => Register::Rip,
            49 => Register::Eflags,
            50 => Register::Es,
            51 => Register::Cs,
            52 => Register::Ss,
            53 => Register::Ds,
            54 => Register::Fs,
            55 => Register::Gs,
            58 => Register::FsBase,
            59 => Register::GsBase,
            n => panic!("unsupported dwarf register number {n}"),
        }
    }
}

/// All 27 registers, for `registers print`.
pub const LIST: &[Register] = &[
    Register::R15,
    Register::R14,
    Register::R13,
    Register::R12,
    Register::Rbp,
    Register::Rbx,
    Register::R11,
    Register::R10,
    Register::R9,
    Register::R8,
    Register::Rax,
    Register::Rcx,
    Register::Rdx,
    Register::Rsi,
    Register::Rdi,
    Register::OrigRax,
    Register::Rip,
    Register::Cs,
    Register::Eflags,
    Register::Rsp,
    Register::Ss,
    Register::FsBase,
    Register::GsBase,
    Register::Ds,
    Register::Es,
    Register::Fs,
    Register::Gs,
];

fn field(regs: &nix::libc::user_regs_struct, reg: Register) -> u64 {
    match reg {
        Register::R15 => regs.r15,
        Register::R14 => regs.r14,
        Register::R13 => regs.r13,
        Register::R12 => regs.r12,
        Register::Rbp => regs.rbp,
        Register::Rbx => regs.rbx,
        Register::R11 => regs.r11,
        Register::R10 => regs.r10,
        Register::R9 => regs.r9,
        Register::R8 => regs.r8,
        Register::Rax => regs.rax,
        Register::Rcx => regs.rcx,
        Register::Rdx => regs.rdx,
        Register::Rsi => regs.rsi,
        Register::Rdi => regs.rdi,
        Register::OrigRax => regs.orig_rax,
        Register::Rip => regs.rip,
        Register::Cs => regs.cs,
        Register::Eflags => regs.eflags,
        Register::Rsp => regs.rsp,
        Register::Ss => regs.ss,
        Register::FsBase => regs.fs_base,
        Register::GsBase => regs.gs_base,
        Register::Ds => regs.ds,
        Register::Es => regs.es,
        Register::Fs => regs.fs,
        Register::Gs => regs.gs,
    }
}

fn set_field(regs: &mut nix::libc::user_regs_struct, reg: Register, value: u64) {
    let slot = match reg {
        Register::R15 => &mut regs.r15,
        Register::R14 => &mut regs.r14,
        Register::R13 => &mut regs.r13,
        Register::R12 => &mut regs.r12,
        Register::Rbp => &mut regs.rbp,
        Register::Rbx => &mut regs.rbx,
        Register::R11 => &mut regs.r11,
        Register::R10 => &mut regs.r10,
        Register::R9 => &mut regs.r9,
        Register::R8 => &mut regs.r8,
        Register::Rax => &mut regs.rax,
        Register::Rcx => &mut regs.rcx,
        Register::Rdx => &mut regs.rdx,
        Register::Rsi => &mut regs.rsi,
        Register::Rdi => &mut regs.rdi,
        Register::OrigRax => &mut regs.orig_rax,
        Register::Rip => &mut regs.rip,
        Register::Cs => &mut regs.cs,
        Register::Eflags => &mut regs.eflags,
        Register::Rsp => &mut regs.rsp,
        Register::Ss => &mut regs.ss,
        Register::FsBase => &mut regs.fs_base,
        Register::GsBase => &mut regs.gs_base,
        Register::Ds => &mut regs.ds,
        Register::Es => &mut regs.es,
        Register::Fs => &mut regs.fs,
        Register::Gs => &mut regs.gs,
    };
    *slot = value;
}

pub fn read(pid: Pid, reg: Register) -> Result<u64> {
    let regs = ptrace::getregs(pid).map_err(Error::Ptrace)?;
    Ok(field(&regs, reg))
}

pub fn write(pid: Pid, reg: Register, value: u64) -> Result<()> {
    let mut regs = ptrace::getregs(pid).map_err(Error::Ptrace)?;
    set_field(&mut regs, reg, value);
    ptrace::setregs(pid, regs).map_err(Error::Ptrace)?;
    Ok(())
}
