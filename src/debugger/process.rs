use crate::debugger::error::{Error, Result};
use nix::sys::personality::{self, Persona};
use nix::sys::ptrace;
use nix::unistd::{execv, fork, ForkResult, Pid};
use std::ffi::CString;
use std::marker::PhantomData;

pub trait State {}

pub struct Template;
pub struct Installed;
impl State for Template {}
impl State for Installed {}

/// The tracee process, typestate-tagged so only an installed (traced, execed,
/// stopped-at-entry) child can be handed to [`crate::debugger::Debugger`].
pub struct Child<S: State> {
    program: CString,
    args: Vec<CString>,
    pid: Option<Pid>,
    _s: PhantomData<S>,
}

impl Child<Template> {
    pub fn new(program: &str, args: &[String]) -> Self {
        let program = CString::new(program).expect("program path contains NUL");
        let mut full_args = vec![program.clone()];
        full_args.extend(
            args.iter()
                .map(|a| CString::new(a.as_str()).expect("argument contains NUL")),
        );
        Self {
            program,
            args: full_args,
            pid: None,
            _s: PhantomData,
        }
    }

    /// Forks, disables ASLR for the child, puts it in trace-me mode, and
    /// execs the target. The kernel stops the child at the trace point
    /// immediately after `exec` completes; the parent must still call `wait`
    /// once to observe that stop.
    pub fn install(self) -> Result<Child<Installed>> {
        match unsafe { fork().map_err(Error::Ptrace)? } {
            ForkResult::Parent { child } => Ok(Child {
                program: self.program,
                args: self.args,
                pid: Some(child),
                _s: PhantomData,
            }),
            ForkResult::Child => {
                personality::set(Persona::ADDR_NO_RANDOMIZE)
                    .unwrap_or_else(|e| panic!("failed to disable ASLR: {e}"));
                ptrace::traceme().unwrap_or_else(|e| panic!("PTRACE_TRACEME failed: {e}"));
                execv(&self.program, &self.args).unwrap_or_else(|e| panic!("exec failed: {e}"));
                unreachable!("execv does not return on success")
            }
        }
    }
}

impl Child<Installed> {
    pub fn pid(&self) -> Pid {
        self.pid.expect("installed child always has a pid")
    }
}
