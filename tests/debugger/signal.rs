use crate::common::launch;
use mdbg::debugger::StopReason;
use serial_test::serial;

/// S6 — segfault diagnostic: a null-pointer dereference is classified as
/// `Segfault`, not folded into the generic "process finished" bucket.
#[test]
#[serial]
fn segfault_is_classified_distinctly() {
    let mut dbg = launch("segfault");
    match dbg.continue_execution().unwrap() {
        StopReason::Segfault => {}
        other => panic!("expected Segfault, got {other:?}"),
    }
}

/// A tracee that runs to completion without incident reports `Exited` with
/// its real exit status.
#[test]
#[serial]
fn normal_exit_reports_status() {
    let mut dbg = launch("retcode");
    match dbg.continue_execution().unwrap() {
        StopReason::Exited(code) => assert_eq!(code, 1),
        other => panic!("expected Exited(1), got {other:?}"),
    }
}

/// wait_for_signal's breakpoint/single-step classification keys off
/// `si_code`, not just the signal number: a plain SIGTRAP from a breakpoint
/// still carries the fixed-up PC it reports.
#[test]
#[serial]
fn breakpoint_trap_fixes_up_pc() {
    let mut dbg = launch("hello");
    let target = dbg.dwarf().source_line("hello.rs", 2).unwrap();
    dbg.set_breakpoint(target, false).unwrap();

    match dbg.continue_execution().unwrap() {
        StopReason::Breakpoint(_) => {
            assert_eq!(dbg.current_pc().unwrap(), target);
        }
        other => panic!("expected Breakpoint, got {other:?}"),
    }
}
