use crate::common::launch;
use mdbg::debugger::StopReason;
use serial_test::serial;

/// S4 — step-over a call: stopping at the call-site line and issuing a
/// step-over lands on the next line in the caller, with the breakpoint
/// table left exactly as it was (property 8).
#[test]
#[serial]
fn step_over_skips_the_call() {
    let mut dbg = launch("calc");

    let call_site = dbg.dwarf().source_line("calc.rs", 2).unwrap();
    dbg.set_breakpoint(call_site, false).unwrap();
    dbg.continue_execution().unwrap();
    assert_eq!(dbg.place_at_pc().unwrap().line_number, 2);

    let table_before = {
        let mut v = dbg.breakpoint_addresses();
        v.sort();
        v
    };

    match dbg.step_over().unwrap() {
        StopReason::SingleStep | StopReason::Breakpoint(_) => {}
        other => panic!("expected the stepped-over stop, got {other:?}"),
    }

    let place = dbg.place_at_pc().unwrap();
    assert_eq!(place.line_number, 3);
    let func = dbg.dwarf().function_from_pc(dbg.current_pc().unwrap()).unwrap();
    assert_eq!(func.name, "main");

    let table_after = {
        let mut v = dbg.breakpoint_addresses();
        v.sort();
        v
    };
    assert_eq!(table_before, table_after);
}

/// S5 — step-out: stopping inside the callee and issuing a step-out returns
/// control to the caller.
#[test]
#[serial]
fn step_out_returns_to_caller() {
    let mut dbg = launch("calc");

    dbg.set_breakpoint_at_function("sum2").unwrap();
    dbg.continue_execution().unwrap();
    let inside = dbg.dwarf().function_from_pc(dbg.current_pc().unwrap()).unwrap();
    assert_eq!(inside.name, "sum2");

    dbg.step_out().unwrap();
    let back = dbg.dwarf().function_from_pc(dbg.current_pc().unwrap()).unwrap();
    assert_eq!(back.name, "sum3");
}

/// Step-in (property 7): each step lands on a new source line, entering the
/// called function rather than skipping over it.
#[test]
#[serial]
fn step_in_enters_calls() {
    let mut dbg = launch("calc");

    let entry = dbg.dwarf().source_line("calc.rs", 2).unwrap();
    dbg.set_breakpoint(entry, false).unwrap();
    dbg.continue_execution().unwrap();
    let start_line = dbg.place_at_pc().unwrap().line_number;

    dbg.step_in().unwrap();
    let after = dbg.dwarf().function_from_pc(dbg.current_pc().unwrap());
    // Either we advanced to a different line, or we crossed into sum3 (a
    // different compilation-unit-local function) whose first line differs.
    match after {
        Ok(func) => assert_eq!(func.name, "sum3"),
        Err(_) => {
            let place = dbg.place_at_pc().unwrap();
            assert_ne!(place.line_number, start_line);
        }
    }
}

/// step_instruction is the raw single-instruction primitive: it always
/// leaves the tracee stopped via a single-step trap.
#[test]
#[serial]
fn step_instruction_is_a_single_step() {
    let mut dbg = launch("hello");
    let pc_before = dbg.current_pc().unwrap();
    let reason = dbg.step_instruction().unwrap();
    assert!(matches!(reason, StopReason::SingleStep));
    assert_ne!(dbg.current_pc().unwrap(), pc_before);
}
