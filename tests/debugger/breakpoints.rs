use crate::common::launch;
use mdbg::debugger::dwarf::symbol::SymbolKind;
use mdbg::debugger::StopReason;
use serial_test::serial;

/// S1 — hit and resume: breakpoint on a statement line stops there, and the
/// place resolved from PC matches the address `source_line` resolves for
/// that same line (property 6, line/address round trip).
#[test]
#[serial]
fn hit_and_resume() {
    let mut dbg = launch("hello");

    let target = dbg.dwarf().source_line("hello.rs", 3).unwrap();
    dbg.set_breakpoint(target, true).unwrap();

    match dbg.continue_execution().unwrap() {
        StopReason::Breakpoint(_) => {}
        other => panic!("expected a breakpoint stop, got {other:?}"),
    }
    let place = dbg.place_at_pc().unwrap();
    assert_eq!(place.line_number, 3);
    assert_eq!(dbg.current_pc().unwrap(), target);

    match dbg.continue_execution().unwrap() {
        StopReason::Exited(code) => assert_eq!(code, 0),
        other => panic!("expected the process to finish, got {other:?}"),
    }
}

/// S2 — memory poke: a global can be overwritten through `write_memory`
/// while the tracee is stopped, and the new value reads back.
#[test]
#[serial]
fn memory_write_round_trips() {
    let mut dbg = launch("globals");

    dbg.set_breakpoint_at_function("main").unwrap();
    dbg.continue_execution().unwrap();

    // Symbol-table names are demangled to their full crate path ("globals::X"),
    // unlike the bare identifier DWARF would store for a DIE.
    let x = dbg
        .dwarf()
        .lookup_symbol("globals::X")
        .into_iter()
        .find(|s| s.kind == SymbolKind::Object)
        .expect("global X present in the symbol table")
        .addr;

    let before = dbg.read_memory(x).unwrap() & 0xff;
    assert_eq!(before, 7);

    dbg.write_memory(x, 0x2a).unwrap();
    let after = dbg.read_memory(x).unwrap() & 0xff;
    assert_eq!(after, 0x2a);
}

/// S3 — register override changes the tracee's exit status. Breaking at the
/// entry of `std::process::exit` puts the exit code in `rdi` (the first
/// SysV argument register) for us to overwrite before it takes effect.
#[test]
#[serial]
fn register_write_changes_exit_code() {
    let mut dbg = launch("retcode");

    let exit_fn = dbg
        .dwarf()
        .lookup_symbol("std::process::exit")
        .into_iter()
        .find(|s| s.kind == SymbolKind::Function)
        .expect("std::process::exit present in the symbol table")
        .addr;
    dbg.set_breakpoint(exit_fn, false).unwrap();

    match dbg.continue_execution().unwrap() {
        StopReason::Breakpoint(_) => {}
        other => panic!("expected to stop at process::exit, got {other:?}"),
    }

    dbg.write_register(mdbg::debugger::register::Register::Rdi, 0x63)
        .unwrap();

    match dbg.continue_execution().unwrap() {
        StopReason::Exited(code) => assert_eq!(code, 0x63),
        other => panic!("expected the process to exit 0x63, got {other:?}"),
    }
}

/// Breakpoint table bijection (property 3) plus enable/disable idempotence
/// (property 2): the table only ever holds what was explicitly requested,
/// and repeated enable/disable calls are no-ops.
#[test]
#[serial]
fn breakpoint_table_tracks_only_user_breakpoints() {
    let mut dbg = launch("hello");

    let a = dbg.dwarf().source_line("hello.rs", 2).unwrap();
    let b = dbg.dwarf().source_line("hello.rs", 3).unwrap();

    dbg.set_breakpoint(a, false).unwrap();
    dbg.set_breakpoint(b, false).unwrap();
    assert_eq!(dbg.breakpoint_addresses().len(), 2);

    // Idempotence: re-enabling an already-enabled breakpoint at the same key
    // is a no-op on the table shape.
    dbg.set_breakpoint(a, false).unwrap();
    assert_eq!(dbg.breakpoint_addresses().len(), 2);

    dbg.disable_breakpoint(a, false).unwrap();
    dbg.disable_breakpoint(a, false).unwrap();
    assert_eq!(dbg.breakpoint_addresses().len(), 2);

    dbg.remove_breakpoint(a, false).unwrap();
    assert_eq!(dbg.breakpoint_addresses(), vec![b]);
}

/// set_breakpoint_at_line resolves through the DWARF context and an unknown
/// line surfaces `NotFound` to the caller rather than panicking.
#[test]
#[serial]
fn set_breakpoint_at_unknown_line_fails() {
    let mut dbg = launch("hello");
    assert!(dbg.set_breakpoint_at_line("hello.rs", 9999).is_err());
    assert!(dbg.breakpoint_addresses().is_empty());
}
