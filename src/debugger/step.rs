use crate::debugger::address::GlobalAddress;
use crate::debugger::error::Result;
use crate::debugger::{Debugger, StopReason};

/// Step one source line forward, entering any function calls it makes.
pub(super) fn step_in(dbg: &mut Debugger) -> Result<StopReason> {
    let start_line = dbg.dwarf.line_from_pc(dbg.current_pc()?).ok().map(|p| p.line_number);

    loop {
        let reason = dbg.single_step_instruction()?;
        if !matches!(reason, StopReason::SingleStep) {
            return Ok(reason);
        }

        let pc = dbg.current_pc()?;
        match dbg.dwarf.line_from_pc(pc) {
            Ok(place) => {
                if Some(place.line_number) != start_line {
                    println!("{}:{}", place.file.display(), place.line_number);
                    return Ok(StopReason::SingleStep);
                }
            }
            Err(_) => {
                // No source info at this address: treat the single step
                // already taken as the whole operation.
                return Ok(StopReason::SingleStep);
            }
        }
    }
}

/// Run to the caller's next line, installing a temporary breakpoint at the
/// return address and removing it afterward.
pub(super) fn step_out(dbg: &mut Debugger) -> Result<StopReason> {
    let ret_addr = dbg.return_address()?;
    let already_set = dbg.breakpoints.contains_key(&ret_addr);
    if !already_set {
        dbg.set_breakpoint(ret_addr, false)?;
    }

    let reason = dbg.continue_execution()?;

    if !already_set {
        dbg.remove_breakpoint(ret_addr, false)?;
    }

    Ok(reason)
}

/// Run to the next line in the current function without entering calls it
/// makes, by seeding a temporary breakpoint at every other line-table
/// address in the function plus the return address.
pub(super) fn step_over(dbg: &mut Debugger) -> Result<StopReason> {
    let pc = dbg.current_pc()?;
    let current_line_addr = dbg
        .dwarf
        .line_from_pc(pc)
        .map(|p| p.address)
        .unwrap_or(pc);

    let func = dbg.dwarf.function_from_pc(pc)?;
    let low = dbg.dwarf.func_entry(&func);
    let high = dbg.dwarf.func_end(&func);
    let candidates: Vec<GlobalAddress> = dbg.dwarf.lines_in_range(low, high);

    let mut installed = Vec::new();
    for addr in candidates {
        if addr == current_line_addr {
            continue;
        }
        if !dbg.breakpoints.contains_key(&addr) {
            dbg.set_breakpoint(addr, false)?;
            installed.push(addr);
        }
    }

    let ret_addr = dbg.return_address()?;
    if !dbg.breakpoints.contains_key(&ret_addr) {
        dbg.set_breakpoint(ret_addr, false)?;
        installed.push(ret_addr);
    }

    let reason = dbg.continue_execution()?;

    for addr in installed {
        dbg.remove_breakpoint(addr, false)?;
    }

    Ok(reason)
}
