use mdbg::debugger::process::Child;
use mdbg::debugger::Debugger;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Compiles a `demos/<name>.rs` fixture with `rustc -g` and returns the path
/// to the resulting binary, rebuilding only when the source is newer than
/// the cached output.
pub fn compiled_demo(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let src = manifest_dir.join("demos").join(format!("{name}.rs"));
    let out_dir = manifest_dir.join("target").join("debug").join("demos");
    std::fs::create_dir_all(&out_dir).expect("create demo output directory");
    let bin = out_dir.join(name);

    let stale = match (bin.metadata(), src.metadata()) {
        (Ok(bin_meta), Ok(src_meta)) => match (bin_meta.modified(), src_meta.modified()) {
            (Ok(bin_time), Ok(src_time)) => bin_time < src_time,
            _ => true,
        },
        _ => true,
    };

    if stale {
        let status = Command::new("rustc")
            .arg("-g")
            .arg("-C")
            .arg("opt-level=0")
            .arg("-o")
            .arg(&bin)
            .arg(&src)
            .status()
            .unwrap_or_else(|e| panic!("failed to invoke rustc for {name}: {e}"));
        assert!(status.success(), "rustc failed compiling demos/{name}.rs");
    }

    bin
}

/// Launches a demo fixture under trace and runs it to its initial stop, the
/// same sequence `main` performs before handing control to the REPL.
pub fn launch(name: &str) -> Debugger {
    let program = compiled_demo(name);
    let installed = Child::new(&program.to_string_lossy(), &[])
        .install()
        .unwrap_or_else(|e| panic!("failed to launch {name}: {e}"));
    let mut debugger = Debugger::new(&program, installed)
        .unwrap_or_else(|e| panic!("failed to load debug information for {name}: {e}"));
    debugger
        .wait_for_signal()
        .unwrap_or_else(|e| panic!("failed to observe initial stop for {name}: {e}"));
    debugger
}
