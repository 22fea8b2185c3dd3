use std::path::PathBuf;

/// Operator-adjustable constants. No file-based format; these are the
/// handful of knobs the core actually needs.
pub struct Config {
    /// Rustyline history file.
    pub history_path: PathBuf,
    /// Lines of source context printed around a stop (one side); the
    /// original debugger this one descends from defaults to 2.
    pub source_context_lines: u64,
}

impl Default for Config {
    fn default() -> Self {
        let history_path = home::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mdbg_history");
        Self {
            history_path,
            source_context_lines: 2,
        }
    }
}
