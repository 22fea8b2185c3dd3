/// Transforms a `Result` into an `Option`, logging the error at `warn` if
/// it occurs. Used at the few points a lookup failure is meant to be
/// swallowed rather than surfaced (e.g. missing source info while printing
/// a stop location).
#[macro_export]
macro_rules! weak_error {
    ($res:expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!(target: "debugger", "{e:#}");
                None
            }
        }
    };
}
