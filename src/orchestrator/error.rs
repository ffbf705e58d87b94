use std::fmt;

/// Errors a frame render can fail with. Everything else (a submission
/// queue saturating, a single tile job panicking) is handled inside
/// [`super::Orchestrator::render_frame`] by logging and dropping the
/// affected work rather than surfacing an error — only a caller-driven
/// interruption is reported up.
#[derive(Debug)]
pub enum RenderError {
    /// The caller's pump callback returned `false` mid-frame (e.g. the
    /// window received a close request) while jobs were still in flight.
    /// The orchestrator waits for already-submitted jobs to finish before
    /// returning this, but does not composite the (possibly partial)
    /// frame into the output buffer.
    Interrupted,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Interrupted => write!(f, "frame render interrupted by caller"),
        }
    }
}
impl std::error::Error for RenderError {}
