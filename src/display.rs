//! Display query seam: main screen frames and cursor position, read at call time.

use crate::geometry::{Point, Rect};

/// One reading of the main screen. Never cached across polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySnapshot {
    /// Whole screen, including any menu bar strip
    pub full_frame: Rect,
    /// Area available for normal windows (menu bar and docks excluded)
    pub usable_frame: Rect,
    /// Global cursor position
    pub cursor: Point,
}

pub trait DisplayQuery {
    /// Read the main screen and cursor. `None` when no screen can be queried;
    /// callers skip the tick and retry on the next one.
    fn snapshot(&self) -> Option<DisplaySnapshot>;
}
