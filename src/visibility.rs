//! Visibility decision: should the clock be hidden right now?
//!
//! Pure function of its inputs. It keeps no memory of earlier decisions;
//! suppressing redundant transitions is the window controller's job.

use crate::constants::visibility::{MENU_BAR_GAP_TOLERANCE, REVEAL_STRIP_HEIGHT};
use crate::geometry::{Point, Rect};

/// Returns `true` when the clock must be hidden.
///
/// Checks run in priority order:
/// 1. the user disabled the clock
/// 2. the menu bar occupies the top of the screen (gap above tolerance)
/// 3. the cursor sits in the reveal strip along the top edge
pub fn should_hide(enabled: bool, full_frame: Rect, usable_frame: Rect, cursor: Point) -> bool {
    if !enabled {
        return true;
    }
    if menu_bar_gap(full_frame, usable_frame) > MENU_BAR_GAP_TOLERANCE {
        return true;
    }
    cursor_in_reveal_strip(full_frame, cursor)
}

/// Vertical inset between the full frame top and the usable frame top
pub fn menu_bar_gap(full_frame: Rect, usable_frame: Rect) -> f64 {
    full_frame.top() - usable_frame.top()
}

/// Strict on Y (a cursor exactly `REVEAL_STRIP_HEIGHT` below the top is outside),
/// inclusive on both horizontal edges.
pub fn cursor_in_reveal_strip(full_frame: Rect, cursor: Point) -> bool {
    cursor.y > full_frame.top() - REVEAL_STRIP_HEIGHT
        && full_frame.left() <= cursor.x
        && cursor.x <= full_frame.right()
}
