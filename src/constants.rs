//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Visibility decision thresholds (screen units, Y-up)
pub mod visibility {
    /// Largest inset between full frame top and usable frame top that still
    /// counts as "no menu bar". Real bars are 24-30 units tall.
    pub const MENU_BAR_GAP_TOLERANCE: f64 = 22.0;

    /// Height of the strip at the top of the screen where the cursor hides the clock
    pub const REVEAL_STRIP_HEIGHT: f64 = 5.0;

    /// Size deltas at or below this are layout jitter and never trigger a resize
    pub const RESIZE_TOLERANCE: f64 = 1.0;
}

/// Opacity values for the two presentation states
pub mod alpha {
    pub const SHOWN: f64 = 1.0;
    pub const HIDDEN: f64 = 0.0;
}

/// Polling and animation timing
pub mod timing {
    use std::time::Duration;

    /// Visibility poll interval
    pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

    /// Duration of the animated fade between shown and hidden
    pub const FADE_DURATION: Duration = Duration::from_millis(300);

    /// Opacity update rate while a fade is running (~60 Hz)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

    /// Clock text refresh interval
    pub const CLOCK_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

    /// Upper bound on a single main loop wait, so shutdown signals are noticed
    pub const MAX_LOOP_WAIT: Duration = Duration::from_millis(500);
}

/// X11 protocol constants
pub mod x11 {
    /// ARGB color depth (32-bit: 8 bits each for Alpha, Red, Green, Blue)
    pub const ARGB_DEPTH: u8 = 32;

    /// Override redirect flag for unmanaged windows
    pub const OVERRIDE_REDIRECT: u32 = 1;

    /// _NET_WM_WINDOW_OPACITY value for a fully opaque window
    pub const OPACITY_OPAQUE: u32 = 0xFFFF_FFFF;

    /// Values per desktop in _NET_WORKAREA (x, y, width, height)
    pub const WORKAREA_FIELDS: u32 = 4;

    /// WM_CLASS instance and class, NUL separated
    pub const WM_CLASS: &[u8] = b"corner-clock\0corner-clock\0";
}

/// Config file location
pub mod config {
    /// Directory under the XDG config dir
    pub const APP_DIR: &str = "corner-clock";

    /// Config file name
    pub const FILENAME: &str = "config.json";
}

/// Environment variable names
pub mod env {
    /// Log verbosity (trace, debug, info, warn, error)
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Overrides appearance.time_format
    pub const TIME_FORMAT: &str = "CORNER_CLOCK_FORMAT";

    /// Overrides appearance.text_size
    pub const TEXT_SIZE: &str = "CORNER_CLOCK_TEXT_SIZE";
}

/// Appearance defaults and validation ranges
pub mod appearance {
    pub const DEFAULT_TIME_FORMAT: &str = "%a %-d %b %H:%M";
    pub const DEFAULT_FONT: &str = "Sans Bold";
    pub const DEFAULT_TEXT_SIZE: f32 = 14.0;
    pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFFFF";
    pub const DEFAULT_BACKGROUND_COLOR: &str = "#B0202020";
    pub const DEFAULT_PADDING: u16 = 6;

    pub const MIN_TEXT_SIZE: f32 = 6.0;
    pub const MAX_TEXT_SIZE: f32 = 96.0;
    pub const MAX_PADDING: u16 = 64;
}

/// Status notifier item
pub mod tray {
    pub const ID: &str = "corner-clock";
    pub const TITLE: &str = "Corner Clock";
    pub const ICON_NAME: &str = "preferences-system-time";
}
