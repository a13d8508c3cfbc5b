//! Window controller: owns the overlay's opacity, frame and stacking.
//!
//! Nothing else writes those three properties. Surface errors are logged and
//! swallowed here; a failed opacity write must never take the process down.

use anyhow::Result;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::animation::Fade;
use crate::constants::{alpha, timing, visibility};
use crate::geometry::{Point, Rect, Size};

/// The platform window the controller drives
pub trait OverlaySurface {
    /// Set window opacity, 0.0 (invisible) to 1.0 (opaque)
    fn set_alpha(&mut self, alpha: f64) -> Result<()>;

    /// Move and resize the window. `frame` is in Y-up screen space.
    fn set_frame(&mut self, frame: Rect) -> Result<()>;

    /// Bring the window to the front of the stacking order
    fn raise(&mut self) -> Result<()>;
}

#[derive(Debug)]
pub struct WindowController<S> {
    surface: S,
    alpha: f64,
    size: Size,
    origin: Point,
    /// Last applied decision (`true` = hidden). `None` until the first one.
    last_decision: Option<bool>,
    fade: Option<Fade>,
}

impl<S: OverlaySurface> WindowController<S> {
    /// The surface is expected to start fully transparent
    pub fn new(surface: S, size: Size) -> Self {
        Self {
            surface,
            alpha: alpha::HIDDEN,
            size,
            origin: Point::default(),
            last_decision: None,
            fade: None,
        }
    }

    /// Apply a visibility decision.
    ///
    /// Disabled: opacity drops to zero at once, no fade. Enabled: fades only
    /// when `hide` differs from the last applied decision, raising the window
    /// after starting a fade in.
    pub fn apply_visibility(&mut self, hide: bool, currently_enabled: bool, now: Instant) {
        if !currently_enabled {
            self.set_alpha_immediately(alpha::HIDDEN);
            self.last_decision = Some(true);
            return;
        }

        if self.last_decision == Some(hide) {
            debug!(hide, "visibility unchanged, skipping transition");
            return;
        }

        let target = if hide { alpha::HIDDEN } else { alpha::SHOWN };
        info!(hide, from = self.alpha, to = target, "starting visibility transition");
        self.fade = Some(Fade::new(self.alpha, target, now, timing::FADE_DURATION));

        if !hide {
            log_surface_result(self.surface.raise(), "raise overlay");
        }
        self.last_decision = Some(hide);
    }

    /// Drop opacity to zero without animation and record the window as hidden
    pub fn force_transparent(&mut self) {
        self.set_alpha_immediately(alpha::HIDDEN);
        self.last_decision = Some(true);
    }

    /// Anchor the window to the top-right corner of `full_frame`
    pub fn reposition(&mut self, full_frame: Rect) {
        self.origin = Point::new(
            full_frame.right() - self.size.width,
            full_frame.top() - self.size.height,
        );
        debug!(x = self.origin.x, y = self.origin.y, "repositioning overlay");
        log_surface_result(self.surface.set_frame(self.frame()), "move overlay");
        log_surface_result(self.surface.raise(), "raise overlay");
    }

    /// Resize to the content's natural size. Deltas of one unit or less in both
    /// dimensions are ignored. Returns whether a resize happened.
    ///
    /// Without a screen frame the current top-right corner is kept in place.
    pub fn resize_to_fit(&mut self, new_size: Size, full_frame: Option<Rect>) -> bool {
        if !new_size.differs_from(self.size, visibility::RESIZE_TOLERANCE) {
            debug!(
                width = new_size.width,
                height = new_size.height,
                "ignoring sub-unit resize"
            );
            return false;
        }

        let old = self.size;
        self.size = new_size;
        match full_frame {
            Some(frame) => self.reposition(frame),
            None => {
                self.origin.x += old.width - new_size.width;
                self.origin.y += old.height - new_size.height;
                log_surface_result(self.surface.set_frame(self.frame()), "resize overlay");
            }
        }
        true
    }

    /// Advance a running fade. Returns whether a fade is still in progress.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(fade) = self.fade else {
            return false;
        };
        self.write_alpha(fade.sample(now));
        if fade.is_finished(now) {
            self.fade = None;
            return false;
        }
        true
    }

    pub fn is_animating(&self) -> bool {
        self.fade.is_some()
    }

    #[cfg(test)]
    pub fn pending_fade(&self) -> Option<Fade> {
        self.fade
    }

    #[cfg(test)]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[cfg(test)]
    pub fn size(&self) -> Size {
        self.size
    }

    #[cfg(test)]
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn frame(&self) -> Rect {
        Rect::from_parts(self.origin, self.size)
    }

    #[cfg(test)]
    pub fn last_decision(&self) -> Option<bool> {
        self.last_decision
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn set_alpha_immediately(&mut self, value: f64) {
        let interrupted = self.fade.take().is_some();
        if interrupted || self.alpha != value {
            self.write_alpha(value);
        }
    }

    fn write_alpha(&mut self, value: f64) {
        self.alpha = value;
        log_surface_result(self.surface.set_alpha(value), "set overlay opacity");
    }
}

fn log_surface_result(result: Result<()>, action: &str) {
    if let Err(e) = result {
        warn!(error = ?e, "Failed to {action}");
    }
}
