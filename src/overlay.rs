//! Visibility pipeline: display query, decision, window controller.
//!
//! Every entry point here runs on the main loop thread; the poller, screen
//! change events and settings listeners all funnel into these methods.

use std::time::Instant;
use tracing::{debug, info};

use crate::controller::{OverlaySurface, WindowController};
use crate::display::DisplayQuery;
use crate::geometry::Size;
use crate::visibility::should_hide;

#[derive(Debug)]
pub struct Overlay<D, S> {
    display: D,
    controller: WindowController<S>,
    enabled: bool,
}

impl<D: DisplayQuery, S: OverlaySurface> Overlay<D, S> {
    pub fn new(display: D, controller: WindowController<S>, enabled: bool) -> Self {
        Self {
            display,
            controller,
            enabled,
        }
    }

    /// Decide with fresh geometry and apply the result.
    /// Returns the decision (`true` = hide), or `None` if no screen was available.
    pub fn evaluate_and_apply(&mut self, now: Instant) -> Option<bool> {
        let Some(snapshot) = self.display.snapshot() else {
            debug!("no active screen, skipping visibility evaluation");
            return None;
        };
        let hide = should_hide(
            self.enabled,
            snapshot.full_frame,
            snapshot.usable_frame,
            snapshot.cursor,
        );
        self.controller.apply_visibility(hide, self.enabled, now);
        Some(hide)
    }

    /// Screen configuration changed: re-anchor, then re-decide
    pub fn handle_screen_change(&mut self, now: Instant) -> Option<bool> {
        match self.display.snapshot() {
            Some(snapshot) => {
                info!(
                    width = snapshot.full_frame.width(),
                    height = snapshot.full_frame.height(),
                    "screen configuration changed, repositioning"
                );
                self.controller.reposition(snapshot.full_frame);
            }
            None => debug!("no active screen, skipping reposition"),
        }
        self.evaluate_and_apply(now)
    }

    /// `clockEnabled` changed. Disabling hides at once; enabling starts from
    /// transparent and lets the decision pick the real target.
    pub fn set_clock_enabled(&mut self, enabled: bool, now: Instant) {
        info!(enabled, "clock enabled setting changed");
        self.enabled = enabled;
        if enabled {
            self.controller.force_transparent();
            self.evaluate_and_apply(now);
        } else {
            self.controller.apply_visibility(true, false, now);
        }
    }

    /// Content reported a new natural size
    pub fn resize_to_fit(&mut self, size: Size) -> bool {
        let full_frame = self.display.snapshot().map(|s| s.full_frame);
        self.controller.resize_to_fit(size, full_frame)
    }

    pub fn tick_animation(&mut self, now: Instant) -> bool {
        self.controller.tick(now)
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_animating(&self) -> bool {
        self.controller.is_animating()
    }

    pub fn controller(&self) -> &WindowController<S> {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::constants::{alpha, timing};
    use crate::controller::tests::RecordingSurface;
    use crate::display::DisplaySnapshot;
    use crate::geometry::{Point, Rect};

    const FULL: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

    /// Display whose snapshot the test can change between polls
    #[derive(Clone, Default)]
    struct ScriptedDisplay {
        current: Rc<Cell<Option<DisplaySnapshot>>>,
    }

    impl ScriptedDisplay {
        fn set(&self, usable_height: f64, cursor: Point) {
            self.current.set(Some(DisplaySnapshot {
                full_frame: FULL,
                usable_frame: Rect::new(0.0, 0.0, 1920.0, usable_height),
                cursor,
            }));
        }

        fn set_frame(&self, full_frame: Rect) {
            self.current.set(Some(DisplaySnapshot {
                full_frame,
                usable_frame: full_frame,
                cursor: Point::new(full_frame.left(), full_frame.bottom()),
            }));
        }

        fn clear(&self) {
            self.current.set(None);
        }
    }

    impl DisplayQuery for ScriptedDisplay {
        fn snapshot(&self) -> Option<DisplaySnapshot> {
            self.current.get()
        }
    }

    fn overlay(enabled: bool) -> (ScriptedDisplay, Overlay<ScriptedDisplay, RecordingSurface>) {
        let display = ScriptedDisplay::default();
        let controller =
            WindowController::new(RecordingSurface::default(), Size::new(200.0, 24.0));
        (display.clone(), Overlay::new(display, controller, enabled))
    }

    fn settle(overlay: &mut Overlay<ScriptedDisplay, RecordingSurface>, now: Instant) -> Instant {
        let done = now + timing::FADE_DURATION;
        overlay.tick_animation(done);
        done
    }

    #[test]
    fn test_shown_then_menu_bar_hides() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();

        display.set(1080.0, Point::new(960.0, 500.0));
        assert_eq!(overlay.evaluate_and_apply(now), Some(false));
        let now = settle(&mut overlay, now);
        assert_eq!(overlay.controller().alpha(), alpha::SHOWN);

        display.set(1055.0, Point::new(960.0, 1079.0));
        assert_eq!(overlay.evaluate_and_apply(now), Some(true));
        settle(&mut overlay, now);
        assert_eq!(overlay.controller().alpha(), alpha::HIDDEN);
    }

    #[test]
    fn test_cursor_near_top_hides() {
        let (display, mut overlay) = overlay(true);
        display.set(1080.0, Point::new(960.0, 1078.0));
        assert_eq!(overlay.evaluate_and_apply(Instant::now()), Some(true));
    }

    #[test]
    fn test_polls_with_same_result_start_one_transition() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));

        for i in 0..8 {
            overlay.evaluate_and_apply(now + timing::POLL_INTERVAL * i);
        }
        assert_eq!(overlay.controller().surface().raises(), 1);
    }

    #[test]
    fn test_missing_screen_skips_tick() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));
        overlay.evaluate_and_apply(now);
        let now = settle(&mut overlay, now);

        display.clear();
        let calls = overlay.controller().surface().calls.len();
        assert_eq!(overlay.evaluate_and_apply(now), None);
        assert_eq!(overlay.handle_screen_change(now), None);
        assert_eq!(overlay.controller().surface().calls.len(), calls);
        assert_eq!(overlay.controller().alpha(), alpha::SHOWN);
        assert_eq!(overlay.controller().last_decision(), Some(false));
    }

    #[test]
    fn test_screen_change_repositions_then_evaluates() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        let external = Rect::new(0.0, 0.0, 2560.0, 1440.0);
        display.set_frame(external);

        assert_eq!(overlay.handle_screen_change(now), Some(false));
        let surface = overlay.controller().surface();
        assert_eq!(
            surface.frames(),
            vec![Rect::new(2360.0, 1416.0, 200.0, 24.0)]
        );
        // Once for reposition, once for the fade in
        assert_eq!(surface.raises(), 2);
    }

    #[test]
    fn test_disable_hides_immediately() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));
        overlay.evaluate_and_apply(now);
        let now = settle(&mut overlay, now);

        overlay.set_clock_enabled(false, now);
        assert!(!overlay.is_enabled());
        assert!(!overlay.is_animating());
        assert_eq!(overlay.controller().alpha(), alpha::HIDDEN);

        // Polls while disabled keep it hidden without animating
        overlay.evaluate_and_apply(now + timing::POLL_INTERVAL);
        assert!(!overlay.is_animating());
        assert_eq!(overlay.controller().alpha(), alpha::HIDDEN);
    }

    #[test]
    fn test_enable_forces_transparent_then_fades_in() {
        let (display, mut overlay) = overlay(false);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));
        overlay.evaluate_and_apply(now);
        assert_eq!(overlay.controller().alpha(), alpha::HIDDEN);

        overlay.set_clock_enabled(true, now);
        assert!(overlay.is_animating());
        assert_eq!(overlay.controller().alpha(), alpha::HIDDEN);
        settle(&mut overlay, now);
        assert_eq!(overlay.controller().alpha(), alpha::SHOWN);
    }

    #[test]
    fn test_enable_while_menu_bar_present_stays_hidden() {
        let (display, mut overlay) = overlay(false);
        let now = Instant::now();
        display.set(1050.0, Point::new(960.0, 500.0));

        overlay.set_clock_enabled(true, now);
        assert!(!overlay.is_animating());
        assert_eq!(overlay.controller().alpha(), alpha::HIDDEN);
        assert_eq!(overlay.controller().last_decision(), Some(true));
    }

    #[test]
    fn test_reenable_after_disable_shows_again() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));
        overlay.evaluate_and_apply(now);
        let now = settle(&mut overlay, now);

        overlay.set_clock_enabled(false, now);
        overlay.set_clock_enabled(true, now + Duration::from_millis(10));
        settle(&mut overlay, now + Duration::from_millis(10));
        assert_eq!(overlay.controller().alpha(), alpha::SHOWN);
        assert_eq!(overlay.controller().last_decision(), Some(false));
    }

    #[test]
    fn test_resize_scenario() {
        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));
        overlay.handle_screen_change(now);
        let frames = overlay.controller().surface().frames().len();

        assert!(!overlay.resize_to_fit(Size::new(200.5, 24.5)));
        assert_eq!(overlay.controller().surface().frames().len(), frames);

        assert!(overlay.resize_to_fit(Size::new(202.0, 26.0)));
        assert_eq!(overlay.controller().origin(), Point::new(1718.0, 1054.0));
        assert_eq!(overlay.controller().surface().frames().len(), frames + 1);
    }

    #[test]
    fn test_background_toggle_leaves_visibility_alone() {
        use crate::clock_face::compose;
        use crate::controller::tests::SurfaceCall;
        use crate::font::RenderedText;

        let (display, mut overlay) = overlay(true);
        let now = Instant::now();
        display.set(1080.0, Point::new(960.0, 500.0));
        overlay.handle_screen_change(now);
        settle(&mut overlay, now);
        let before = overlay.controller().surface().calls.len();

        let text = RenderedText {
            width: 196,
            height: 20,
            data: vec![0xFFFFFFFF; 196 * 20],
        };
        for background in [Some(0xCC000000), None, Some(0xCC000000)] {
            let face = compose(&text, 2, background);
            overlay.resize_to_fit(face.size());
        }

        let added = &overlay.controller().surface().calls[before..];
        assert!(added
            .iter()
            .all(|c| !matches!(c, SurfaceCall::Alpha(_) | SurfaceCall::Raise)));
        assert_eq!(overlay.controller().last_decision(), Some(false));
        assert_eq!(overlay.controller().alpha(), alpha::SHOWN);
        assert!(!overlay.is_animating());
    }
}
