//! The running overlay: visibility pipeline plus clock face on one X11 window

use anyhow::{Context, Result};
use chrono::Local;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use crate::clock_face::ClockFace;
use crate::controller::WindowController;
use crate::overlay::Overlay;
use crate::overlay_window::OverlayWindow;
use crate::settings::{SettingKey, SettingsStore, Subscription};
use crate::x11_utils::{watch_screen_changes, CachedAtoms, X11Display};

pub struct App {
    overlay: Overlay<X11Display, OverlayWindow>,
    face: ClockFace,
    atoms: CachedAtoms,
    root: Window,
}

impl App {
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, settings: &SettingsStore) -> Result<Self> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .context(format!("X11 screen {} does not exist", screen_num))?
            .clone();
        info!(
            screen = screen_num,
            width = screen.width_in_pixels,
            height = screen.height_in_pixels,
            "Using X11 screen"
        );

        // Pre-cache atoms once at startup
        let atoms = CachedAtoms::new(&conn)?;
        let randr = watch_screen_changes(&conn, screen.root)?;

        let config = settings.display_config();
        info!(config = ?config, "Appearance");
        let mut face = ClockFace::new(config, settings.get(SettingKey::ShowBackground))?;
        face.update_text(&Local::now())?;

        let window = OverlayWindow::new(Arc::clone(&conn), &screen, atoms, face.natural_size())?;
        let controller = WindowController::new(window, face.natural_size());
        let display = X11Display::new(conn, screen.root, atoms, randr);
        let overlay = Overlay::new(display, controller, settings.get(SettingKey::ClockEnabled));

        Ok(Self {
            overlay,
            face,
            atoms,
            root: screen.root,
        })
    }

    /// Anchor, draw and run the first decision
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.overlay.handle_screen_change(now);
        self.redraw()
    }

    pub fn root(&self) -> Window {
        self.root
    }

    pub fn atoms(&self) -> &CachedAtoms {
        &self.atoms
    }

    pub fn evaluate_and_apply(&mut self, now: Instant) -> Option<bool> {
        self.overlay.evaluate_and_apply(now)
    }

    pub fn handle_screen_change(&mut self, now: Instant) -> Option<bool> {
        self.overlay.handle_screen_change(now)
    }

    pub fn set_clock_enabled(&mut self, enabled: bool, now: Instant) {
        self.overlay.set_clock_enabled(enabled, now);
    }

    pub fn set_show_background(&mut self, show: bool) -> Result<()> {
        if self.face.set_show_background(show) {
            self.apply_face()?;
        }
        Ok(())
    }

    /// Re-render if the clock text changed
    pub fn refresh_clock(&mut self) -> Result<()> {
        if self.face.update_text(&Local::now())? {
            self.apply_face()?;
        }
        Ok(())
    }

    pub fn redraw(&self) -> Result<()> {
        self.overlay.controller().surface().present(self.face.image())
    }

    pub fn tick_animation(&mut self, now: Instant) -> bool {
        self.overlay.tick_animation(now)
    }

    pub fn is_animating(&self) -> bool {
        self.overlay.is_animating()
    }

    fn apply_face(&mut self) -> Result<()> {
        self.overlay.resize_to_fit(self.face.natural_size());
        self.redraw()
    }
}

/// Route settings changes into the app. Listeners hold a weak reference so the
/// subscriptions never keep the window alive.
pub fn subscribe_settings(app: &Rc<RefCell<App>>, settings: &SettingsStore) -> Vec<Subscription> {
    let enabled_target: Weak<RefCell<App>> = Rc::downgrade(app);
    let background_target: Weak<RefCell<App>> = Rc::downgrade(app);

    vec![
        settings.subscribe(SettingKey::ClockEnabled, move |enabled| {
            with_app(&enabled_target, |app| {
                app.set_clock_enabled(enabled, Instant::now());
                Ok(())
            });
        }),
        settings.subscribe(SettingKey::ShowBackground, move |show| {
            with_app(&background_target, |app| app.set_show_background(show));
        }),
    ]
}

fn with_app(target: &Weak<RefCell<App>>, f: impl FnOnce(&mut App) -> Result<()>) {
    let Some(app) = target.upgrade() else {
        return;
    };
    let Ok(mut app) = app.try_borrow_mut() else {
        warn!("App busy, dropping settings notification");
        return;
    };
    if let Err(e) = f(&mut app) {
        warn!(error = ?e, "Failed to apply settings change");
    }
}
