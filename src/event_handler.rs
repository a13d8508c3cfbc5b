use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use crate::app::App;
use crate::poller::LoopEvent;
use crate::x11_utils::CachedAtoms;

/// Forward X11 events to the main loop from a dedicated thread
pub fn spawn_event_reader(conn: Arc<RustConnection>, sender: Sender<LoopEvent>) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("x11-events".into())
        .spawn(move || loop {
            match conn.wait_for_event() {
                Ok(event) => {
                    if sender.send(LoopEvent::X11(event)).is_err() {
                        debug!("Main loop gone, stopping X11 event reader");
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "X11 connection error");
                    let _ = sender.send(LoopEvent::ConnectionLost(e.to_string()));
                    break;
                }
            }
        })
        .context("Failed to spawn X11 event reader thread")
}

/// What an X11 event means for the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// Monitor layout or root size changed: reposition, then re-decide
    ScreenChanged,
    /// Work area moved, the screen itself did not: re-decide only
    WorkAreaChanged,
    Redraw,
    Ignore,
}

pub fn classify_event(event: &Event, root: Window, atoms: &CachedAtoms) -> EventAction {
    match event {
        Event::RandrScreenChangeNotify(_) | Event::RandrNotify(_) => EventAction::ScreenChanged,
        Event::ConfigureNotify(event) if event.window == root => EventAction::ScreenChanged,
        Event::PropertyNotify(event)
            if event.window == root
                && (event.atom == atoms.net_workarea || event.atom == atoms.net_current_desktop) =>
        {
            EventAction::WorkAreaChanged
        }
        Event::Expose(event) if event.count == 0 => EventAction::Redraw,
        _ => EventAction::Ignore,
    }
}

pub fn handle_event(app: &mut App, event: Event, now: Instant) -> Result<()> {
    if let Event::Error(e) = &event {
        warn!(error = ?e, "X11 request failed");
        return Ok(());
    }

    match classify_event(&event, app.root(), app.atoms()) {
        EventAction::ScreenChanged => {
            info!("Screen configuration changed");
            app.handle_screen_change(now);
        }
        EventAction::WorkAreaChanged => {
            debug!("Work area changed");
            app.evaluate_and_apply(now);
        }
        EventAction::Redraw => app.redraw()?,
        EventAction::Ignore => (),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::randr::ScreenChangeNotifyEvent;
    use x11rb::protocol::xproto::{ConfigureNotifyEvent, ExposeEvent, PropertyNotifyEvent};

    const ROOT: Window = 0x100;
    const OVERLAY: Window = 0x200;

    fn atoms() -> CachedAtoms {
        CachedAtoms {
            net_workarea: 1,
            net_current_desktop: 2,
            net_wm_window_opacity: 3,
            net_wm_state: 4,
            net_wm_state_above: 5,
            net_wm_state_sticky: 6,
            net_wm_window_type: 7,
            net_wm_window_type_notification: 8,
            wm_class: 9,
        }
    }

    fn property(window: Window, atom: u32) -> Event {
        Event::PropertyNotify(PropertyNotifyEvent {
            window,
            atom,
            ..Default::default()
        })
    }

    fn configure(window: Window) -> Event {
        Event::ConfigureNotify(ConfigureNotifyEvent {
            event: window,
            window,
            width: 1920,
            height: 1080,
            ..Default::default()
        })
    }

    fn expose(count: u16) -> Event {
        Event::Expose(ExposeEvent {
            window: OVERLAY,
            count,
            ..Default::default()
        })
    }

    #[test]
    fn test_classify_event_routing() {
        let atoms = atoms();
        let cases = [
            (Event::RandrScreenChangeNotify(ScreenChangeNotifyEvent::default()), EventAction::ScreenChanged),
            (configure(ROOT), EventAction::ScreenChanged),
            (configure(OVERLAY), EventAction::Ignore),
            (property(ROOT, atoms.net_workarea), EventAction::WorkAreaChanged),
            (property(ROOT, atoms.net_current_desktop), EventAction::WorkAreaChanged),
            (property(ROOT, atoms.wm_class), EventAction::Ignore),
            (property(OVERLAY, atoms.net_workarea), EventAction::Ignore),
            (expose(0), EventAction::Redraw),
            (expose(2), EventAction::Ignore),
        ];

        for (event, expected) in cases {
            assert_eq!(classify_event(&event, ROOT, &atoms), expected, "event: {:?}", event);
        }
    }

    #[test]
    fn test_work_area_change_never_repositions() {
        let atoms = atoms();
        let action = classify_event(&property(ROOT, atoms.net_workarea), ROOT, &atoms);
        assert_ne!(action, EventAction::ScreenChanged);
    }
}
