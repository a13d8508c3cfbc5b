use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::randr::{self, ConnectionExt as RandrExt, NotifyMask};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;
use crate::display::{DisplayQuery, DisplaySnapshot};
use crate::geometry::{Point, Rect};

/// Pre-cached X11 atoms to avoid repeated roundtrips
#[derive(Debug, Clone, Copy)]
pub struct CachedAtoms {
    pub net_workarea: Atom,
    pub net_current_desktop: Atom,
    pub net_wm_window_opacity: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_notification: Atom,
    pub wm_class: Atom,
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context(format!("Failed to intern {} atom", name))?
        .reply()
        .context(format!("Failed to get reply for {} atom", name))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            net_workarea: intern(conn, "_NET_WORKAREA")?,
            net_current_desktop: intern(conn, "_NET_CURRENT_DESKTOP")?,
            net_wm_window_opacity: intern(conn, "_NET_WM_WINDOW_OPACITY")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_above: intern(conn, "_NET_WM_STATE_ABOVE")?,
            net_wm_state_sticky: intern(conn, "_NET_WM_STATE_STICKY")?,
            net_wm_window_type: intern(conn, "_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_notification: intern(conn, "_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            wm_class: intern(conn, "WM_CLASS")?,
        })
    }
}

/// First 32-bit TrueColor visual on the screen, needed for per-pixel alpha
pub fn find_argb_visual(screen: &Screen) -> Option<Visualid> {
    screen
        .allowed_depths
        .iter()
        .filter(|depth| depth.depth == x11::ARGB_DEPTH)
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| visual.class == VisualClass::TRUE_COLOR)
        .map(|visual| visual.visual_id)
}

/// Subscribe the root window to everything that can move the main screen or its work area.
/// Returns whether RandR 1.5 monitors are available.
pub fn watch_screen_changes(conn: &RustConnection, root: Window) -> Result<bool> {
    conn.change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new()
            .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
    )
    .context("Failed to select root window events")?;

    let randr = randr_monitors_supported(conn);
    if randr {
        conn.randr_select_input(
            root,
            NotifyMask::SCREEN_CHANGE | NotifyMask::CRTC_CHANGE | NotifyMask::OUTPUT_CHANGE,
        )
        .context("Failed to select RandR notifications")?;
    } else {
        warn!("RandR 1.5 unavailable, treating the whole root window as the main screen");
    }
    conn.flush().context("Failed to flush X11 connection after selecting root events")?;
    Ok(randr)
}

fn randr_monitors_supported(conn: &RustConnection) -> bool {
    match conn.extension_information(randr::X11_EXTENSION_NAME) {
        Ok(Some(_)) => {}
        Ok(None) => return false,
        Err(e) => {
            warn!(error = %e, "Failed to query RandR extension");
            return false;
        }
    }
    match conn.randr_query_version(1, 5).map(|cookie| cookie.reply()) {
        Ok(Ok(version)) => {
            debug!(major = version.major_version, minor = version.minor_version, "RandR version");
            (version.major_version, version.minor_version) >= (1, 5)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "RandR version query failed");
            false
        }
        Err(e) => {
            warn!(error = %e, "RandR version request failed");
            false
        }
    }
}

/// Height of the root window, the pivot for Y-down to Y-up conversion
pub fn root_height(conn: &RustConnection, root: Window) -> Result<f64> {
    let geometry = conn
        .get_geometry(root)
        .context("Failed to send root geometry query")?
        .reply()
        .context("Failed to get root geometry reply")?;
    Ok(f64::from(geometry.height))
}

/// Root-window backed view of the main screen, in Y-up coordinates
pub struct X11Display {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: CachedAtoms,
    randr: bool,
}

impl X11Display {
    pub fn new(conn: Arc<RustConnection>, root: Window, atoms: CachedAtoms, randr: bool) -> Self {
        Self {
            conn,
            root,
            atoms,
            randr,
        }
    }

    /// Main monitor as a Y-down rectangle (x, y, width, height)
    fn main_monitor(&self) -> Result<(i16, i16, u16, u16)> {
        if self.randr {
            let monitors = self
                .conn
                .randr_get_monitors(self.root, true)
                .context("Failed to send RandR monitor query")?
                .reply()
                .context("Failed to get RandR monitor reply")?
                .monitors;
            let main = monitors
                .iter()
                .find(|monitor| monitor.primary)
                .or_else(|| monitors.first());
            if let Some(monitor) = main {
                return Ok((monitor.x, monitor.y, monitor.width, monitor.height));
            }
            debug!("RandR reported no monitors, falling back to root geometry");
        }

        let geometry = self
            .conn
            .get_geometry(self.root)
            .context("Failed to send root geometry query")?
            .reply()
            .context("Failed to get root geometry reply")?;
        Ok((0, 0, geometry.width, geometry.height))
    }

    /// `_NET_WORKAREA` entry for the current desktop, Y-down
    fn work_area(&self) -> Result<Option<(i32, i32, u32, u32)>> {
        let desktop = self
            .conn
            .get_property(false, self.root, self.atoms.net_current_desktop, AtomEnum::CARDINAL, 0, 1)
            .context("Failed to query _NET_CURRENT_DESKTOP property")?
            .reply()
            .context("Failed to get reply for _NET_CURRENT_DESKTOP query")?
            .value32()
            .and_then(|mut values| values.next())
            .unwrap_or(0);

        let offset = desktop.saturating_mul(x11::WORKAREA_FIELDS);
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_workarea,
                AtomEnum::CARDINAL,
                offset,
                x11::WORKAREA_FIELDS,
            )
            .context("Failed to query _NET_WORKAREA property")?
            .reply()
            .context("Failed to get reply for _NET_WORKAREA query")?;

        let Some(values) = reply.value32() else {
            return Ok(None);
        };
        let values: Vec<u32> = values.collect();
        match values.as_slice() {
            [x, y, w, h] => Ok(Some((*x as i32, *y as i32, *w, *h))),
            _ => Ok(None),
        }
    }

    fn cursor(&self) -> Result<(i16, i16)> {
        let pointer = self
            .conn
            .query_pointer(self.root)
            .context("Failed to send pointer query")?
            .reply()
            .context("Failed to get pointer query reply")?;
        Ok((pointer.root_x, pointer.root_y))
    }

    fn query_snapshot(&self) -> Result<DisplaySnapshot> {
        let root_height = root_height(&self.conn, self.root)?;
        let (mx, my, mw, mh) = self.main_monitor()?;
        let full_frame = Rect::from_y_down(
            f64::from(mx),
            f64::from(my),
            f64::from(mw),
            f64::from(mh),
            root_height,
        );

        let usable_frame = match self.work_area()? {
            Some((x, y, w, h)) => {
                let area = Rect::from_y_down(
                    f64::from(x),
                    f64::from(y),
                    f64::from(w),
                    f64::from(h),
                    root_height,
                );
                full_frame.intersection(&area).unwrap_or(full_frame)
            }
            None => full_frame,
        };

        let (cx, cy) = self.cursor()?;
        let cursor = Point::from_y_down(f64::from(cx), f64::from(cy), root_height);

        Ok(DisplaySnapshot {
            full_frame,
            usable_frame,
            cursor,
        })
    }
}

impl DisplayQuery for X11Display {
    fn snapshot(&self) -> Option<DisplaySnapshot> {
        self.query_snapshot()
            .inspect_err(|e| debug!(error = ?e, "Display query failed"))
            .ok()
    }
}
