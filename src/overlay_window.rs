use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info};
use x11rb::connection::Connection;
use x11rb::protocol::shape::{ConnectionExt as ShapeExt, SK, SO};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::clock_face::FaceImage;
use crate::constants::x11;
use crate::controller::OverlaySurface;
use crate::geometry::{Rect, Size};
use crate::x11_utils::{find_argb_visual, root_height, CachedAtoms};

/// Click-through, always-on-top ARGB window the clock face is drawn into
#[derive(Debug)]
pub struct OverlayWindow {
    pub window: Window,
    root: Window,
    colormap: Colormap,
    gc: Gcontext,
    atoms: CachedAtoms,
    conn: Arc<RustConnection>,
}

impl OverlayWindow {
    fn create_window(
        conn: &RustConnection,
        screen: &Screen,
        visual: Visualid,
        colormap: Colormap,
        size: Size,
    ) -> Result<Window> {
        let window = conn.generate_id()
            .context("Failed to generate X11 window ID")?;
        conn.create_window(
            x11::ARGB_DEPTH,
            window,
            screen.root,
            0,
            0,
            dimension(size.width),
            dimension(size.height),
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &CreateWindowAux::new()
                .background_pixel(0)
                .border_pixel(0)
                .colormap(colormap)
                .override_redirect(x11::OVERRIDE_REDIRECT)
                .event_mask(EventMask::EXPOSURE),
        )
        .context("Failed to create overlay window")?;
        Ok(window)
    }

    /// Setup window properties (opacity, WM_CLASS, always-on-top, click-through)
    fn setup_window_properties(conn: &RustConnection, atoms: &CachedAtoms, window: Window) -> Result<()> {
        // Start invisible; the first visibility decision fades in
        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[0],
        )
        .context("Failed to set initial overlay opacity")?;

        conn.change_property8(
            PropMode::REPLACE,
            window,
            atoms.wm_class,
            AtomEnum::STRING,
            x11::WM_CLASS,
        )
        .context("Failed to set WM_CLASS on overlay window")?;

        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms.net_wm_state,
            AtomEnum::ATOM,
            &[atoms.net_wm_state_above, atoms.net_wm_state_sticky],
        )
        .context("Failed to set overlay window always-on-top")?;

        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms.net_wm_window_type,
            AtomEnum::ATOM,
            &[atoms.net_wm_window_type_notification],
        )
        .context("Failed to set overlay window type")?;

        // Empty input region: clicks pass through to whatever is underneath
        conn.shape_rectangles(SO::SET, SK::INPUT, ClipOrdering::UNSORTED, window, 0, 0, &[])
            .context("Failed to clear overlay input shape (check SHAPE extension)")?;

        conn.map_window(window)
            .inspect_err(|e| error!(window, error = ?e, "Failed to map overlay window"))
            .context("Failed to map overlay window")?;
        info!(window, "Mapped overlay window");

        Ok(())
    }

    pub fn new(conn: Arc<RustConnection>, screen: &Screen, atoms: CachedAtoms, size: Size) -> Result<Self> {
        let visual = find_argb_visual(screen)
            .context("No 32-bit ARGB visual available (is a compositor-capable X server running?)")?;

        let colormap = conn.generate_id()
            .context("Failed to generate ID for colormap")?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, screen.root, visual)
            .context("Failed to create ARGB colormap")?;

        let window = match Self::create_window(&conn, screen, visual, colormap, size) {
            Ok(window) => window,
            Err(e) => {
                if let Err(free_err) = conn.free_colormap(colormap) {
                    error!(colormap, error = %free_err, "Failed to free colormap after window creation failure");
                }
                return Err(e);
            }
        };

        // Destroys the window if initialization fails past this point
        struct WindowGuard<'a> {
            conn: &'a RustConnection,
            window: Window,
            colormap: Colormap,
            should_cleanup: bool,
        }

        impl Drop for WindowGuard<'_> {
            fn drop(&mut self) {
                if self.should_cleanup {
                    if let Err(e) = self.conn.destroy_window(self.window) {
                        error!(window = self.window, error = %e, "Failed to cleanup overlay window after initialization failure");
                    }
                    if let Err(e) = self.conn.free_colormap(self.colormap) {
                        error!(colormap = self.colormap, error = %e, "Failed to free colormap after initialization failure");
                    }
                    let _ = self.conn.flush();
                }
            }
        }

        let mut window_guard = WindowGuard {
            conn: &conn,
            window,
            colormap,
            should_cleanup: true,
        };

        Self::setup_window_properties(&conn, &atoms, window)?;

        let gc = conn.generate_id()
            .context("Failed to generate ID for overlay graphics context")?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .context("Failed to create overlay graphics context")?;
        conn.flush()
            .context("Failed to flush X11 connection after creating overlay window")?;

        window_guard.should_cleanup = false;
        drop(window_guard);

        Ok(Self {
            window,
            root: screen.root,
            colormap,
            gc,
            atoms,
            conn,
        })
    }

    /// Upload the clock face. The window is resized separately through the controller.
    pub fn present(&self, image: &FaceImage) -> Result<()> {
        if image.data.is_empty() {
            return Ok(());
        }

        // Convert Vec<u32> ARGB to bytes in X11 native format (little-endian BGRA)
        let mut image_data = Vec::with_capacity(image.data.len() * 4);
        for pixel in &image.data {
            image_data.push(*pixel as u8);        // B
            image_data.push((pixel >> 8) as u8);  // G
            image_data.push((pixel >> 16) as u8); // R
            image_data.push((pixel >> 24) as u8); // A
        }

        self.conn.put_image(
            ImageFormat::Z_PIXMAP,
            self.window,
            self.gc,
            image.width,
            image.height,
            0,
            0,
            0,
            x11::ARGB_DEPTH,
            &image_data,
        )
        .context(format!("Failed to upload {}x{} clock image", image.width, image.height))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after drawing clock")?;
        Ok(())
    }
}

fn dimension(value: f64) -> u16 {
    value.round().clamp(1.0, f64::from(u16::MAX)) as u16
}

fn opacity_cardinal(alpha: f64) -> u32 {
    (alpha.clamp(0.0, 1.0) * f64::from(x11::OPACITY_OPAQUE)).round() as u32
}

impl OverlaySurface for OverlayWindow {
    fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms.net_wm_window_opacity,
            AtomEnum::CARDINAL,
            &[opacity_cardinal(alpha)],
        )
        .context(format!("Failed to set overlay opacity to {:.3}", alpha))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after opacity change")?;
        Ok(())
    }

    fn set_frame(&mut self, frame: Rect) -> Result<()> {
        let (x, y) = frame.to_y_down_origin(root_height(&self.conn, self.root)?);
        debug!(x, y, width = frame.width(), height = frame.height(), "Configuring overlay window");
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(x)
                .y(y)
                .width(u32::from(dimension(frame.width())))
                .height(u32::from(dimension(frame.height()))),
        )
        .context(format!("Failed to move overlay window to ({}, {})", x, y))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after moving overlay")?;
        Ok(())
    }

    fn raise(&mut self) -> Result<()> {
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )
        .context(format!("Failed to raise overlay window {}", self.window))?;
        self.conn.flush()
            .context("Failed to flush X11 connection after raising overlay")?;
        Ok(())
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        // Clean up each resource independently
        if let Err(e) = self.conn.free_gc(self.gc) {
            error!("Failed to free GC {}: {}", self.gc, e);
        }

        if let Err(e) = self.conn.destroy_window(self.window) {
            error!("Failed to destroy overlay window {}: {}", self.window, e);
        }

        if let Err(e) = self.conn.free_colormap(self.colormap) {
            error!("Failed to free colormap {}: {}", self.colormap, e);
        }

        if let Err(e) = self.conn.flush() {
            error!("Failed to flush X11 connection during cleanup: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity_cardinal() {
        assert_eq!(opacity_cardinal(0.0), 0);
        assert_eq!(opacity_cardinal(1.0), 0xFFFF_FFFF);
        assert_eq!(opacity_cardinal(1.5), 0xFFFF_FFFF);
        assert_eq!(opacity_cardinal(-0.2), 0);
        assert_eq!(opacity_cardinal(0.5), 0x8000_0000);
    }

    #[test]
    fn test_dimension_never_zero() {
        assert_eq!(dimension(0.0), 1);
        assert_eq!(dimension(120.4), 120);
        assert_eq!(dimension(1e9), u16::MAX);
    }
}
