//! Clock text formatting and composition into an ARGB face image

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use std::fmt::{Display, Write};
use tracing::debug;

use crate::color::{blend_over, premultiply};
use crate::config::DisplayConfig;
use crate::font::{FontRenderer, RenderedText};
use crate::geometry::Size;

/// Premultiplied ARGB pixels ready for a 32-bit visual
#[derive(Debug, Clone, PartialEq)]
pub struct FaceImage {
    pub width: u16,
    pub height: u16,
    pub data: Vec<u32>,
}

impl FaceImage {
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

pub struct ClockFace {
    renderer: FontRenderer,
    config: DisplayConfig,
    show_background: bool,
    text: String,
    image: FaceImage,
}

impl ClockFace {
    pub fn new(config: DisplayConfig, show_background: bool) -> Result<Self> {
        let renderer = FontRenderer::load(&config.font, config.text_size)
            .context(format!("Failed to load font '{}'", config.font))?;
        let image = compose(&RenderedText::empty(), config.padding, background(&config, show_background));
        Ok(Self {
            renderer,
            config,
            show_background,
            text: String::new(),
            image,
        })
    }

    /// Format `now` with the configured pattern
    pub fn format_time<Tz>(&self, now: &DateTime<Tz>) -> Result<String>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format_with(&self.config.time_format, now)
    }

    /// Re-render if the formatted text differs. Returns whether the image changed.
    pub fn update_text<Tz>(&mut self, now: &DateTime<Tz>) -> Result<bool>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let text = self.format_time(now)?;
        if text == self.text {
            return Ok(false);
        }
        debug!(text = %text, "Clock text changed");
        self.text = text;
        self.render();
        Ok(true)
    }

    /// Returns whether the image changed
    pub fn set_show_background(&mut self, show: bool) -> bool {
        if self.show_background == show {
            return false;
        }
        self.show_background = show;
        self.render();
        true
    }

    /// Text plus padding on every side
    pub fn natural_size(&self) -> Size {
        self.image.size()
    }

    pub fn image(&self) -> &FaceImage {
        &self.image
    }

    fn render(&mut self) {
        let text = self.renderer.render_text(&self.text, self.config.text_color);
        self.image = compose(
            &text,
            self.config.padding,
            background(&self.config, self.show_background),
        );
    }
}

fn background(config: &DisplayConfig, show: bool) -> Option<u32> {
    show.then(|| premultiply(config.background_color))
}

fn format_with<Tz>(pattern: &str, now: &DateTime<Tz>) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut text = String::new();
    // Bad specifiers surface as fmt::Error
    write!(text, "{}", now.format(pattern))
        .map_err(|_| anyhow::anyhow!("Invalid time format '{}'", pattern))?;
    Ok(text)
}

/// Place `text` inset by `padding` on a transparent or filled (premultiplied) background
pub fn compose(text: &RenderedText, padding: u16, background: Option<u32>) -> FaceImage {
    let pad = usize::from(padding);
    let width = (text.width + 2 * pad).clamp(1, usize::from(u16::MAX));
    let height = (text.height + 2 * pad).clamp(1, usize::from(u16::MAX));
    let mut data = vec![background.unwrap_or(0); width * height];

    for ty in 0..text.height {
        let y = ty + pad;
        if y >= height {
            break;
        }
        for tx in 0..text.width {
            let x = tx + pad;
            if x >= width {
                break;
            }
            let src = text.data[ty * text.width + tx];
            let dst = &mut data[y * width + x];
            *dst = blend_over(src, *dst);
        }
    }

    FaceImage {
        width: width as u16,
        height: height as u16,
        data,
    }
}
