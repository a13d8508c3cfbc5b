//! TrueType font rendering using fontdue (pure Rust), with fontconfig lookup

use anyhow::{Context, Result};
use fontconfig::{Fontconfig, Pattern};
use fontdue::{Font, FontSettings};
use std::ffi::CString;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Style suffixes recognised when splitting "Family Style" names.
/// Longer names first so "SemiBold" is not read as "Bold".
const KNOWN_STYLES: &[&str] = &[
    "SemiBold Italic",
    "Bold Italic",
    "Medium Italic",
    "Light Italic",
    "ExtraBold",
    "SemiBold",
    "Italic",
    "Bold",
    "Light",
    "Medium",
    "Regular",
];

/// Fallbacks when fontconfig finds nothing usable
const FALLBACK_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
];

/// Rendered text as ARGB bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedText {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>, // ARGB pixels (premultiplied alpha)
}

impl RenderedText {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct FontRenderer {
    font: Font,
    size: f32,
}

impl FontRenderer {
    pub fn from_path(path: PathBuf, size: f32) -> Result<Self> {
        let font_data = fs::read(&path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;

        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;

        info!(path = %path.display(), size = size, "Loaded font");
        Ok(Self { font, size })
    }

    /// Load font from a font name (family or fullname) via fontconfig
    pub fn from_font_name(font_name: &str, size: f32) -> Result<Self> {
        let font_path = find_font_path(font_name)
            .with_context(|| format!("Failed to resolve font '{}'", font_name))?;
        Self::from_path(font_path, size)
    }

    /// Resolve `font_name`, falling back to common system fonts
    pub fn load(font_name: &str, size: f32) -> Result<Self> {
        match Self::from_font_name(font_name, size) {
            Ok(renderer) => return Ok(renderer),
            Err(e) => warn!(font = font_name, error = ?e, "Configured font unavailable, trying fallbacks"),
        }

        for path in FALLBACK_FONT_PATHS {
            if let Ok(renderer) = Self::from_path(PathBuf::from(path), size) {
                return Ok(renderer);
            }
        }

        Err(anyhow::anyhow!(
            "Could not find any system fonts. Tried '{}' via fontconfig and hardcoded paths: {:?}",
            font_name,
            FALLBACK_FONT_PATHS
        ))
    }

    /// Render text to an ARGB bitmap with the given foreground color (transparent background).
    ///
    /// Height comes from the font's line metrics so it stays constant as the text changes.
    pub fn render_text(&self, text: &str, fg_color: u32) -> RenderedText {
        if text.is_empty() {
            return RenderedText::empty();
        }

        let mut glyphs = Vec::new();
        let mut x = 0.0f32;
        let mut max_ascent = 0i32;
        let mut max_descent = 0i32;

        if let Some(line) = self.font.horizontal_line_metrics(self.size) {
            max_ascent = line.ascent.ceil() as i32;
            max_descent = (-line.descent).ceil() as i32;
        }

        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.size);
            max_ascent = max_ascent.max(metrics.height as i32 + metrics.ymin);
            max_descent = max_descent.max(-metrics.ymin);
            glyphs.push(((x.round() as i32) + metrics.xmin, metrics, bitmap));
            x += metrics.advance_width;
        }

        let width = x.ceil() as usize;
        let height = (max_ascent + max_descent).max(0) as usize;
        if width == 0 || height == 0 {
            return RenderedText::empty();
        }

        let mut data = vec![0x00000000; width * height];

        // Foreground is straight ARGB; output is premultiplied
        let fg_a = ((fg_color >> 24) & 0xFF) as f32 / 255.0;
        let fg_r = ((fg_color >> 16) & 0xFF) as f32 / 255.0;
        let fg_g = ((fg_color >> 8) & 0xFF) as f32 / 255.0;
        let fg_b = (fg_color & 0xFF) as f32 / 255.0;

        for (x_offset, metrics, bitmap) in glyphs {
            // Baseline sits max_ascent rows from the top
            let baseline_y = max_ascent - (metrics.height as i32 + metrics.ymin);

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let px = x_offset + gx as i32;
                    let py = baseline_y + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let coverage = bitmap[gy * metrics.width + gx] as f32 / 255.0;
                    if coverage > 0.0 {
                        let alpha = fg_a * coverage;
                        let a = (alpha * 255.0) as u32;
                        let r = (fg_r * alpha * 255.0) as u32;
                        let g = (fg_g * alpha * 255.0) as u32;
                        let b = (fg_b * alpha * 255.0) as u32;
                        data[(py as usize) * width + (px as usize)] = (a << 24) | (r << 16) | (g << 8) | b;
                    }
                }
            }
        }

        RenderedText {
            width,
            height,
            data,
        }
    }
}

/// Split "Family Style" into family and a known style suffix
fn split_style(font_name: &str) -> (&str, Option<&str>) {
    for style in KNOWN_STYLES {
        if let Some(prefix) = font_name.strip_suffix(style)
            && (prefix.is_empty() || prefix.ends_with(' '))
        {
            let family = prefix.trim();
            if !family.is_empty() {
                return (family, Some(style));
            }
        }
    }
    (font_name.trim(), None)
}

/// Find the font file for a family name or full font name
/// (e.g. "DejaVu Sans" or "DejaVu Sans Bold")
pub fn find_font_path(font_name: &str) -> Result<PathBuf> {
    let fc = Fontconfig::new().context("Failed to initialize fontconfig")?;
    let (family_name, style_name) = split_style(font_name);

    let mut pattern = Pattern::new(&fc);
    let family_cstr = CString::new(family_name)
        .with_context(|| format!("Invalid family name: {}", family_name))?;
    pattern.add_string(fontconfig::FC_FAMILY, &family_cstr);

    if let Some(style) = style_name {
        let style_cstr =
            CString::new(style).with_context(|| format!("Invalid style name: {}", style))?;
        pattern.add_string(fontconfig::FC_STYLE, &style_cstr);
    }

    let matched = pattern.font_match();
    let file_path = matched
        .filename()
        .with_context(|| format!("No font file found for '{}'", font_name))?;
    let path = PathBuf::from(file_path);

    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Font file path '{}' does not exist",
            path.display()
        ));
    }

    debug!(
        font = font_name,
        family = family_name,
        style = ?style_name,
        path = %path.display(),
        "Resolved font path via family + style"
    );
    Ok(path)
}
