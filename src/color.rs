//! Hex color parsing and ARGB pixel helpers

/// Color stored as straight (non-premultiplied) 0xAARRGGBB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor(u32);

impl HexColor {
    /// Parse `RRGGBB` or `AARRGGBB`, optional leading '#'.
    /// Six-digit colors get full opacity.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => u32::from_str_radix(hex, 16).ok().map(|rgb| Self(0xFF00_0000 | rgb)),
            8 => u32::from_str_radix(hex, 16).ok().map(Self),
            _ => None,
        }
    }

    pub const fn from_argb32(argb: u32) -> Self {
        Self(argb)
    }

    pub fn argb32(&self) -> u32 {
        self.0
    }
}

pub fn premultiply(argb: u32) -> u32 {
    let a = argb >> 24;
    let scale = |shift: u32| (((argb >> shift) & 0xFF) * a + 127) / 255;
    (a << 24) | (scale(16) << 16) | (scale(8) << 8) | scale(0)
}

/// Porter-Duff "over" for premultiplied ARGB pixels
pub fn blend_over(src: u32, dst: u32) -> u32 {
    let src_a = src >> 24;
    if src_a == 0xFF {
        return src;
    }
    if src_a == 0 {
        return dst;
    }
    let inv = 255 - src_a;
    let channel = |shift: u32| {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        (s + (d * inv + 127) / 255).min(255)
    };
    (channel(24) << 24) | (channel(16) << 16) | (channel(8) << 8) | channel(0)
}
