//! Theme loading: btop-style `theme[key]="value"` files and hex → ratatui Color.

use crate::Palette;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of tile colours; values past 4096 reuse the last one.
pub const TILE_COLOURS: usize = 12;

/// Classic 2048 tile backgrounds for 2, 4, 8, ... 4096.
const CLASSIC_TILES: [Color; TILE_COLOURS] = [
    Color::Rgb(239, 230, 221),
    Color::Rgb(239, 227, 205),
    Color::Rgb(247, 178, 123),
    Color::Rgb(247, 150, 99),
    Color::Rgb(247, 124, 90),
    Color::Rgb(247, 93, 59),
    Color::Rgb(239, 205, 115),
    Color::Rgb(239, 206, 99),
    Color::Rgb(239, 198, 82),
    Color::Rgb(238, 198, 66),
    Color::Rgb(239, 194, 49),
    Color::Rgb(60, 58, 51),
];

const HIGH_CONTRAST_TILES: [Color; TILE_COLOURS] = [
    Color::Rgb(255, 255, 255),
    Color::Rgb(255, 255, 0),
    Color::Rgb(255, 160, 0),
    Color::Rgb(255, 80, 0),
    Color::Rgb(255, 0, 0),
    Color::Rgb(255, 0, 160),
    Color::Rgb(200, 0, 255),
    Color::Rgb(80, 80, 255),
    Color::Rgb(0, 160, 255),
    Color::Rgb(0, 255, 255),
    Color::Rgb(0, 255, 80),
    Color::Rgb(160, 255, 0),
];

#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile background by rank (2 → 0, 4 → 1, ...).
    pub tiles: [Color; TILE_COLOURS],
    /// Number colour on light tiles.
    pub tile_fg_dark: Color,
    /// Number colour on dark tiles.
    pub tile_fg_light: Color,
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, speed).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            tiles: CLASSIC_TILES,
            tile_fg_dark: Color::Rgb(0, 100, 200),
            tile_fg_light: Color::Rgb(249, 246, 242),
            bg: Color::Rgb(42, 69, 99),
            div_line: Color::Rgb(0, 100, 200),
            main_fg: Color::Rgb(200, 200, 200),
            title: Color::Rgb(25, 255, 228),
        }
    }
}

impl Theme {
    /// Load from a btop-style file, falling back to the default for any key
    /// that is missing or unparsable. No path means the default theme.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            None => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.tiles = HIGH_CONTRAST_TILES;
                self.tile_fg_dark = Color::Black;
                self.tile_fg_light = Color::Black;
                self.bg = Color::Black;
                self.div_line = Color::White;
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let mut theme = Self::default();
        for (rank, slot) in theme.tiles.iter_mut().enumerate() {
            if let Some(c) = get(&format!("tile_{}", 2u32 << rank)) {
                *slot = c;
            }
        }
        theme.bg = get("meter_bg").unwrap_or(theme.bg);
        theme.div_line = get("div_line").unwrap_or(theme.div_line);
        theme.main_fg = get("main_fg").unwrap_or(theme.main_fg);
        theme.title = get("title").unwrap_or(theme.title);
        theme.tile_fg_dark = get("tile_fg").unwrap_or(theme.tile_fg_dark);
        theme
    }

    /// Background for a tile of the given rank.
    #[inline]
    pub fn tile_bg(&self, rank: u8) -> Color {
        self.tiles[(rank as usize).min(TILE_COLOURS - 1)]
    }

    /// Number colour for a tile of the given rank: dark on the pale low
    /// ranks, light from 8 upward.
    #[inline]
    pub fn tile_fg(&self, rank: u8) -> Color {
        if rank < 2 {
            self.tile_fg_dark
        } else {
            self.tile_fg_light
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_long_and_short() {
        assert_eq!(parse_hex("#EFE6DD").unwrap(), Color::Rgb(0xEF, 0xE6, 0xDD));
        assert_eq!(parse_hex("#FFF").unwrap(), Color::Rgb(255, 255, 255));
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn theme_file_overrides_tiles_and_ui() {
        let map = parse_theme_file(
            "# comment\ntheme[tile_8]=\"#010203\"\ntheme[meter_bg]='#000000'\ntheme[title]=\"\"",
        );
        assert_eq!(map.get("tile_8").map(String::as_str), Some("#010203"));
        assert!(!map.contains_key("title"));
        let theme = Theme::from_map(&map);
        assert_eq!(theme.tile_bg(2), Color::Rgb(1, 2, 3));
        assert_eq!(theme.bg, Color::Rgb(0, 0, 0));
        assert_eq!(theme.title, Theme::default().title);
    }

    #[test]
    fn big_tiles_reuse_the_last_colour() {
        let theme = Theme::default();
        assert_eq!(theme.tile_bg(11), theme.tile_bg(20));
        assert_eq!(theme.tile_fg(0), theme.tile_fg_dark);
        assert_eq!(theme.tile_fg(5), theme.tile_fg_light);
    }
}
