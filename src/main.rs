//! Tetrix2048: falling tetrominoes whose cells carry 2048 numbers. Equal
//! neighbours stacked vertically merge, full rows clear, floating clusters fall.

#[macro_use]
mod logging;

mod app;
mod board;
mod game;
mod gravity;
mod input;
mod labeling;
mod merge;
mod piece;
mod resolve;
mod rows;
mod score;
mod supply;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use app::App;
use clap::{Parser, ValueEnum};

/// Smallest playable board in either direction.
pub const MIN_BOARD_SIDE: usize = 4;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: usize,
    pub height: usize,
    pub speed: Speed,
    pub seed: Option<u64>,
    pub no_menu: bool,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GameConfig::from_args(&args)?;
    if let Some(path) = args.log_file.as_deref() {
        logging::init_log_file(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        glog!("theme not loaded ({e}), using default");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    glog!(
        "start: {}x{} board, speed {:?}, seed {:?}",
        config.width,
        config.height,
        config.speed,
        config.seed
    );
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.width < MIN_BOARD_SIDE || args.height < MIN_BOARD_SIDE {
            bail!(
                "board must be at least {MIN_BOARD_SIDE}x{MIN_BOARD_SIDE}, got {}x{}",
                args.width,
                args.height
            );
        }
        if args.width > ui::MAX_BOARD_WIDTH || args.height > ui::MAX_BOARD_HEIGHT {
            bail!(
                "board must be at most {}x{}, got {}x{}",
                ui::MAX_BOARD_WIDTH,
                ui::MAX_BOARD_HEIGHT,
                args.width,
                args.height
            );
        }
        Ok(Self {
            width: args.width,
            height: args.height,
            speed: args.speed,
            seed: args.seed,
            no_menu: args.no_menu,
            no_animation: args.no_animation,
        })
    }
}

/// Tetris meets 2048 in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetrix2048",
    version,
    about = "Tetris meets 2048 in the terminal. Equal numbers stacked vertically merge; full rows clear.",
    long_about = "Tetrix2048 is a falling-block puzzle where every block carries a 2048 number.\n\n\
        When a piece lands, vertically adjacent equal numbers merge into their double, \
        full rows are cleared for the sum of their numbers, and anything left hanging falls.\n\
        Every 500 points the pieces fall 5% faster.\n\n\
        CONTROLS:\n  Left/Right or h/l  Move    Up or k  Rotate    Down or j  Soft drop\n  \
        P  Pause    R  Restart    Q / Esc  Quit"
)]
pub struct Args {
    /// Starting fall speed.
    #[arg(short, long, default_value = "normal")]
    pub speed: Speed,

    /// Board width in columns.
    #[arg(long, default_value = "12", value_name = "COLS")]
    pub width: usize,

    /// Board height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: usize,

    /// Seed for the piece generator; random when not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme) or high-contrast.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip the speed menu and start immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the merge flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Write a log of landings and resolutions to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Speed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl Speed {
    pub const ALL: [Self; 3] = [Self::Slow, Self::Normal, Self::Fast];

    /// Fall delay per row before any speed-ups.
    pub fn delay_ms(self) -> u64 {
        match self {
            Self::Slow => 250,
            Self::Normal => 175,
            Self::Fast => 120,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Slow => "SLOW",
            Self::Normal => "NORMAL",
            Self::Fast => "FAST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_normal_twelve_by_twenty() {
        let args = Args::parse_from(["tetrix2048"]);
        let config = GameConfig::from_args(&args).unwrap();
        assert_eq!((config.width, config.height), (12, 20));
        assert_eq!(config.speed, Speed::Normal);
        assert_eq!(config.speed.delay_ms(), 175);
    }

    #[test]
    fn tiny_boards_are_rejected() {
        let args = Args::parse_from(["tetrix2048", "--width", "3"]);
        assert!(GameConfig::from_args(&args).is_err());
        let args = Args::parse_from(["tetrix2048", "--width", "4", "--height", "4"]);
        assert!(GameConfig::from_args(&args).is_ok());
    }

    #[test]
    fn huge_boards_are_rejected() {
        let args = Args::parse_from(["tetrix2048", "--width", "14000"]);
        assert!(GameConfig::from_args(&args).is_err());
        let widest = ui::MAX_BOARD_WIDTH.to_string();
        let args = Args::parse_from(["tetrix2048", "--width", widest.as_str()]);
        assert!(GameConfig::from_args(&args).is_ok());
        let taller = (ui::MAX_BOARD_HEIGHT + 1).to_string();
        let args = Args::parse_from(["tetrix2048", "--height", taller.as_str()]);
        assert!(GameConfig::from_args(&args).is_err());
    }

    #[test]
    fn speed_presets() {
        let args = Args::parse_from(["tetrix2048", "-s", "fast", "--seed", "7"]);
        assert_eq!(args.speed.delay_ms(), 120);
        assert_eq!(args.seed, Some(7));
        assert_eq!(Speed::Slow.delay_ms(), 250);
    }
}
