//! App: terminal init, main loop, tick and key handling.

use crate::board::Pos;
use crate::game::GameState;
use crate::input::{Action, key_to_action};
use crate::resolve::Resolution;
use crate::theme::Theme;
use crate::{GameConfig, Speed};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Redraw budget per loop (~60 FPS).
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Paused,
    GameOver,
}

/// Merge flash: cells to highlight and the effect drawing them.
#[derive(Default)]
pub struct Flash {
    pub cells: Vec<Pos>,
    pub effect: Option<Effect>,
    pub process_time: Option<Instant>,
}

impl Flash {
    fn clear(&mut self) {
        self.cells.clear();
        self.effect = None;
        self.process_time = None;
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    /// Speed highlighted in the menu; becomes the game speed on start.
    menu_speed: Speed,
    last_tick: Instant,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    flash: Flash,
}

fn new_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(
            config.width,
            config.height,
            config.speed.delay_ms(),
            new_rng(config.seed),
        );
        let screen = if config.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Self {
            menu_speed: config.speed,
            config,
            theme,
            state,
            screen,
            last_tick: Instant::now(),
            repeat_state: None,
            last_repeat_fire: None,
            flash: Flash::default(),
        }
    }

    /// Fresh board at the chosen speed.
    fn reset_game(&mut self) {
        self.config.speed = self.menu_speed;
        self.state.restart(self.config.speed.delay_ms());
        self.screen = Screen::Playing;
        self.last_tick = Instant::now();
        self.repeat_state = None;
        self.last_repeat_fire = None;
        self.flash.clear();
        glog!(
            "new game: {}x{} at {:?} ({} ms)",
            self.config.width,
            self.config.height,
            self.config.speed,
            self.config.speed.delay_ms()
        );
    }

    /// After a landing: start the flash and catch game over.
    fn after_landing(&mut self, resolution: Option<Resolution>) {
        let Some(resolution) = resolution else {
            return;
        };
        self.repeat_state = None;
        self.last_repeat_fire = None;
        if !self.config.no_animation && !resolution.merged_cells.is_empty() {
            self.flash.clear();
            self.flash.cells = resolution.merged_cells;
        }
        if self.state.is_game_over() {
            self.screen = Screen::GameOver;
        }
    }

    /// Apply one action to the current screen. Returns true to quit.
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return Ok(true),
                Action::MoveLeft | Action::Rotate => self.menu_speed = cycle_speed(self.menu_speed, -1),
                Action::MoveRight | Action::SoftDrop => {
                    self.menu_speed = cycle_speed(self.menu_speed, 1);
                }
                Action::Confirm => self.reset_game(),
                _ => {}
            },
            Screen::Playing => match action {
                Action::Quit => return Ok(true),
                Action::Pause => {
                    self.screen = Screen::Paused;
                    self.repeat_state = None;
                }
                Action::Restart => self.reset_game(),
                Action::MoveLeft => {
                    self.state.move_left();
                }
                Action::MoveRight => {
                    self.state.move_right();
                }
                Action::Rotate => {
                    self.state.rotate();
                }
                Action::SoftDrop => {
                    let landed = self.state.soft_drop()?;
                    self.after_landing(landed);
                }
                Action::Confirm | Action::None => {}
            },
            Screen::Paused => match action {
                Action::Quit => return Ok(true),
                Action::Pause | Action::Confirm => {
                    self.screen = Screen::Playing;
                    self.last_tick = Instant::now();
                }
                Action::Restart => self.reset_game(),
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return Ok(true),
                Action::Restart | Action::Confirm => self.reset_game(),
                _ => {}
            },
        }
        Ok(false)
    }

    fn tick_repeat(&mut self) -> Result<()> {
        let Some((action, first)) = self.repeat_state else {
            return Ok(());
        };
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return Ok(());
        }
        let now = Instant::now();
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.handle_action(action)?;
            if self.repeat_state.is_some() {
                self.last_repeat_fire = Some(now);
            }
        }
        Ok(())
    }

    /// Gravity for the falling piece at the current fall delay.
    fn tick_gravity(&mut self) -> Result<()> {
        if self.last_tick.elapsed() < Duration::from_millis(self.state.delay_ms()) {
            return Ok(());
        }
        self.last_tick = Instant::now();
        let landed = self.state.tick()?;
        self.after_landing(landed);
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Release events stop held-key repeats; not every terminal supports them.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        if let Err(e) = &result {
            glog!("fatal: {e:#}");
        }
        glog!("exit: score {}", self.state.score());
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.menu_speed,
                    &mut self.flash,
                    now,
                );
            })?;

            if self.flash.effect.as_ref().is_some_and(Effect::done) {
                self.flash.clear();
            }

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    let action = key_to_action(key);
                    if key.kind != KeyEventKind::Press {
                        if key.kind == KeyEventKind::Release
                            && self.repeat_state.map(|(a, _)| a) == Some(action)
                        {
                            self.repeat_state = None;
                            self.last_repeat_fire = None;
                        }
                        continue;
                    }
                    // Our own DAS/ARR drives held keys; drop the OS repeats.
                    if self.repeat_state.map(|(a, _)| a) == Some(action) {
                        continue;
                    }
                    if self.handle_action(action)? {
                        return Ok(());
                    }
                    if self.screen == Screen::Playing && action.repeats() && self.state.piece.is_some() {
                        self.repeat_state = Some((action, Instant::now()));
                        self.last_repeat_fire = None;
                    }
                }
            }

            if self.screen == Screen::Playing {
                self.tick_repeat()?;
                self.tick_gravity()?;
            }
        }
    }
}

fn cycle_speed(current: Speed, step: isize) -> Speed {
    let n = Speed::ALL.len() as isize;
    let i = Speed::ALL.iter().position(|s| *s == current).unwrap_or(0) as isize;
    Speed::ALL[(i + step).rem_euclid(n) as usize]
}
