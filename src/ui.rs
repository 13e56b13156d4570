//! Layout and drawing: menu, board, sidebar, pause, game over, merge flash.

use crate::Speed;
use crate::app::{Flash, Screen};
use crate::board::Tile;
use crate::game::GameState;
use crate::piece::TetrominoKind;
use crate::score::STEP_THRESHOLD;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{CellFilter, Duration as TfxDuration, EffectRenderer, Interpolation, fx, ref_count};

/// Terminal columns per board cell; wide enough for "2048" plus padding.
const CELL_WIDTH: u16 = 5;
const SIDEBAR_WIDTH: u16 = 24;
/// Widest board whose frame and sidebar still fit a terminal row.
pub const MAX_BOARD_WIDTH: usize = ((u16::MAX - 2 - SIDEBAR_WIDTH) / CELL_WIDTH) as usize;
/// Tallest board accepted.
pub const MAX_BOARD_HEIGHT: usize = 1000;
/// Merge flash length.
const FLASH_MS: u32 = 300;

/// Saturating usize -> u16 for screen coordinates.
fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Board size in terminal cells, border included.
fn board_outer_size(state: &GameState) -> (u16, u16) {
    (
        to_u16(state.board.width()).saturating_mul(CELL_WIDTH).saturating_add(2),
        to_u16(state.board.height()).saturating_add(2),
    )
}

/// Terminal column of board column `col`.
fn cell_x(board_rect: Rect, col: usize) -> u16 {
    board_rect.x.saturating_add(to_u16(col).saturating_mul(CELL_WIDTH))
}

/// Centre the board plus sidebar in `area`; returns (board outer, sidebar).
fn game_layout(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (pw, ph) = board_outer_size(state);
    let total_w = pw.saturating_add(SIDEBAR_WIDTH);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(ph), Constraint::Fill(1)])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Terminal row for board row `row`; row 0 is drawn at the bottom.
fn screen_row(board_rect: Rect, height: usize, row: usize) -> u16 {
    board_rect.y.saturating_add(to_u16(height - 1 - row))
}

/// Tile number fitted into a cell; past five digits it is shown in units of 1024 ("128k").
fn tile_label(value: u32) -> String {
    let text = value.to_string();
    if text.len() <= CELL_WIDTH as usize {
        format!("{text:^w$}", w = CELL_WIDTH as usize)
    } else {
        format!("{:^w$}", format!("{}k", value / 1024), w = CELL_WIDTH as usize)
    }
}

fn tile_style(theme: &Theme, tile: Tile) -> Style {
    let rank = tile.rank();
    Style::default().fg(theme.tile_fg(rank)).bg(theme.tile_bg(rank)).bold()
}

/// Draw current screen (menu, game, pause and game-over overlays) and run the
/// merge flash when one is pending.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    menu_speed: Speed,
    flash: &mut Flash,
    now: Instant,
) {
    let area = frame.area();
    frame.buffer_mut().set_style(area, Style::default().bg(theme.bg));
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_speed, area),
        Screen::Playing | Screen::Paused | Screen::GameOver => {
            draw_game(frame, state, theme, area);
            if !flash.cells.is_empty() {
                apply_flash_effect(frame, state, theme, area, flash, now);
            }
            match screen {
                Screen::Paused => draw_pause_overlay(frame, theme, area),
                Screen::GameOver => draw_game_over(frame, state, theme, area),
                _ => {}
            }
        }
    }
}

fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let (board_area, sidebar_area) = game_layout(area, state);
    draw_board(frame, state, theme, board_area);
    draw_sidebar(frame, state, theme, sidebar_area);
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Tetrix2048 ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let (width, height) = (state.board.width(), state.board.height());
    let empty = Style::default().fg(theme.div_line).bg(theme.bg);
    let buf = frame.buffer_mut();
    for row in 0..height {
        let y = screen_row(inner, height, row);
        if y >= inner.bottom() {
            continue;
        }
        for col in 0..width {
            let x = cell_x(inner, col);
            if x.saturating_add(CELL_WIDTH) > inner.right() {
                break;
            }
            match state.board.get(row, col) {
                Some(tile) => buf.set_string(x, y, tile_label(tile.value()), tile_style(theme, tile)),
                None => buf.set_string(x, y, "  ·  ", empty),
            };
        }
    }

    // Cells still above the top row stay hidden.
    if let Some(piece) = &state.piece {
        for (pos, tile) in piece.landed_tiles() {
            if pos.row < 0 || pos.row as usize >= height || pos.col < 0 {
                continue;
            }
            let x = cell_x(inner, pos.col as usize);
            let y = screen_row(inner, height, pos.row as usize);
            if x.saturating_add(CELL_WIDTH) <= inner.right() && y < inner.bottom() {
                buf.set_string(x, y, tile_label(tile.value()), tile_style(theme, tile));
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Next
            Constraint::Length(7), // Score, speed
            Constraint::Length(7), // Last landing
            Constraint::Fill(1),   // Keys
        ])
        .split(area);

    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    if let Some(kind) = state.next_kind() {
        draw_next_preview(frame, theme, next_inner, kind);
    }

    let ramp = &state.scoreboard.ramp;
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let stats = vec![
        stat("Score: ", state.score().to_string()),
        stat("Delay: ", format!("{} ms", ramp.delay_ms())),
        stat("Speed up: ", format!("x{}", ramp.steps())),
        stat("Ramp: ", format!("{}/{}", ramp.accumulated(), STEP_THRESHOLD)),
        stat("Pieces: ", state.landings.to_string()),
    ];
    Paragraph::new(stats)
        .block(Block::default().borders(Borders::ALL).border_style(border_style))
        .render(chunks[1], frame.buffer_mut());

    let last = &state.last_resolution;
    let landing = vec![
        stat("Points: ", format!("+{}", last.points)),
        stat("Merges: ", last.merges.to_string()),
        stat("Rows: ", last.rows_cleared.to_string()),
        stat("Drops: ", last.drops.to_string()),
        stat("Rounds: ", last.rounds.to_string()),
    ];
    Paragraph::new(landing)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(" Last landing ", title_style)),
        )
        .render(chunks[2], frame.buffer_mut());

    let keys = vec![
        Line::from(Span::styled(" ←→ move  ↑ rotate", fg_style)),
        Line::from(Span::styled(" ↓ drop   P pause", fg_style)),
        Line::from(Span::styled(" R restart Q quit", fg_style)),
    ];
    Paragraph::new(keys).render(chunks[3], frame.buffer_mut());
}

/// Next piece as a small block preview (actual shape, two columns per cell).
fn draw_next_preview(frame: &mut Frame, theme: &Theme, area: Rect, kind: TetrominoKind) {
    let cells = kind.cells();
    let max_dx = cells.iter().map(|c| c.0).max().unwrap_or(0) as u16;
    let max_dy = cells.iter().map(|c| c.1).max().unwrap_or(0) as u16;
    let off_x = area.width.saturating_sub((max_dx + 1) * 2) / 2;
    let off_y = area.height.saturating_sub(max_dy + 1) / 2;
    let style = Style::default().fg(theme.tile_bg(2));
    for &(dx, dy) in cells {
        let x = area.x + off_x + dx as u16 * 2;
        let y = area.y + off_y + dy as u16;
        if x + 2 <= area.right() && y < area.bottom() {
            frame.buffer_mut().set_string(x, y, "██", style);
        }
    }
}

/// Centred popup of the given size, clipped to `area`.
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, selected: Speed, area: Rect) {
    let popup = popup_rect(area, 44, 14);
    let highlight = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal = Style::default().fg(theme.main_fg);

    let mut options = Vec::new();
    for speed in Speed::ALL {
        if !options.is_empty() {
            options.push(Span::from("  "));
        }
        let style = if speed == selected { highlight } else { normal };
        options.push(Span::styled(format!(" {} ", speed.label()), style));
    }

    let title = Line::from(vec![
        Span::styled(" Tetrix ", Style::default().fg(theme.tile_bg(5)).bold()),
        Span::styled("2048 ", Style::default().fg(theme.tile_bg(10)).bold()),
    ]);
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(" ─ SPEED ─ ", Style::default().fg(theme.div_line))),
        Line::from(options),
        Line::from(Span::styled(
            format!("{} ms per row", selected.delay_ms()),
            Style::default().fg(theme.div_line),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↔ ", Style::default().fg(theme.title)),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.title)),
            Span::from("START"),
        ]),
        Line::from(""),
        Line::from(Span::styled(" [Q] QUIT ", Style::default().fg(Color::Rgb(255, 80, 80)))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 30, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(Span::styled(
            " P Resume  R Restart  Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 30, 9);
    let fg = Style::default().fg(theme.main_fg);
    let biggest = state.board.tiles().map(|(_, t)| t.value()).max().unwrap_or(0);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", state.score()), fg)),
        Line::from(Span::styled(format!(" Biggest tile: {biggest} "), fg)),
        Line::from(""),
        Line::from(Span::styled(" R Restart    Q Quit ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Tetrix2048 ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

/// Buffer positions covered by the flashing board cells.
fn flash_buffer_positions(board_rect: Rect, state: &GameState, flash: &Flash) -> HashSet<(u16, u16)> {
    let height = state.board.height();
    let mut set = HashSet::new();
    for pos in &flash.cells {
        if pos.row < 0 || pos.row as usize >= height || pos.col < 0 {
            continue;
        }
        let x0 = cell_x(board_rect, pos.col as usize);
        let y = screen_row(board_rect, height, pos.row as usize);
        for x in x0..x0.saturating_add(CELL_WIDTH).min(board_rect.right()) {
            set.insert((x, y));
        }
    }
    set
}

/// Create or advance the merge flash (TachyonFX: cells fade in from the title colour).
fn apply_flash_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    flash: &mut Flash,
    now: Instant,
) {
    let (board_area, _) = game_layout(area, state);
    let board_rect = Block::default().borders(Borders::ALL).inner(board_area);
    let delta = flash
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or_default();
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u32::MAX as u128) as u32);
    flash.process_time = Some(now);

    if flash.effect.is_none() {
        let positions = flash_buffer_positions(board_rect, state, flash);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(theme.title, theme.title, (FLASH_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board_rect, tfx_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pos;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(screen: Screen, state: &GameState) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let mut flash = Flash::default();
        terminal
            .draw(|f| draw(f, screen, state, &Theme::default(), Speed::Normal, &mut flash, Instant::now()))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn labels_fit_the_cell() {
        assert_eq!(tile_label(2), "  2  ");
        assert_eq!(tile_label(2048), "2048 ");
        assert_eq!(tile_label(131_072), "128k ");
        assert!(tile_label(u32::MAX).chars().count() >= CELL_WIDTH as usize);
    }

    #[test]
    fn floor_row_is_drawn_last() {
        let mut state = GameState::new(6, 8, 175, SmallRng::seed_from_u64(2));
        state.piece = None;
        state.board.place([(Pos::new(0, 0), Tile::new(1024)), (Pos::new(7, 5), Tile::new(64))]);
        let screen = render(Screen::Playing, &state);
        let floor = screen.iter().position(|l| l.contains("1024")).unwrap();
        let top = screen.iter().position(|l| l.contains(" 64 ")).unwrap();
        assert_eq!(floor - top, 7);
    }

    #[test]
    fn sidebar_and_overlays_render() {
        let state = GameState::new(6, 8, 175, SmallRng::seed_from_u64(2));
        let text = render(Screen::Playing, &state).concat();
        assert!(text.contains("Score: 0"));
        assert!(text.contains("175 ms"));
        assert!(render(Screen::Paused, &state).concat().contains("Paused"));
        assert!(render(Screen::GameOver, &state).concat().contains("Game Over"));
        assert!(render(Screen::Menu, &state).concat().contains("NORMAL"));
    }

    #[test]
    fn widest_board_renders_without_overflow() {
        let (w, h) = board_outer_size(&GameState::new(MAX_BOARD_WIDTH, 8, 175, SmallRng::seed_from_u64(3)));
        assert!(u32::from(w) + u32::from(SIDEBAR_WIDTH) <= u32::from(u16::MAX));
        assert_eq!(h, 10);
        let mut state = GameState::new(MAX_BOARD_WIDTH, 8, 175, SmallRng::seed_from_u64(3));
        state.board.place([(Pos::new(0, MAX_BOARD_WIDTH as i32 - 1), Tile::new(2))]);
        assert_eq!(render(Screen::Playing, &state).len(), 30);
    }
}
