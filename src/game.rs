//! Game state: board, falling piece, piece supply, score. Landing runs the
//! whole resolution before the next piece appears.

use crate::board::{Board, GridError};
use crate::piece::{ActivePiece, Direction, TetrominoKind};
use crate::resolve::{self, Resolution};
use crate::score::Scoreboard;
use crate::supply::PieceSupply;
use rand::Rng;
use rand::rngs::SmallRng;

#[derive(Debug)]
pub struct GameState<R = SmallRng> {
    pub board: Board,
    pub piece: Option<ActivePiece>,
    supply: PieceSupply<R>,
    pub scoreboard: Scoreboard,
    /// What the most recent landing did (for the sidebar and the flash).
    pub last_resolution: Resolution,
    pub landings: u32,
}

impl<R: Rng> GameState<R> {
    pub fn new(width: usize, height: usize, delay_ms: u64, rng: R) -> Self {
        let mut supply = PieceSupply::new(rng);
        let piece = Some(supply.spawn(width, height));
        Self {
            board: Board::new(width, height),
            piece,
            supply,
            scoreboard: Scoreboard::new(delay_ms),
            last_resolution: Resolution::default(),
            landings: 0,
        }
    }

    /// Empty the board and start over at `delay_ms`. The piece supply keeps
    /// its generator, so a seeded run does not replay the same pieces.
    pub fn restart(&mut self, delay_ms: u64) {
        self.board.reset();
        self.scoreboard = Scoreboard::new(delay_ms);
        self.last_resolution = Resolution::default();
        self.landings = 0;
        self.piece = Some(self.supply.spawn(self.board.width(), self.board.height()));
    }

    pub fn is_game_over(&self) -> bool {
        self.board.is_game_over()
    }

    pub fn score(&self) -> u64 {
        self.scoreboard.score()
    }

    pub fn delay_ms(&self) -> u64 {
        self.scoreboard.ramp.delay_ms()
    }

    pub fn next_kind(&self) -> Option<TetrominoKind> {
        self.supply.peek()
    }

    pub fn move_left(&mut self) -> bool {
        self.shift(Direction::Left)
    }

    pub fn move_right(&mut self) -> bool {
        self.shift(Direction::Right)
    }

    fn shift(&mut self, direction: Direction) -> bool {
        if self.is_game_over() {
            return false;
        }
        match self.piece.as_mut() {
            Some(piece) => piece.try_move(direction, &self.board),
            None => false,
        }
    }

    pub fn rotate(&mut self) -> bool {
        if self.is_game_over() {
            return false;
        }
        match self.piece.as_mut() {
            Some(piece) => piece.try_rotate(&self.board),
            None => false,
        }
    }

    /// One gravity step for the falling piece; lands it if it cannot move.
    /// Returns the landing's resolution when one happened.
    pub fn tick(&mut self) -> Result<Option<Resolution>, GridError> {
        if self.is_game_over() {
            return Ok(None);
        }
        let Some(piece) = self.piece.as_mut() else {
            return Ok(None);
        };
        if piece.try_move(Direction::Down, &self.board) {
            return Ok(None);
        }
        self.land().map(Some)
    }

    /// Player-requested extra step down.
    pub fn soft_drop(&mut self) -> Result<Option<Resolution>, GridError> {
        self.tick()
    }

    /// Write the piece into the board, resolve to quiescence, score, spawn.
    fn land(&mut self) -> Result<Resolution, GridError> {
        let Some(piece) = self.piece.take() else {
            return Ok(Resolution::default());
        };
        self.landings += 1;
        if self.board.place(piece.landed_tiles()) {
            glog!(
                "game over: {:?} landed above the top at {:?}, score {}",
                piece.kind,
                piece.anchor,
                self.score()
            );
        }

        let resolution = resolve::resolve_until_quiescent(&mut self.board)?;
        if self.scoreboard.award(resolution.points) {
            glog!(
                "speed up x{}: delay now {} ms",
                self.scoreboard.ramp.steps(),
                self.scoreboard.ramp.delay_ms()
            );
        }
        glog!(
            "landing {}: {:?} +{} pts, {} merges, {} rows, {} drops, {} rounds",
            self.landings,
            piece.kind,
            resolution.points,
            resolution.merges,
            resolution.rows_cleared,
            resolution.drops,
            resolution.rounds
        );

        if !self.is_game_over() {
            self.piece = Some(self.supply.spawn(self.board.width(), self.board.height()));
        }
        self.last_resolution = resolution.clone();
        Ok(resolution)
    }
}
