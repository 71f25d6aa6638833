// Opt in to warnings about new 2018 idioms
#![warn(rust_2018_idioms)]
// Additional warnings that are allow by default (`rustc -W help`)
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unused)]

pub mod config;
pub mod data;
pub mod level;
pub mod map;
pub mod solution;
pub mod solver;
pub mod vec2d;

mod fs;
mod parser;

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Debug;

use crate::data::{Pos, Symbol};
use crate::vec2d::Vec2d;

pub use crate::level::Level;
pub use crate::parser::ParserErr;
pub use crate::solution::{Recovery, Solution, SolutionStats};

/// What the searches need to know about a puzzle.
///
/// Implementors are immutable snapshots - `neighbors` returns new states.
pub trait PuzzleState: Clone {
    type DecodeErr: Debug;

    fn is_solved(&self) -> bool;

    /// Successor states in a stable order.
    fn neighbors(&self) -> Vec<Self>;

    /// Two states are the same for the searches iff their encodings are equal.
    fn encode(&self) -> String;

    fn decode(encoded: &str) -> Result<Self, Self::DecodeErr>;

    /// How many states the generation machinery produced before this one.
    fn explored_states(&self) -> usize;

    fn pull_moves(&self) -> usize;

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Everything outside the grid counts as an obstacle.
    fn symbol(&self, pos: Pos) -> Symbol;

    fn player_pos(&self) -> Pos;

    /// Box name -> position.
    fn boxes(&self) -> &BTreeMap<String, Pos>;

    fn targets(&self) -> &[Pos];

    fn box_positions(&self) -> Vec<Pos> {
        self.boxes().values().cloned().collect()
    }

    /// `symbol` of every cell in the grid.
    fn symbols(&self) -> Vec2d<Symbol> {
        let grid = (0..self.rows())
            .map(|r| (0..self.cols()).map(|c| self.symbol(Pos::new(r, c))).collect())
            .collect();
        Vec2d::new(grid, Symbol::Obstacle)
    }
}

pub trait LoadLevel {
    fn load_level(&self) -> Result<Level, Box<dyn Error>>;
}
