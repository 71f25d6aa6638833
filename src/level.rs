use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use crate::data::{MapCell, Pos, Symbol, DIRECTIONS};
use crate::map::Map;
use crate::parser::{self, ParserErr};
use crate::PuzzleState;

// Terminology:
// move = changing player position by one cell
// push = a move that changes a box position, player walks into the box
// pull = a move that changes a box position, player walks away and drags the box
// step = a move that doesn't change a box position

/// A snapshot of a puzzle: the shared static map plus the player and boxes.
///
/// States are never mutated in place, `neighbors` creates new ones.
#[derive(Clone)]
pub struct Level {
    map: Arc<Map>,
    player_pos: Pos,
    boxes: BTreeMap<String, Pos>,
    pull_moves: usize,
    explored_states: usize,
}

impl Level {
    pub fn new(map: Map, player_pos: Pos, boxes: Vec<Pos>) -> Self {
        let boxes = boxes
            .into_iter()
            .enumerate()
            .map(|(i, pos)| (format!("b{}", i), pos))
            .collect();
        Level {
            map: Arc::new(map),
            player_pos,
            boxes,
            pull_moves: 0,
            explored_states: 0,
        }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn has_box(&self, pos: Pos) -> bool {
        self.boxes.values().any(|&b| b == pos)
    }

    fn box_at(&self, pos: Pos) -> Option<&str> {
        self.boxes
            .iter()
            .find(|&(_, &b)| b == pos)
            .map(|(name, _)| name.as_str())
    }

    fn is_free(&self, pos: Pos) -> bool {
        !self.map.is_wall(pos) && !self.has_box(pos)
    }

    fn child(&self, player_pos: Pos, moved_box: Option<(&str, Pos)>, is_pull: bool) -> Level {
        let mut boxes = self.boxes.clone();
        if let Some((name, dest)) = moved_box {
            boxes.insert(name.to_owned(), dest);
        }
        Level {
            map: Arc::clone(&self.map),
            player_pos,
            boxes,
            pull_moves: self.pull_moves + if is_pull { 1 } else { 0 },
            explored_states: self.explored_states,
        }
    }

    fn expand(&self) -> Vec<Level> {
        let mut new_states = Vec::new();

        // steps and pushes
        for &dir in &DIRECTIONS {
            let new_player_pos = self.player_pos + dir;
            if self.map.is_wall(new_player_pos) {
                continue;
            }
            match self.box_at(new_player_pos) {
                None => new_states.push(self.child(new_player_pos, None, false)),
                Some(name) => {
                    let push_dest = new_player_pos + dir;
                    if self.is_free(push_dest) {
                        new_states.push(self.child(new_player_pos, Some((name, push_dest)), false));
                    }
                }
            }
        }

        // pulls - the box behind the player follows
        for &dir in &DIRECTIONS {
            let new_player_pos = self.player_pos + dir;
            if !self.is_free(new_player_pos) {
                continue;
            }
            if let Some(name) = self.box_at(self.player_pos - dir) {
                new_states.push(self.child(new_player_pos, Some((name, self.player_pos)), true));
            }
        }

        let explored = self.explored_states + new_states.len();
        for state in &mut new_states {
            state.explored_states = explored;
        }
        new_states
    }
}

impl PuzzleState for Level {
    type DecodeErr = ParserErr;

    fn is_solved(&self) -> bool {
        // all boxes on a goal, equal counts are guaranteed by the parser
        self.boxes
            .values()
            .all(|&b| self.map.grid[b] == MapCell::Goal)
    }

    fn neighbors(&self) -> Vec<Self> {
        self.expand()
    }

    fn encode(&self) -> String {
        self.map.xsb_with(self.player_pos, self.boxes.values())
    }

    fn decode(encoded: &str) -> Result<Self, Self::DecodeErr> {
        parser::parse(encoded)
    }

    fn explored_states(&self) -> usize {
        self.explored_states
    }

    fn pull_moves(&self) -> usize {
        self.pull_moves
    }

    fn rows(&self) -> usize {
        self.map.grid.rows()
    }

    fn cols(&self) -> usize {
        self.map.grid.cols()
    }

    fn symbol(&self, pos: Pos) -> Symbol {
        if self.map.is_wall(pos) {
            Symbol::Obstacle
        } else if self.has_box(pos) {
            Symbol::Box
        } else if pos == self.player_pos {
            Symbol::Player
        } else if self.map.grid[pos] == MapCell::Goal {
            Symbol::Target
        } else {
            Symbol::Free
        }
    }

    fn player_pos(&self) -> Pos {
        self.player_pos
    }

    fn boxes(&self) -> &BTreeMap<String, Pos> {
        &self.boxes
    }

    fn targets(&self) -> &[Pos] {
        &self.map.goals
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }
}

impl Eq for Level {}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl Debug for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
