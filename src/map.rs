use std::fmt::{self, Debug, Display, Formatter};

use crate::data::{MapCell, Pos};
use crate::vec2d::Vec2d;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contents {
    Empty,
    Box,
    Player,
}

/// The parts of a level that never change during search.
#[derive(Clone, PartialEq, Eq)]
pub struct Map {
    pub grid: Vec2d<MapCell>,
    pub goals: Vec<Pos>,
}

impl Map {
    pub fn new(grid: Vec2d<MapCell>, goals: Vec<Pos>) -> Self {
        Map { grid, goals }
    }

    pub fn is_wall(&self, pos: Pos) -> bool {
        match self.grid.get(pos) {
            None | Some(MapCell::Wall) => true,
            Some(_) => false,
        }
    }

    /// XSB rendering of the map with the given player and boxes on it.
    ///
    /// Every row is written in full (trailing floor included) so the output
    /// of two states of the same map only differs where the states differ.
    pub fn xsb_with<'a, I>(&self, player_pos: Pos, boxes: I) -> String
    where
        I: IntoIterator<Item = &'a Pos>,
    {
        let mut contents = self.grid.scratchpad_with_default(Contents::Empty);
        for &b in boxes {
            contents[b] = Contents::Box;
        }
        contents[player_pos] = Contents::Player;

        let mut ret = String::with_capacity((self.grid.cols() + 1) * self.grid.rows());
        for r in 0..self.grid.rows() {
            for c in 0..self.grid.cols() {
                let pos = Pos::new(r, c);
                ret.push(Self::xsb_char(self.grid[pos], contents[pos]));
            }
            ret.push('\n');
        }
        ret
    }

    fn xsb_char(cell: MapCell, contents: Contents) -> char {
        match (cell, contents) {
            (MapCell::Wall, Contents::Empty) => '#',
            (MapCell::Wall, _) => unreachable!("wall with contents"),
            (MapCell::Empty, Contents::Empty) => ' ',
            (MapCell::Empty, Contents::Box) => '$',
            (MapCell::Empty, Contents::Player) => '@',
            (MapCell::Goal, Contents::Empty) => '.',
            (MapCell::Goal, Contents::Box) => '*',
            (MapCell::Goal, Contents::Player) => '+',
        }
    }
}

impl Display for Map {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for r in 0..self.grid.rows() {
            for c in 0..self.grid.cols() {
                let cell = self.grid[Pos::new(r, c)];
                write!(f, "{}", Self::xsb_char(cell, Contents::Empty))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Debug for Map {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use crate::level::Level;

    #[test]
    fn formatting_map() {
        let xsb_level = r"
*###*
#@$.#
*###*#
"
        .trim_start_matches('\n');
        // the `\n\` is necessary because editors remove trailing whitespace
        let xsb_map = "
.###. \n\
#  .# \n\
.###.#
"
        .trim_start_matches('\n');

        let level: Level = xsb_level.parse().unwrap();
        assert_eq!(format!("{}", level.map()), xsb_map);
        assert_eq!(format!("{:?}", level.map()), xsb_map);
    }
}
