use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::data::{MapCell, Pos};
use crate::level::Level;
use crate::map::Map;
use crate::vec2d::Vec2d;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserErr {
    Pos(usize, usize),
    Empty,
    MultiplePlayers,
    NoPlayer,
    BoxesGoals(usize, usize),
}

impl Display for ParserErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            ParserErr::Pos(r, c) => write!(f, "Invalid cell at pos: [{}, {}]", r, c),
            ParserErr::Empty => write!(f, "Empty level"),
            ParserErr::MultiplePlayers => write!(f, "More than one player"),
            ParserErr::NoPlayer => write!(f, "No player"),
            ParserErr::BoxesGoals(boxes, goals) => write!(
                f,
                "Different number of boxes ({}) and goals ({})",
                boxes, goals
            ),
        }
    }
}

impl Error for ParserErr {}

impl FromStr for Level {
    type Err = ParserErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parses (a subset of) the format described [here](http://www.sokobano.de/wiki/index.php?title=Level_format)
pub(crate) fn parse(level: &str) -> Result<Level, ParserErr> {
    // trim so we can specify levels using raw strings more easily
    let level = level.trim_matches('\n').trim_end();
    if level.is_empty() {
        return Err(ParserErr::Empty);
    }

    let mut grid = Vec::new();
    let mut goals = Vec::new();
    let mut boxes = Vec::new();
    let mut player_pos = None;

    for (r, line) in level.lines().enumerate() {
        let mut line_tiles = Vec::new();
        for (c, cur_char) in line.chars().enumerate() {
            let pos = Pos::new(r, c);

            let tile = match cur_char {
                '#' => MapCell::Wall,
                ' ' | '-' | '_' => MapCell::Empty,
                '.' => {
                    goals.push(pos);
                    MapCell::Goal
                }
                '$' | 'b' => {
                    boxes.push(pos);
                    MapCell::Empty
                }
                '*' | 'B' => {
                    boxes.push(pos);
                    goals.push(pos);
                    MapCell::Goal
                }
                '@' | 'p' | '+' | 'P' => {
                    if player_pos.is_some() {
                        return Err(ParserErr::MultiplePlayers);
                    }
                    player_pos = Some(pos);
                    if cur_char == '+' || cur_char == 'P' {
                        goals.push(pos);
                        MapCell::Goal
                    } else {
                        MapCell::Empty
                    }
                }
                _ => return Err(ParserErr::Pos(r, c)),
            };
            line_tiles.push(tile);
        }
        grid.push(line_tiles);
    }

    let player_pos = player_pos.ok_or(ParserErr::NoPlayer)?;
    if boxes.len() != goals.len() {
        return Err(ParserErr::BoxesGoals(boxes.len(), goals.len()));
    }

    let map = Map::new(Vec2d::new(grid, MapCell::Empty), goals);
    Ok(Level::new(map, player_pos, boxes))
}
