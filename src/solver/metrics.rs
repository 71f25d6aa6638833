//! Breadth-first distance fields over the level grid.
//!
//! All of these flood fill level by level from their sources into a field
//! initialized to `WALL_COST`, so cells that can't be reached keep the sentinel.

use std::collections::VecDeque;
use std::ops::Deref;

use crate::data::{Pos, Symbol, DIRECTIONS, WALL_COST};
use crate::vec2d::Vec2d;
use crate::PuzzleState;

/// Multi-source BFS where a cell can be entered unless its symbol is in `impassable`.
///
/// With `restrict_pushes` the cell one further step in the same direction
/// must be enterable too - that's where the box would end up if it was pushed.
/// Running it from targets this way gives the number of pushes needed
/// to get a box from any cell to the closest source.
pub fn distance_matrix<S: PuzzleState>(
    level: &S,
    sources: &[Pos],
    impassable: &[Symbol],
    restrict_pushes: bool,
) -> Vec2d<u32> {
    let symbols = level.symbols();
    let passable = |pos: Pos| match symbols.get(pos) {
        None => false,
        Some(symbol) => !impassable.contains(symbol),
    };

    let mut distances = symbols.scratchpad_with_default(WALL_COST);
    let mut to_visit = VecDeque::new();
    for &src in sources {
        distances[src] = 0;
        to_visit.push_back(src);
    }

    while let Some(cur) = to_visit.pop_front() {
        let next_dist = distances[cur] + 1;
        for &dir in &DIRECTIONS {
            let next = cur + dir;
            if !passable(next) {
                continue;
            }
            if restrict_pushes && !passable(next + dir) {
                continue;
            }
            if distances[next] > next_dist {
                distances[next] = next_dist;
                to_visit.push_back(next);
            }
        }
    }

    distances
}

/// Cells the player can walk to without moving any box.
pub fn reachable_positions<S: PuzzleState>(level: &S) -> Vec2d<bool> {
    let symbols = level.symbols();
    let mut reachable = symbols.scratchpad_with_default(false);

    let start = level.player_pos();
    reachable[start] = true;
    let mut to_visit = VecDeque::new();
    to_visit.push_back(start);

    while let Some(cur) = to_visit.pop_front() {
        for &next in &cur.neighbors() {
            match symbols.get(next) {
                None | Some(Symbol::Obstacle) | Some(Symbol::Box) => continue,
                Some(_) => {}
            }
            if !reachable[next] {
                reachable[next] = true;
                to_visit.push_back(next);
            }
        }
    }

    reachable
}

/// Sets one cell for as long as it's alive, the old value is put back on drop.
struct Flagged<'a> {
    grid: &'a mut Vec2d<bool>,
    pos: Pos,
    old: bool,
}

impl<'a> Flagged<'a> {
    fn new(grid: &'a mut Vec2d<bool>, pos: Pos) -> Self {
        let old = grid[pos];
        grid[pos] = true;
        Flagged { grid, pos, old }
    }
}

impl Deref for Flagged<'_> {
    type Target = Vec2d<bool>;

    fn deref(&self) -> &Self::Target {
        self.grid
    }
}

impl Drop for Flagged<'_> {
    fn drop(&mut self) {
        self.grid[self.pos] = self.old;
    }
}

/// BFS of pushes fanning out from `box_pos`.
///
/// Pushing from `cur` to `cur + dir` needs the destination to not be a wall
/// and the player to be able to stand at `cur - dir` according to `reachable`.
/// The box's own cell counts as reachable while this runs (the player can step
/// there after the first push), `reachable` is left unchanged afterwards.
pub fn reachable_push_distance<S: PuzzleState>(
    level: &S,
    box_pos: Pos,
    reachable: &mut Vec2d<bool>,
) -> Vec2d<u32> {
    let reachable = Flagged::new(reachable, box_pos);

    let mut distances = reachable.scratchpad_with_default(WALL_COST);
    distances[box_pos] = 0;
    let mut to_visit = VecDeque::new();
    to_visit.push_back(box_pos);

    while let Some(cur) = to_visit.pop_front() {
        let next_dist = distances[cur] + 1;
        for &dir in &DIRECTIONS {
            let dest = cur + dir;
            let player_pos = cur - dir;
            if level.symbol(dest) == Symbol::Obstacle || !reachable.get(player_pos).cloned().unwrap_or(false) {
                continue;
            }
            if distances[dest] > next_dist {
                distances[dest] = next_dist;
                to_visit.push_back(dest);
            }
        }
    }

    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::level::Level;

    fn level(s: &str) -> Level {
        s.parse().unwrap()
    }

    #[test]
    fn single_source_distances() {
        let level = level(
            r"
#######
#@   ##
# ## $#
#    .#
#######
",
        );
        let src = Pos::new(1, 1);
        let distances = distance_matrix(&level, &[src], &[Symbol::Obstacle], false);
        let expected = r"
100 100 100 100 100 100 100
100   0   1   2   3 100 100
100   1 100 100   4   5 100
100   2   3   4   5   6 100
100 100 100 100 100 100 100
"
        .trim_start_matches('\n');
        assert_eq!(distances.to_string(), expected);

        // monotonic along shortest paths - every reached non-source cell has a neighbor one closer
        for pos in distances.positions() {
            let d = distances[pos];
            if d == 0 || d == WALL_COST {
                continue;
            }
            assert!(pos.neighbors().iter().any(|&n| distances[n] == d - 1));
        }
    }

    #[test]
    fn boxes_can_block() {
        let level = level(
            r"
#######
#@ $ .#
#######
",
        );
        let distances = distance_matrix(
            &level,
            &[level.player_pos()],
            &[Symbol::Obstacle, Symbol::Box],
            false,
        );
        assert_eq!(distances[Pos::new(1, 2)], 1);
        assert_eq!(distances[Pos::new(1, 3)], WALL_COST);
        assert_eq!(distances[Pos::new(1, 5)], WALL_COST);
    }

    #[test]
    fn push_restricted_from_target() {
        let level = level(
            r"
########
#@$   .#
########
",
        );
        let distances = distance_matrix(&level, &[Pos::new(1, 6)], &[Symbol::Obstacle], true);
        let row: Vec<_> = (0..8).map(|c| distances[Pos::new(1, c)]).collect();
        // the cell next to the left wall can't be pushed out of
        assert_eq!(row, vec![100, 100, 4, 3, 2, 1, 0, 100]);
    }

    #[test]
    fn multiple_sources() {
        let level = level(
            r"
#########
#.  @  .#
#$     $#
#########
",
        );
        let distances = distance_matrix(&level, level.targets(), &[Symbol::Obstacle], false);
        assert_eq!(distances[Pos::new(1, 1)], 0);
        assert_eq!(distances[Pos::new(1, 4)], 3);
        assert_eq!(distances[Pos::new(2, 4)], 4);
        assert_eq!(distances[Pos::new(1, 7)], 0);
    }

    #[test]
    fn reachability() {
        let level = level(
            r"
#######
#@ $  #
#  #$.#
###.###
",
        );
        let reachable = reachable_positions(&level);
        assert!(reachable[Pos::new(1, 1)]);
        assert!(reachable[Pos::new(2, 2)]);
        assert!(!reachable[Pos::new(1, 3)]); // box
        assert!(!reachable[Pos::new(1, 4)]); // behind the box
        assert!(!reachable[Pos::new(0, 0)]);
        assert_eq!(reachable, reachable_positions(&level));
    }

    #[test]
    fn reachable_pushes() {
        let level = level(
            r"
#######
#  @  #
# $   #
#   . #
#######
",
        );
        let box_pos = Pos::new(2, 2);
        let mut reachable = reachable_positions(&level);
        let before = reachable.clone();
        let distances = reachable_push_distance(&level, box_pos, &mut reachable);
        assert_eq!(reachable, before);
        assert!(!reachable[box_pos]);

        assert_eq!(distances[box_pos], 0);
        assert_eq!(distances[Pos::new(3, 2)], 1); // pushed down from above
        assert_eq!(distances[Pos::new(2, 3)], 1);
        assert_eq!(distances[Pos::new(3, 4)], 3);
        // can't push into walls
        assert_eq!(distances[Pos::new(0, 2)], WALL_COST);
    }

    #[test]
    fn reachable_pushes_need_player_room() {
        let level = level(
            r"
#####
#@$.#
#####
",
        );
        let mut reachable = reachable_positions(&level);
        let distances = reachable_push_distance(&level, Pos::new(1, 2), &mut reachable);
        assert_eq!(distances[Pos::new(1, 3)], 1);
        // would need the player to stand in the wall
        assert_eq!(distances[Pos::new(1, 1)], WALL_COST);
    }
}
