//! Estimates of the remaining pushes, less is better.
//!
//! The assignment based ones build a boxes x targets matrix of push distances
//! and take the cheapest perfect matching. That ignores boxes blocking each other
//! so it never overestimates (unreachable pairs cost `WALL_COST` which makes hopeless
//! states look very expensive rather than crashing the search).

use pathfinding::prelude::{kuhn_munkres_min, Matrix};

use crate::data::Symbol;
use crate::solver::metrics::{distance_matrix, reachable_positions, reachable_push_distance};
use crate::PuzzleState;

/// Sum of the minimum weight perfect matching of a square cost matrix.
///
/// Panics if the matrix isn't square - that means the level has a different number
/// of boxes and targets which the parser rejects.
pub fn min_cost_matching(costs: &[Vec<u32>]) -> u32 {
    if costs.is_empty() {
        return 0;
    }
    assert!(
        costs.iter().all(|row| row.len() == costs.len()),
        "Matching needs the same number of boxes and targets"
    );

    let weights = Matrix::from_rows(
        costs
            .iter()
            .map(|row| row.iter().map(|&c| i64::from(c)).collect::<Vec<_>>()),
    )
    .expect("All rows have the same length");
    let (total, _assignment) = kuhn_munkres_min(&weights);
    total as u32
}

/// Cheapest assignment of boxes to targets where each pair costs the number
/// of pushes needed if the box was alone on the map.
pub fn boxes_to_targets_min_cost<S: PuzzleState>(level: &S) -> u32 {
    let boxes = level.box_positions();
    let targets = level.targets();

    let mut costs = vec![vec![0; targets.len()]; boxes.len()];
    for (j, &target) in targets.iter().enumerate() {
        let distances = distance_matrix(level, &[target], &[Symbol::Obstacle], true);
        for (i, &b) in boxes.iter().enumerate() {
            costs[i][j] = distances[b];
        }
    }

    min_cost_matching(&costs)
}

/// Like `boxes_to_targets_min_cost` but each push also needs the player to be able
/// to get behind the box without moving any other box.
pub fn boxes_to_targets_reachable_cost<S: PuzzleState>(level: &S) -> u32 {
    let boxes = level.box_positions();
    let targets = level.targets();
    let mut reachable = reachable_positions(level);

    let mut costs = Vec::with_capacity(boxes.len());
    for &b in &boxes {
        let distances = reachable_push_distance(level, b, &mut reachable);
        costs.push(targets.iter().map(|&t| distances[t]).collect());
    }

    min_cost_matching(&costs)
}

/// `boxes_to_targets_min_cost` plus the walk from the player to the closest box.
pub fn player_plus_boxes_cost<S: PuzzleState>(level: &S) -> u32 {
    let player_distances = distance_matrix(
        level,
        &[level.player_pos()],
        &[Symbol::Obstacle],
        false,
    );
    let closest_box = level
        .boxes()
        .values()
        .map(|&b| player_distances[b])
        .min()
        .unwrap_or(0);

    closest_box + boxes_to_targets_min_cost(level)
}

/// Sum of manhattan distances from each box to its closest target, walls are ignored.
pub fn manhattan_lower_bound<S: PuzzleState>(level: &S) -> u32 {
    let mut goal_dist_sum = 0;
    for &box_pos in level.boxes().values() {
        goal_dist_sum += level
            .targets()
            .iter()
            .map(|&target| box_pos.dist(target))
            .min()
            .unwrap_or(0);
    }
    goal_dist_sum
}

/// Number of targets without a box.
pub fn unplaced_box_count<S: PuzzleState>(level: &S) -> u32 {
    level
        .targets()
        .iter()
        .filter(|&&target| level.symbol(target) != Symbol::Box)
        .count() as u32
}
