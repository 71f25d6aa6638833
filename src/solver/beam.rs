//! Stochastic beam search.
//!
//! Every iteration expands the whole beam, deduplicates the children
//! and samples the next beam with probabilities favoring lower heuristic cost.

use std::time::Instant;

use fnv::FnvHashSet;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::Rng;

use crate::solution::Solution;
use crate::solver::{ConfigErr, Search, Solver};
use crate::PuzzleState;

#[derive(Debug)]
pub struct BeamSearch<S> {
    base: Solver<S>,
    width: usize,
    rng: StdRng,
}

impl<S> BeamSearch<S> {
    pub fn new(base: Solver<S>, width: usize, rng: StdRng) -> Result<Self, ConfigErr> {
        if width == 0 {
            return Err(ConfigErr::ZeroBeamWidth);
        }
        Ok(BeamSearch { base, width, rng })
    }
}

struct Entry<S> {
    steps: Vec<String>,
    state: S,
}

impl<S: PuzzleState> Search<S> for BeamSearch<S> {
    fn solve(&mut self, initial_state: &S) -> Solution<S> {
        let started = Instant::now();

        let mut beam = vec![Entry {
            steps: Vec::new(),
            state: initial_state.clone(),
        }];
        let mut explored = 0;
        // what gets returned if nothing is solved in time
        let mut last_steps = vec![initial_state.encode()];
        let mut last_pulls = initial_state.pull_moves();

        for iter in 0..self.base.max_iters() {
            if self.base.cancelled() {
                debug!("Beam search cancelled after {} iterations", iter);
                break;
            }
            debug_assert!(beam.len() <= self.width);

            let beam_len = beam.len();
            let mut seen = FnvHashSet::default();
            let mut candidates = Vec::new();
            for (idx, Entry { mut steps, state }) in beam.into_iter().enumerate() {
                steps.push(state.encode());
                if state.is_solved() {
                    debug!("Beam search solved in {} iterations", iter + 1);
                    return Solution::new(
                        steps,
                        explored + idx,
                        started.elapsed(),
                        state.pull_moves(),
                    );
                }

                for child in self.base.expand(&state) {
                    if seen.insert(child.encode()) {
                        candidates.push(Entry {
                            steps: steps.clone(),
                            state: child,
                        });
                    }
                }

                last_steps = steps;
                last_pulls = state.pull_moves();
            }
            explored += beam_len;

            if candidates.is_empty() {
                debug!("Beam ran out of states after {} iterations", iter + 1);
                break;
            }

            let costs: Vec<u32> = candidates
                .iter()
                .map(|c| self.base.heuristic(&c.state))
                .collect();
            trace!(
                "Iteration {}: {} candidates, best cost {}",
                iter,
                candidates.len(),
                costs.iter().min().cloned().unwrap_or(0)
            );
            let weights = softmax_neg(&costs);
            let count = self.width.min(candidates.len());
            let picked = sample_without_replacement(&mut self.rng, &weights, count);

            let mut candidates: Vec<_> = candidates.into_iter().map(Some).collect();
            beam = picked
                .into_iter()
                .filter_map(|i| candidates[i].take())
                .collect();
        }

        debug!("Beam search gave up, explored {} states", explored);
        Solution::new(last_steps, explored, started.elapsed(), last_pulls)
    }
}

/// Softmax of the negated costs.
///
/// Shifted by the smallest cost so the largest exponent is 0,
/// the result is the same distribution but nothing overflows.
pub(crate) fn softmax_neg(costs: &[u32]) -> Vec<f64> {
    let min = match costs.iter().min() {
        Some(&min) => f64::from(min),
        None => return Vec::new(),
    };
    let exps: Vec<f64> = costs.iter().map(|&c| (min - f64::from(c)).exp()).collect();
    // at least one term is exactly 1
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Draws `count` distinct indices, each with probability proportional to its weight
/// among the ones not drawn yet.
///
/// Once only zero weights are left the rest is drawn uniformly.
pub(crate) fn sample_without_replacement(
    rng: &mut StdRng,
    weights: &[f64],
    count: usize,
) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..weights.len()).collect();
    let mut picked = Vec::with_capacity(count);

    while picked.len() < count && !remaining.is_empty() {
        let total: f64 = remaining.iter().map(|&i| weights[i]).sum();
        let chosen = if total > 0.0 {
            let mut x = rng.gen::<f64>() * total;
            let mut chosen = None;
            for (j, &i) in remaining.iter().enumerate() {
                if weights[i] > 0.0 {
                    // rounding might leave x slightly above the sum, fall back to the last positive one
                    chosen = Some(j);
                    if x < weights[i] {
                        break;
                    }
                    x -= weights[i];
                }
            }
            chosen.unwrap_or(0)
        } else {
            rng.gen_range(0..remaining.len())
        };
        picked.push(remaining.remove(chosen));
    }

    picked
}
