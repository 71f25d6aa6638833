//! Learning real-time A*.
//!
//! The search commits to one move per iteration and learns better cost estimates
//! for the states it leaves behind. Plain LRTA* tends to wander around plateaus
//! so there are two ways of getting unstuck, see `Stagnation`.

use std::time::Instant;

use fnv::FnvHashMap;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::solution::{Recovery, Solution};
use crate::solver::{ConfigErr, Search, Solver};
use crate::PuzzleState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffParams {
    /// How far back the first backoff goes.
    pub steps: usize,
    /// Added to the distance after each backoff.
    pub step_increment: usize,
    /// The chance of staying on a plateau is multiplied by this
    /// every time the search decides to stay. 1.0 means never back off.
    pub probability_factor: f64,
    /// Steps without improvement before backing off is considered.
    pub plateau_threshold: usize,
}

impl Default for BackoffParams {
    fn default() -> Self {
        BackoffParams {
            steps: 10,
            step_increment: 10,
            probability_factor: 1.0,
            plateau_threshold: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartParams {
    /// Steps without improvement after which the attempt is abandoned.
    pub threshold: usize,
    pub max_restarts: usize,
    /// Extra attempts after the first success, the shortest solution wins.
    pub enhancements: usize,
}

impl Default for RestartParams {
    fn default() -> Self {
        RestartParams {
            threshold: 20,
            max_restarts: 10,
            enhancements: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stagnation {
    /// Rewind part of the trajectory, further each time.
    Backoff(BackoffParams),
    /// Start over from the initial state but keep what was learned.
    Restart(RestartParams),
}

/// Learned cost estimates keyed by state encoding.
///
/// Missing entries are filled in with the heuristic on first lookup.
#[derive(Debug, Clone, Default)]
pub struct CostTable {
    costs: FnvHashMap<String, u32>,
}

impl CostTable {
    pub fn estimate<S>(&mut self, base: &Solver<S>, state: &S) -> u32
    where
        S: PuzzleState,
    {
        *self
            .costs
            .entry(state.encode())
            .or_insert_with(|| base.heuristic(state))
    }

    pub fn update(&mut self, encoded: String, cost: u32) {
        self.costs.insert(encoded, cost);
    }

    pub fn get(&self, encoded: &str) -> Option<u32> {
        self.costs.get(encoded).cloned()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn clear(&mut self) {
        self.costs.clear();
    }
}

/// One LRTA* move.
///
/// Picks uniformly among the neighbors with the lowest `1 + learned cost`
/// and raises the chosen neighbor's learned cost to that value.
/// Returns the neighbor and the cost or `None` in a dead end.
pub(crate) fn advance<S: PuzzleState>(
    base: &Solver<S>,
    table: &mut CostTable,
    rng: &mut StdRng,
    state: &S,
) -> Option<(S, u32)> {
    let neighbors = base.expand(state);
    let lookahead: Vec<u32> = neighbors
        .iter()
        .map(|n| table.estimate(base, n).saturating_add(1))
        .collect();
    let min_cost = *lookahead.iter().min()?;

    let best: Vec<usize> = (0..neighbors.len())
        .filter(|&i| lookahead[i] == min_cost)
        .collect();
    let chosen = *best.choose(rng)?;
    let next = neighbors.into_iter().nth(chosen)?;

    table.update(next.encode(), min_cost);
    Some((next, min_cost))
}

#[derive(Debug)]
pub struct Lrta<S> {
    base: Solver<S>,
    stagnation: Stagnation,
    rng: StdRng,
    table: CostTable,
}

impl<S> Lrta<S> {
    pub fn new(base: Solver<S>, stagnation: Stagnation, rng: StdRng) -> Result<Self, ConfigErr> {
        match stagnation {
            Stagnation::Backoff(params) => {
                if params.steps == 0 {
                    return Err(ConfigErr::ZeroBackoff);
                }
                if params.plateau_threshold == 0 {
                    return Err(ConfigErr::ZeroPlateau);
                }
                let p = params.probability_factor;
                if !(0.0..=1.0).contains(&p) {
                    return Err(ConfigErr::InvalidProbability(p));
                }
            }
            Stagnation::Restart(params) => {
                if params.threshold == 0 {
                    return Err(ConfigErr::ZeroPlateau);
                }
                if params.max_restarts == 0 {
                    return Err(ConfigErr::ZeroRestarts);
                }
            }
        }
        Ok(Lrta {
            base,
            stagnation,
            rng,
            table: CostTable::default(),
        })
    }

    /// What the last `solve` learned.
    pub fn learned_costs(&self) -> &CostTable {
        &self.table
    }
}

impl<S: PuzzleState> Search<S> for Lrta<S> {
    fn solve(&mut self, initial_state: &S) -> Solution<S> {
        self.table.clear();
        match self.stagnation {
            Stagnation::Backoff(params) => self.solve_backoff(initial_state, params),
            Stagnation::Restart(params) => self.solve_restart(initial_state, params),
        }
    }
}

/// How far the next backoff goes.
#[derive(Debug, Clone, Copy)]
struct Rewind {
    start: usize,
    increment: usize,
    distance: usize,
}

impl Rewind {
    fn new(params: &BackoffParams) -> Self {
        Rewind {
            start: params.steps,
            increment: params.step_increment,
            distance: params.steps,
        }
    }

    /// Drops up to `distance` states from the end of the trajectory and takes out the one
    /// to continue from. Going all the way back restarts from `initial_state`
    /// and the distance starts over.
    ///
    /// Returns the state and how many states were dropped.
    fn apply<T: Clone>(&mut self, steps: &mut Vec<T>, initial_state: &T) -> (T, usize) {
        let steps_back = self.distance.min(steps.len());
        steps.truncate(steps.len() - steps_back);
        self.distance += self.increment;

        let state = match steps.pop() {
            Some(prev) => prev,
            None => {
                self.distance = self.start;
                initial_state.clone()
            }
        };
        (state, steps_back)
    }
}

/// How a single restart attempt ended.
struct Attempt<S> {
    steps: Vec<S>,
    solved: bool,
}

impl<S: PuzzleState> Lrta<S> {
    fn solve_backoff(&mut self, initial_state: &S, params: BackoffParams) -> Solution<S> {
        let started = Instant::now();

        let mut steps: Vec<S> = Vec::new();
        let mut state = initial_state.clone();
        // rewound states were explored too even though they're no longer in the trajectory
        let mut extra_explored = 0;
        let mut backoffs = 0;

        let mut best_seen = self.base.heuristic(&state);
        let mut rewind = Rewind::new(&params);
        let mut chance_of_remaining = 1.0;
        let mut no_improvement = 0;

        for iter in 0..self.base.max_iters() {
            if self.base.cancelled() {
                debug!("LRTA* cancelled after {} iterations", iter);
                break;
            }

            steps.push(state.clone());
            if state.is_solved() {
                debug!("LRTA* solved in {} iterations, {} backoffs", iter + 1, backoffs);
                break;
            }

            let next = advance(&self.base, &mut self.table, &mut self.rng, &state);
            let stuck = match next {
                None => true,
                Some((_, min_cost)) if min_cost >= best_seen => {
                    no_improvement += 1;
                    if no_improvement <= params.plateau_threshold {
                        false
                    } else if self.rng.gen::<f64>() > chance_of_remaining {
                        true
                    } else {
                        chance_of_remaining *= params.probability_factor;
                        false
                    }
                }
                Some((_, min_cost)) => {
                    best_seen = min_cost;
                    chance_of_remaining = 1.0;
                    no_improvement = 0;
                    false
                }
            };

            if stuck {
                let (prev, steps_back) = rewind.apply(&mut steps, initial_state);
                state = prev;
                extra_explored += steps_back;
                backoffs += 1;
                trace!("Backed off {} steps to {} states", steps_back, steps.len() + 1);

                best_seen = self.base.heuristic(&state);
                chance_of_remaining = 1.0;
                no_improvement = 0;
                continue;
            }

            if let Some((next, _)) = next {
                state = next;
            }
        }

        // after a backoff or cancellation the current state isn't in the trajectory yet
        let current = state.encode();
        let mut steps = encode_all(&steps);
        if steps.last() != Some(&current) {
            steps.push(current);
        }

        let explored = extra_explored + state.explored_states();
        let pulls = state.pull_moves();
        Solution::new(steps, explored, started.elapsed(), pulls)
            .with_recovery(Recovery::Backoffs(backoffs))
    }

    fn solve_restart(&mut self, initial_state: &S, params: RestartParams) -> Solution<S> {
        let started = Instant::now();

        let mut explored = 0;
        let mut attempts = 0;
        let mut failures = 0;
        let mut successes = 0;
        let mut best_solved: Option<Vec<S>> = None;
        let mut best_failed: Option<(u32, Vec<S>)> = None;

        loop {
            let attempt = self.attempt(initial_state, params.threshold);
            attempts += 1;
            if let Some(last) = attempt.steps.last() {
                explored += last.explored_states();
            }

            if attempt.solved {
                successes += 1;
                debug!(
                    "Attempt {} solved in {} steps",
                    attempts,
                    attempt.steps.len()
                );
                let shorter = best_solved
                    .as_ref()
                    .map_or(true, |best| attempt.steps.len() < best.len());
                if shorter {
                    best_solved = Some(attempt.steps);
                }
            } else {
                failures += 1;
                let cost = attempt
                    .steps
                    .last()
                    .map_or(u32::max_value(), |s| self.base.heuristic(s));
                let better = best_failed.as_ref().map_or(true, |(best_cost, best)| {
                    (cost, attempt.steps.len()) < (*best_cost, best.len())
                });
                if better {
                    best_failed = Some((cost, attempt.steps));
                }
            }

            if successes > params.enhancements {
                break;
            }
            if failures > params.max_restarts {
                debug!("LRTA* out of restarts");
                break;
            }
            if self.base.cancelled() {
                debug!("LRTA* cancelled after {} attempts", attempts);
                break;
            }
        }

        // an attempt cancelled before its first step has nothing to show
        let steps = best_solved
            .or_else(|| best_failed.map(|(_, steps)| steps))
            .filter(|steps| !steps.is_empty())
            .unwrap_or_else(|| vec![initial_state.clone()]);
        let pulls = steps.last().map_or(0, |s| s.pull_moves());
        Solution::new(encode_all(&steps), explored, started.elapsed(), pulls)
            .with_recovery(Recovery::Restarts(attempts - 1))
    }

    /// Walks from the initial state until it's solved, stops improving for `threshold` steps,
    /// hits a dead end or runs out of iterations.
    fn attempt(&mut self, initial_state: &S, threshold: usize) -> Attempt<S> {
        let mut steps = Vec::new();
        let mut state = initial_state.clone();
        let mut best_seen = self.base.heuristic(&state);
        let mut no_improvement = 0;

        for _ in 0..self.base.max_iters() {
            if self.base.cancelled() {
                break;
            }
            steps.push(state.clone());
            if state.is_solved() {
                return Attempt {
                    steps,
                    solved: true,
                };
            }

            let (next, min_cost) = match advance(&self.base, &mut self.table, &mut self.rng, &state) {
                Some(moved) => moved,
                None => break,
            };
            if min_cost >= best_seen {
                no_improvement += 1;
                if no_improvement >= threshold {
                    trace!("No improvement for {} steps, restarting", no_improvement);
                    break;
                }
            } else {
                best_seen = min_cost;
                no_improvement = 0;
            }
            state = next;
        }

        Attempt {
            steps,
            solved: false,
        }
    }
}

fn encode_all<S: PuzzleState>(states: &[S]) -> Vec<String> {
    states.iter().map(S::encode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use rand::SeedableRng;

    use crate::level::Level;
    use crate::solver::heuristics::boxes_to_targets_min_cost;
    use crate::solver::{all_moves, no_pulls};

    const CORRIDOR: &str = r"
########
#@$   .#
########
";
    const SOLVED: &str = r"
#####
#@* #
#####
";
    const CORNERED: &str = r"
#####
#$ .#
#@  #
#####
";

    fn level(s: &str) -> Level {
        s.parse().unwrap()
    }

    fn base(max_iters: usize) -> Solver<Level> {
        Solver::new(boxes_to_targets_min_cost::<Level>, no_pulls::<Level>, max_iters).unwrap()
    }

    fn lrta(stagnation: Stagnation, max_iters: usize) -> Lrta<Level> {
        Lrta::new(base(max_iters), stagnation, StdRng::seed_from_u64(3)).unwrap()
    }

    fn policies() -> Vec<Stagnation> {
        vec![
            Stagnation::Backoff(BackoffParams::default()),
            Stagnation::Restart(RestartParams::default()),
        ]
    }

    #[test]
    fn corridor() {
        let level = level(CORRIDOR);
        for stagnation in policies() {
            let solution = lrta(stagnation, 100).solve(&level);
            assert!(solution.is_solved(), "{:?}", stagnation);
            assert_eq!(solution.length(), 5);
            assert!(solution.explored_states > 0);
            assert_eq!(solution.pull_moves, 0);
            assert_eq!(solution.steps[0], level.encode());
        }
    }

    #[test]
    fn already_solved() {
        let level = level(SOLVED);
        for stagnation in policies() {
            let solution = lrta(stagnation, 10).solve(&level);
            assert!(solution.is_solved());
            assert_eq!(solution.length(), 1);
        }
    }

    #[test]
    fn cornered_box() {
        let level = level(CORNERED);

        let solution = lrta(Stagnation::Backoff(BackoffParams::default()), 100).solve(&level);
        assert!(!solution.is_solved());
        // never backs off with the default factor so every iteration adds a step,
        // plus the state the last move led to
        assert_eq!(solution.length(), 101);
        assert_eq!(solution.recovery, Recovery::Backoffs(0));

        // each attempt gets the whole iteration budget so all restarts get used up
        let solution = lrta(Stagnation::Restart(RestartParams::default()), 100).solve(&level);
        assert!(!solution.is_solved());
        assert_eq!(solution.recovery, Recovery::Restarts(10));
        assert_eq!(solution.steps[0], level.encode());
    }

    #[test]
    fn backing_off() {
        let level = level(CORNERED);
        let params = BackoffParams {
            steps: 3,
            step_increment: 2,
            probability_factor: 0.0,
            plateau_threshold: 2,
        };
        let solution = lrta(Stagnation::Backoff(params), 200).solve(&level);
        assert!(!solution.is_solved());
        match solution.recovery {
            Recovery::Backoffs(n) => assert!(n > 0),
            other => panic!("unexpected recovery {:?}", other),
        }
        assert!(solution.length() < 200);
        assert_eq!(solution.steps[0], level.encode());
    }

    #[test]
    fn trajectory_ends_in_current_state() {
        let level = level(CORNERED);
        let params = BackoffParams {
            steps: 3,
            step_increment: 2,
            probability_factor: 0.0,
            plateau_threshold: 2,
        };
        // some of these budgets run out right after a backoff
        for max_iters in 1..60 {
            let solution = lrta(Stagnation::Backoff(params), max_iters).solve(&level);
            assert!(!solution.steps.is_empty(), "max_iters {}", max_iters);
            assert!(solution.length() <= max_iters + 1);
            assert_eq!(solution.steps[0], level.encode());
            let last = Level::decode(solution.steps.last().unwrap()).unwrap();
            assert!(!last.is_solved());
        }
    }

    #[test]
    fn rewind_distance() {
        let params = BackoffParams {
            steps: 3,
            step_increment: 2,
            ..BackoffParams::default()
        };
        let mut rewind = Rewind::new(&params);
        let mut steps: Vec<u32> = (0..10).collect();

        assert_eq!(rewind.apply(&mut steps, &0), (6, 3));
        assert_eq!(steps, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(rewind.distance, 5);

        assert_eq!(rewind.apply(&mut steps, &0), (0, 5));
        assert!(steps.is_empty());
        assert_eq!(rewind.distance, 7);

        // back at the initial state, the distance starts over
        steps.push(0);
        assert_eq!(rewind.apply(&mut steps, &0), (0, 1));
        assert!(steps.is_empty());
        assert_eq!(rewind.distance, 3);

        assert_eq!(rewind.apply(&mut (0..20).collect(), &0), (16, 3));
        assert_eq!(rewind.distance, 5);
    }

    #[test]
    fn enhancements_keep_shortest() {
        let level = level(CORRIDOR);
        let params = RestartParams {
            enhancements: 3,
            ..RestartParams::default()
        };
        let solution = lrta(Stagnation::Restart(params), 100).solve(&level);
        assert!(solution.is_solved());
        assert_eq!(solution.length(), 5);
        match solution.recovery {
            Recovery::Restarts(n) => assert!(n >= 3),
            other => panic!("unexpected recovery {:?}", other),
        }
    }

    #[test]
    fn restarts_share_learned_costs() {
        let level = level(CORNERED);
        let initial = boxes_to_targets_min_cost(&level);
        let mut search = lrta(Stagnation::Restart(RestartParams::default()), 100);
        let solution = search.solve(&level);
        assert_eq!(solution.recovery, Recovery::Restarts(10));

        // every move raises one of the 5 player positions by 1,
        // one attempt alone makes 20 moves
        let costs = &search.learned_costs().costs;
        assert!(costs.len() <= 5);
        let highest = costs.values().cloned().max().unwrap();
        assert!(highest > initial + 20, "{} vs {}", highest, initial);
    }

    #[test]
    fn learned_costs_only_grow() {
        let level = level(
            r"
#######
#  @  #
# $$  #
# .. ##
#######
",
        );
        let base = Solver::new(boxes_to_targets_min_cost::<Level>, all_moves::<Level>, 1)
            .unwrap();
        let mut table = CostTable::default();
        let mut rng = StdRng::seed_from_u64(11);

        let mut state = level;
        for _ in 0..200 {
            let before = table.clone();
            let (next, cost) = match advance(&base, &mut table, &mut rng, &state) {
                Some(moved) => moved,
                None => break,
            };
            assert_eq!(table.get(&next.encode()), Some(cost));
            for (key, &old) in &before.costs {
                assert!(table.get(key).unwrap() >= old);
            }
            state = next;
        }
        assert!(!table.is_empty());
    }

    #[test]
    fn lookahead_picks_cheapest() {
        let level = level(CORRIDOR);
        let base = base(1);
        let mut table = CostTable::default();
        let mut rng = StdRng::seed_from_u64(0);

        // the only move is the push
        let (next, cost) = advance(&base, &mut table, &mut rng, &level).unwrap();
        assert_eq!(cost, 1 + 3);
        assert_eq!(boxes_to_targets_min_cost(&next), 3);
        assert_eq!(table.get(&next.encode()), Some(4));
    }

    #[test]
    fn table_persists_until_next_solve() {
        let level = level(CORRIDOR);
        let mut search = lrta(Stagnation::Backoff(BackoffParams::default()), 100);
        search.solve(&level);
        let learned = search.learned_costs().len();
        assert!(learned > 0);
        search.solve(&level);
        assert_eq!(search.learned_costs().len(), learned);
    }

    #[test]
    fn invalid_params() {
        let rng = || StdRng::seed_from_u64(0);
        let backoff = |params| Lrta::new(base(10), Stagnation::Backoff(params), rng()).unwrap_err();
        let restart = |params| Lrta::new(base(10), Stagnation::Restart(params), rng()).unwrap_err();

        let defaults = BackoffParams::default();
        assert_eq!(
            backoff(BackoffParams { steps: 0, ..defaults }),
            ConfigErr::ZeroBackoff
        );
        assert_eq!(
            backoff(BackoffParams { plateau_threshold: 0, ..defaults }),
            ConfigErr::ZeroPlateau
        );
        assert_eq!(
            backoff(BackoffParams { probability_factor: 1.5, ..defaults }),
            ConfigErr::InvalidProbability(1.5)
        );

        let defaults = RestartParams::default();
        assert_eq!(
            restart(RestartParams { threshold: 0, ..defaults }),
            ConfigErr::ZeroPlateau
        );
        assert_eq!(
            restart(RestartParams { max_restarts: 0, ..defaults }),
            ConfigErr::ZeroRestarts
        );
    }

    #[test]
    fn cancelled() {
        let level = level(CORRIDOR);
        for stagnation in policies() {
            let base = base(100).with_cancel_flag(Arc::new(AtomicBool::new(true)));
            let solution = Lrta::new(base, stagnation, StdRng::seed_from_u64(0))
                .unwrap()
                .solve(&level);
            assert!(!solution.is_solved());
            assert_eq!(solution.steps, vec![level.encode()]);
        }
    }
}
