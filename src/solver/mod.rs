pub mod beam;
pub mod heuristics;
pub mod lrta;
pub mod metrics;

use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Method;
use crate::solution::Solution;
use crate::PuzzleState;

use self::beam::BeamSearch;
use self::lrta::{BackoffParams, Lrta, RestartParams, Stagnation};

pub type HeuristicFn<S> = Arc<dyn Fn(&S) -> u32 + Send + Sync>;
pub type ExpandFn<S> = Arc<dyn Fn(&S) -> Vec<S> + Send + Sync>;

pub const DEFAULT_MAX_ITERS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigErr {
    ZeroIters,
    ZeroBeamWidth,
    ZeroBackoff,
    ZeroPlateau,
    ZeroRestarts,
    InvalidProbability(f64),
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigErr::ZeroIters => write!(f, "Max iterations must be positive"),
            ConfigErr::ZeroBeamWidth => write!(f, "Beam width must be positive"),
            ConfigErr::ZeroBackoff => write!(f, "Backoff steps must be positive"),
            ConfigErr::ZeroPlateau => write!(f, "Stagnation threshold must be positive"),
            ConfigErr::ZeroRestarts => write!(f, "Max restarts must be positive"),
            ConfigErr::InvalidProbability(p) => {
                write!(f, "Probability factor {} is not in [0, 1]", p)
            }
        }
    }
}

impl Error for ConfigErr {}

/// Everything the searches share: how to score a state, how to expand it
/// and how long to keep going.
pub struct Solver<S> {
    heuristic: HeuristicFn<S>,
    state_generator: ExpandFn<S>,
    max_iters: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S> Solver<S> {
    pub fn new<H, G>(heuristic: H, state_generator: G, max_iters: usize) -> Result<Self, ConfigErr>
    where
        H: Fn(&S) -> u32 + Send + Sync + 'static,
        G: Fn(&S) -> Vec<S> + Send + Sync + 'static,
    {
        if max_iters == 0 {
            return Err(ConfigErr::ZeroIters);
        }
        Ok(Solver {
            heuristic: Arc::new(heuristic),
            state_generator: Arc::new(state_generator),
            max_iters,
            cancel: None,
        })
    }

    /// Searches check the flag between iterations and give up once it's set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn heuristic(&self, state: &S) -> u32 {
        (self.heuristic)(state)
    }

    pub fn expand(&self, state: &S) -> Vec<S> {
        (self.state_generator)(state)
    }

    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

// derive would require S: Clone
impl<S> Clone for Solver<S> {
    fn clone(&self) -> Self {
        Solver {
            heuristic: Arc::clone(&self.heuristic),
            state_generator: Arc::clone(&self.state_generator),
            max_iters: self.max_iters,
            cancel: self.cancel.clone(),
        }
    }
}

impl<S> Debug for Solver<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("max_iters", &self.max_iters)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

pub trait Search<S: PuzzleState> {
    fn solve(&mut self, initial_state: &S) -> Solution<S>;
}

/// Expands into steps, pushes and pulls.
pub fn all_moves<S: PuzzleState>(state: &S) -> Vec<S> {
    state.neighbors()
}

/// Expands into steps and pushes only.
pub fn no_pulls<S: PuzzleState>(state: &S) -> Vec<S> {
    let pulls = state.pull_moves();
    state
        .neighbors()
        .into_iter()
        .filter(|n| n.pull_moves() == pulls)
        .collect()
}

/// Builds the search for `method` with default parameters.
pub fn searcher<S>(
    method: Method,
    base: Solver<S>,
    beam_width: usize,
    seed: u64,
) -> Result<Box<dyn Search<S>>, ConfigErr>
where
    S: PuzzleState + 'static,
{
    let rng = StdRng::seed_from_u64(seed);
    Ok(match method {
        Method::Beam => Box::new(BeamSearch::new(base, beam_width, rng)?),
        Method::LrtaBackoff => Box::new(Lrta::new(
            base,
            Stagnation::Backoff(BackoffParams::default()),
            rng,
        )?),
        Method::LrtaRestart => Box::new(Lrta::new(
            base,
            Stagnation::Restart(RestartParams::default()),
            rng,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::level::Level;
    use crate::solver::heuristics::boxes_to_targets_min_cost;

    #[test]
    fn zero_iters_rejected() {
        let h = boxes_to_targets_min_cost::<Level>;
        let err = Solver::new(h, all_moves::<Level>, 0).unwrap_err();
        assert_eq!(err, ConfigErr::ZeroIters);
        assert!(Solver::new(h, all_moves::<Level>, 1).is_ok());
    }

    #[test]
    fn pulls_filtered() {
        let level: Level = r"
#######
# @$ .#
#######
"
        .parse()
        .unwrap();
        // push, step left, pull
        assert_eq!(all_moves(&level).len(), 3);
        assert_eq!(no_pulls(&level).len(), 2);
        assert!(no_pulls(&level).iter().all(|n| n.pull_moves() == 0));
    }

    #[test]
    fn cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let solver = Solver::new(boxes_to_targets_min_cost::<Level>, all_moves::<Level>, 10)
            .unwrap()
            .with_cancel_flag(Arc::clone(&flag));
        assert!(!solver.cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(solver.cancelled());
        assert!(solver.clone().cancelled());
    }
}
