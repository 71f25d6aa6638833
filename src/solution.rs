use std::fmt::{self, Debug, Display, Formatter};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::time::Duration;

use separator::Separatable;

use crate::level::Level;
use crate::PuzzleState;

/// How the LRTA* searches got out of plateaus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    None,
    Backoffs(usize),
    Restarts(usize),
}

/// Result of one search run.
///
/// `steps` are the encoded states from the initial one to wherever the search ended.
/// Whether it's actually a solution is decided by decoding the last state.
#[derive(Clone, PartialEq)]
pub struct Solution<S = Level> {
    pub steps: Vec<String>,
    pub explored_states: usize,
    pub time: Duration,
    pub pull_moves: usize,
    pub recovery: Recovery,
    state: PhantomData<fn() -> S>,
}

impl<S: PuzzleState> Solution<S> {
    pub fn new(steps: Vec<String>, explored_states: usize, time: Duration, pull_moves: usize) -> Self {
        Solution {
            steps,
            explored_states,
            time,
            pull_moves,
            recovery: Recovery::None,
            state: PhantomData,
        }
    }

    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn length(&self) -> usize {
        self.steps.len()
    }

    /// Panics if the last step isn't a valid encoding - searches only ever store encoded states.
    pub fn is_solved(&self) -> bool {
        match self.steps.last() {
            None => false,
            Some(last) => S::decode(last)
                .expect("Trajectory contains an invalid state")
                .is_solved(),
        }
    }

    /// Hands the trajectory over to something that can show it.
    pub fn export(&self, sink: &mut dyn TrajectorySink) -> io::Result<()> {
        sink.accept(&self.steps)
    }

    /// Means over a batch of runs, all zeros for an empty batch.
    ///
    /// The means are kept fractional, a `Solution` would have to truncate
    /// e.g. 2.5 average steps to 2.
    pub fn average(solutions: &[Solution<S>]) -> SolutionStats {
        if solutions.is_empty() {
            return SolutionStats::default();
        }

        SolutionStats {
            runs: solutions.len(),
            solved: solutions.iter().filter(|s| s.is_solved()).count(),
            length: mean(solutions, |s| s.length() as f64),
            explored_states: mean(solutions, |s| s.explored_states as f64),
            time: mean(solutions, |s| s.time.as_secs_f64()),
            pull_moves: mean(solutions, |s| s.pull_moves as f64),
        }
    }
}

fn mean<S, F>(solutions: &[Solution<S>], f: F) -> f64
where
    F: Fn(&Solution<S>) -> f64,
{
    solutions.iter().map(f).sum::<f64>() / solutions.len() as f64
}

impl<S: PuzzleState> Display for Solution<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "steps: {}, solved: {}, explored states: {}, time: {:.2}s, pull moves: {}",
            self.length(),
            self.is_solved(),
            (self.explored_states as u64).separated_string(),
            self.time.as_secs_f64(),
            self.pull_moves,
        )?;
        match self.recovery {
            Recovery::None => Ok(()),
            Recovery::Backoffs(n) => write!(f, ", backoffs: {}", n),
            Recovery::Restarts(n) => write!(f, ", restarts: {}", n),
        }
    }
}

impl<S: PuzzleState> Debug for Solution<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Averages over several runs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolutionStats {
    pub runs: usize,
    pub solved: usize,
    pub length: f64,
    pub explored_states: f64,
    /// seconds
    pub time: f64,
    pub pull_moves: f64,
}

impl Display for SolutionStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runs: {}, solved: {}, steps: {:.2}, explored states: {:.2}, time: {:.2}s, pull moves: {:.2}",
            self.runs, self.solved, self.length, self.explored_states, self.time, self.pull_moves,
        )
    }
}

/// Anything that can present a trajectory, e.g. render it as an animation.
pub trait TrajectorySink {
    fn accept(&mut self, steps: &[String]) -> io::Result<()>;
}

/// Writes the states one after another separated by empty lines.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    out: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(out: W) -> Self {
        FrameWriter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TrajectorySink for FrameWriter<W> {
    fn accept(&mut self, steps: &[String]) -> io::Result<()> {
        for step in steps {
            writeln!(self.out, "{}", step)?;
        }
        self.out.flush()
    }
}
