use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::level::Level;
use crate::solver::heuristics;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Beam,
    LrtaBackoff,
    LrtaRestart,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Beam, Method::LrtaBackoff, Method::LrtaRestart];
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Method::Beam => write!(f, "beam"),
            Method::LrtaBackoff => write!(f, "lrta-backoff"),
            Method::LrtaRestart => write!(f, "lrta-restart"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .cloned()
            .find(|m| m.to_string() == s)
            .ok_or_else(|| format!("Unknown method: {}", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeuristicKind {
    MinCost,
    Reachable,
    PlayerBoxes,
    Manhattan,
    Unplaced,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 5] = [
        HeuristicKind::MinCost,
        HeuristicKind::Reachable,
        HeuristicKind::PlayerBoxes,
        HeuristicKind::Manhattan,
        HeuristicKind::Unplaced,
    ];

    pub fn function(self) -> fn(&Level) -> u32 {
        match self {
            HeuristicKind::MinCost => heuristics::boxes_to_targets_min_cost,
            HeuristicKind::Reachable => heuristics::boxes_to_targets_reachable_cost,
            HeuristicKind::PlayerBoxes => heuristics::player_plus_boxes_cost,
            HeuristicKind::Manhattan => heuristics::manhattan_lower_bound,
            HeuristicKind::Unplaced => heuristics::unplaced_box_count,
        }
    }
}

impl Display for HeuristicKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            HeuristicKind::MinCost => write!(f, "min-cost"),
            HeuristicKind::Reachable => write!(f, "reachable"),
            HeuristicKind::PlayerBoxes => write!(f, "player-boxes"),
            HeuristicKind::Manhattan => write!(f, "manhattan"),
            HeuristicKind::Unplaced => write!(f, "unplaced"),
        }
    }
}

impl FromStr for HeuristicKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeuristicKind::ALL
            .iter()
            .cloned()
            .find(|h| h.to_string() == s)
            .ok_or_else(|| format!("Unknown heuristic: {}", s))
    }
}
