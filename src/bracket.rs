//! Single-elimination bracket construction and round promotion.

use crate::constants::{rounds_needed, MATCH_ID_PREFIX};
use crate::rng::Rng;
use crate::types::{make_id, Match, Robot, Round};

/// Matches for one round of the tree.
#[derive(Clone, Debug)]
pub struct RoundPairing {
    pub round: Round,
    pub matches: Vec<Match>,
}

impl RoundPairing {
    pub fn first_match_id(&self) -> Option<String> {
        self.matches.first().map(|entry| entry.id.clone())
    }
}

/// Shuffles the robots, pads with byes up to the next power of two and pairs
/// neighbours into first-round matches. Returns `None` for fewer than two robots.
pub fn generate_bracket(robots: &[Robot], rng: &mut Rng) -> Option<RoundPairing> {
    let round = Round::from_depth(rounds_needed(robots.len()))?;
    let slots = 1usize << round.depth();

    let mut seeded: Vec<Robot> = robots.to_vec();
    rng.shuffle(&mut seeded);
    while seeded.len() < slots {
        seeded.push(Robot::bye());
    }

    Some(RoundPairing {
        round,
        matches: pair_into_matches(seeded, round),
    })
}

/// Pairs the winners of `from` into the next round. Returns `None` when `from`
/// is the final.
///
/// Drawn matches have no winner and are skipped, so a round containing a draw
/// yields a short list; an odd leftover is paired against an empty slot.
pub fn promote_winners(matches: &[Match], from: Round) -> Option<RoundPairing> {
    let to = from.next()?;
    let winners: Vec<Robot> = matches
        .iter()
        .filter(|entry| entry.round == from)
        .filter_map(|entry| entry.winner.clone())
        .collect();

    Some(RoundPairing {
        round: to,
        matches: pair_into_matches(winners, to),
    })
}

fn pair_into_matches(robots: Vec<Robot>, round: Round) -> Vec<Match> {
    let mut iter = robots.into_iter();
    let mut matches = Vec::new();
    while let Some(robot_a) = iter.next() {
        let robot_b = iter.next();
        matches.push(Match::new(
            make_id(MATCH_ID_PREFIX),
            round,
            Some(robot_a),
            robot_b,
        ));
    }
    matches
}
