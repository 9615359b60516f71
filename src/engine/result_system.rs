use super::*;
use crate::bracket::promote_winners;
use crate::types::Round;

impl ArenaEngine {
    /// Records a result for `match_id`. Unknown ids are ignored and return
    /// `false`.
    ///
    /// The call that finishes the last open match of a round promotes its
    /// winners; after the final, `currentRound` stays `final` and there is no
    /// current match.
    pub fn finalize_match(&mut self, match_id: &str, score_a: u32, score_b: u32) -> bool {
        let Some(index) = self.state.matches.iter().position(|entry| entry.id == match_id) else {
            debug!(match_id, "result for unknown match ignored");
            return false;
        };

        let (round, was_finished, winner) = {
            let entry = &mut self.state.matches[index];
            let was_finished = entry.finished;
            entry.score_a = score_a;
            entry.score_b = score_b;
            entry.finished = true;
            entry.winner = entry.resolve_winner();
            (entry.round, was_finished, entry.winner.clone())
        };
        info!(
            match_id,
            score_a,
            score_b,
            winner = winner.as_ref().map(|robot| robot.name.as_str()).unwrap_or("draw"),
            "match finalized"
        );
        self.state.winner = winner;

        let round_complete = self.state.matches_in_round(round).all(|entry| entry.finished);
        if !round_complete {
            self.advance_within_round(round);
        } else if !was_finished {
            self.advance_round(round);
        }

        self.refresh_ranking();
        self.publish();
        true
    }

    fn advance_within_round(&mut self, round: Round) {
        let next = self
            .state
            .matches_in_round(round)
            .find(|entry| !entry.finished)
            .map(|entry| entry.id.clone());
        if next.is_some() {
            self.state.current_match_id = next;
        }
    }

    fn advance_round(&mut self, completed: Round) {
        match promote_winners(&self.state.matches, completed) {
            Some(pairing) => {
                info!(
                    from = %completed,
                    to = %pairing.round,
                    matches = pairing.matches.len(),
                    "round promoted"
                );
                self.state.current_round = Some(pairing.round);
                self.state.current_match_id = pairing.first_match_id();
                self.state.matches.extend(pairing.matches);
            }
            None => {
                let champion = self.state.winner.as_ref().map(|robot| &robot.name);
                info!(?champion, "tournament complete");
                self.state.current_round = Some(Round::FINAL);
                self.state.current_match_id = None;
            }
        }
    }
}
