use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};

use crate::constants::MAX_RANKING_LIMIT;
use crate::types::{Match, RankingItem, RankingResponse, Robot};

/// Standings derived from match history: one entry per registered robot,
/// most wins first, ties by name.
///
/// Draws credit nobody. Wins by robots that are not registered (bye
/// placeholders) are not counted.
pub fn compute_ranking(robots: &[Robot], matches: &[Match]) -> Vec<RankingItem> {
    let mut wins: HashMap<&str, u32> = HashMap::new();
    for entry in matches.iter().filter(|entry| entry.finished) {
        if let Some(winner) = entry.winner.as_ref() {
            *wins.entry(winner.id.as_str()).or_insert(0) += 1;
        }
    }

    let mut items: Vec<RankingItem> = robots
        .iter()
        .map(|robot| RankingItem {
            robot_id: robot.id.clone(),
            robot_name: robot.name.clone(),
            wins: wins.get(robot.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    items.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then_with(|| a.robot_name.cmp(&b.robot_name))
    });
    items
}

pub fn build_response(ranking: &[RankingItem], requested_limit: Option<usize>) -> RankingResponse {
    let limit = requested_limit
        .map(|limit| limit.clamp(1, MAX_RANKING_LIMIT))
        .unwrap_or(ranking.len());
    RankingResponse {
        generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        entries: ranking.iter().take(limit).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Round;

    fn robot(id: &str, name: &str) -> Robot {
        Robot {
            id: id.to_string(),
            name: name.to_string(),
            team: None,
            image: None,
        }
    }

    fn finished(a: &Robot, b: &Robot, score_a: u32, score_b: u32) -> Match {
        let mut entry = Match::new(
            format!("m-{}-{}", a.id, b.id),
            Round::SEMI,
            Some(a.clone()),
            Some(b.clone()),
        );
        entry.score_a = score_a;
        entry.score_b = score_b;
        entry.winner = entry.resolve_winner();
        entry.finished = true;
        entry
    }

    #[test]
    fn every_robot_appears_once_including_winless() {
        let robots = vec![robot("r1", "Alpha"), robot("r2", "Bravo"), robot("r3", "Charlie")];
        let matches = vec![finished(&robots[0], &robots[1], 3, 1)];
        let ranking = compute_ranking(&robots, &matches);
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[0].robot_id, "r1");
        assert_eq!(ranking[0].wins, 1);
        assert!(ranking[1..].iter().all(|item| item.wins == 0));
    }

    #[test]
    fn ties_break_by_name_ascending() {
        let robots = vec![robot("r1", "zed"), robot("r2", "Zed"), robot("r3", "amy")];
        let ranking = compute_ranking(&robots, &[]);
        let names: Vec<&str> = ranking.iter().map(|item| item.robot_name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "amy", "zed"]);
    }

    #[test]
    fn draws_and_unfinished_matches_credit_nobody() {
        let robots = vec![robot("r1", "A"), robot("r2", "B")];
        let draw = finished(&robots[0], &robots[1], 2, 2);
        let mut pending = Match::new("m".to_string(), Round::FINAL, Some(robots[0].clone()), None);
        pending.winner = Some(robots[0].clone());
        let ranking = compute_ranking(&robots, &[draw, pending]);
        assert!(ranking.iter().all(|item| item.wins == 0));
    }

    #[test]
    fn total_wins_match_decided_matches() {
        let robots = vec![robot("r1", "A"), robot("r2", "B"), robot("r3", "C"), robot("r4", "D")];
        let matches = vec![
            finished(&robots[0], &robots[1], 4, 1),
            finished(&robots[2], &robots[3], 0, 2),
            finished(&robots[0], &robots[3], 1, 1),
            finished(&robots[0], &robots[3], 3, 0),
        ];
        let ranking = compute_ranking(&robots, &matches);
        let total: u32 = ranking.iter().map(|item| item.wins).sum();
        let decided = matches.iter().filter(|entry| entry.winner.is_some()).count() as u32;
        assert_eq!(total, decided);
        assert_eq!(ranking[0].robot_name, "A");
        assert_eq!(ranking[0].wins, 2);
        assert_eq!(ranking[1].robot_name, "D");
    }

    #[test]
    fn bye_winners_are_not_ranked() {
        let robots = vec![robot("r1", "A")];
        let bye = Robot::bye();
        let matches = vec![finished(&bye, &robots[0], 1, 0)];
        let ranking = compute_ranking(&robots, &matches);
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].wins, 0);
    }

    #[test]
    fn build_response_limits_range() {
        let robots: Vec<Robot> = (0..5)
            .map(|idx| robot(&format!("r{idx}"), &format!("R{idx}")))
            .collect();
        let ranking = compute_ranking(&robots, &[]);
        assert_eq!(build_response(&ranking, None).entries.len(), 5);
        assert_eq!(build_response(&ranking, Some(2)).entries.len(), 2);
        assert_eq!(build_response(&ranking, Some(0)).entries.len(), 1);
        assert_eq!(build_response(&ranking, Some(999)).entries.len(), 5);
        assert!(build_response(&ranking, None).generated_at_iso.ends_with('Z'));
    }
}
