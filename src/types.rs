use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize, Serializer};

use crate::constants::{round_label, BYE_ID_PREFIX, BYE_NAME};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Robot {
    pub id: String,
    pub name: String,
    pub team: Option<String>,
    pub image: Option<String>,
}

impl Robot {
    /// Synthetic opponent used to pad a bracket to a power of two.
    pub fn bye() -> Self {
        Self {
            id: make_id(BYE_ID_PREFIX),
            name: BYE_NAME.to_string(),
            team: Some(String::new()),
            image: Some(String::new()),
        }
    }

    pub fn is_bye(&self) -> bool {
        self.id
            .strip_prefix(BYE_ID_PREFIX)
            .map(|rest| rest.starts_with('_'))
            .unwrap_or(false)
    }
}

/// Registration request for a robot. Fields are normalised at the edge.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewRobot {
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One layer of the elimination tree, counted as rounds remaining including
/// this one: `Round(1)` is the final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Round(u32);

impl Round {
    pub const FINAL: Round = Round(1);
    pub const SEMI: Round = Round(2);
    pub const QUARTER: Round = Round(3);

    pub fn from_depth(depth: u32) -> Option<Self> {
        (depth > 0).then_some(Self(depth))
    }

    pub fn depth(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Option<Self> {
        Self::from_depth(self.0 - 1)
    }

    pub fn label(self) -> String {
        round_label(self.0)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Round {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Match {
    pub id: String,
    pub round: Round,
    pub group: Option<String>,
    #[serde(rename = "robotA")]
    pub robot_a: Option<Robot>,
    #[serde(rename = "robotB")]
    pub robot_b: Option<Robot>,
    #[serde(rename = "scoreA")]
    pub score_a: u32,
    #[serde(rename = "scoreB")]
    pub score_b: u32,
    pub winner: Option<Robot>,
    pub finished: bool,
}

impl Match {
    pub fn new(id: String, round: Round, robot_a: Option<Robot>, robot_b: Option<Robot>) -> Self {
        Self {
            id,
            round,
            group: None,
            robot_a,
            robot_b,
            score_a: 0,
            score_b: 0,
            winner: None,
            finished: false,
        }
    }

    /// Higher score wins; equal scores are a draw.
    pub fn resolve_winner(&self) -> Option<Robot> {
        use std::cmp::Ordering;
        match self.score_a.cmp(&self.score_b) {
            Ordering::Greater => self.robot_a.clone(),
            Ordering::Less => self.robot_b.clone(),
            Ordering::Equal => None,
        }
    }

    pub fn has_bye(&self) -> bool {
        [&self.robot_a, &self.robot_b]
            .into_iter()
            .any(|slot| slot.as_ref().map(Robot::is_bye).unwrap_or(true))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MainStatus {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingItem {
    #[serde(rename = "robotId")]
    pub robot_id: String,
    #[serde(rename = "robotName")]
    pub robot_name: String,
    pub wins: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankingResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<RankingItem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ArenaState {
    pub robots: Vec<Robot>,
    pub matches: Vec<Match>,
    #[serde(rename = "currentRound")]
    pub current_round: Option<Round>,
    #[serde(rename = "currentMatchId")]
    pub current_match_id: Option<String>,
    #[serde(rename = "mainTimer")]
    pub main_timer: u32,
    #[serde(rename = "mainStatus")]
    pub main_status: MainStatus,
    #[serde(rename = "recoveryTimer")]
    pub recovery_timer: u32,
    #[serde(rename = "recoveryActive")]
    pub recovery_active: bool,
    pub winner: Option<Robot>,
    pub ranking: Vec<RankingItem>,
}

impl ArenaState {
    pub fn new(main_seconds: u32) -> Self {
        Self {
            robots: Vec::new(),
            matches: Vec::new(),
            current_round: None,
            current_match_id: None,
            main_timer: main_seconds,
            main_status: MainStatus::Idle,
            recovery_timer: 0,
            recovery_active: false,
            winner: None,
            ranking: Vec::new(),
        }
    }

    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|entry| entry.id == match_id)
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.current_match_id
            .as_deref()
            .and_then(|id| self.find_match(id))
    }

    pub fn matches_in_round(&self, round: Round) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |entry| entry.round == round)
    }
}
