pub const TICK_MS: u64 = 1_000;

pub const DEFAULT_MATCH_SECONDS: u32 = 180;
pub const DEFAULT_RECOVERY_SECONDS: u32 = 10;
pub const MAX_TIMER_SECONDS: u32 = 86_400;

pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;

pub const ROBOT_ID_PREFIX: &str = "robot";
pub const MATCH_ID_PREFIX: &str = "match";
pub const BYE_ID_PREFIX: &str = "bye";
pub const BYE_NAME: &str = "BYE";

pub const MAX_ROBOT_NAME_CHARS: usize = 32;
pub const DEFAULT_ROBOT_NAME: &str = "Robot";

pub const MAX_RANKING_LIMIT: usize = 1_000;

pub fn round_label(depth: u32) -> String {
    match depth {
        1 => "final".to_string(),
        2 => "semi".to_string(),
        3 => "quarter".to_string(),
        _ => format!("round_of_{}", 1u64 << depth.min(63)),
    }
}

pub fn rounds_needed(robot_count: usize) -> u32 {
    if robot_count < 2 {
        return 0;
    }
    robot_count.next_power_of_two().trailing_zeros()
}
