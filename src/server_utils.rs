use crate::constants::{
    DEFAULT_ROBOT_NAME, MAX_RANKING_LIMIT, MAX_ROBOT_NAME_CHARS, MAX_TIMER_SECONDS,
};
use crate::types::NewRobot;

pub fn sanitize_robot_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return DEFAULT_ROBOT_NAME.to_string();
    }
    trimmed.chars().take(MAX_ROBOT_NAME_CHARS).collect()
}

pub fn normalize_label(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|label| !label.is_empty())
}

pub fn normalize_new_robot(input: NewRobot) -> NewRobot {
    NewRobot {
        name: sanitize_robot_name(&input.name),
        team: normalize_label(input.team),
        image: normalize_label(input.image),
    }
}

pub fn normalize_seconds(value: i64) -> u32 {
    value.clamp(0, MAX_TIMER_SECONDS as i64) as u32
}

pub fn parse_ranking_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.parse::<usize>().ok())
        .map(|limit| limit.min(MAX_RANKING_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_limit_parsing_is_lenient_for_invalid_values() {
        assert_eq!(parse_ranking_limit(Some("8")), Some(8));
        assert_eq!(parse_ranking_limit(Some("0")), Some(0));
        assert_eq!(parse_ranking_limit(Some("abc")), None);
        assert_eq!(parse_ranking_limit(Some("-1")), None);
        assert_eq!(parse_ranking_limit(Some("5000")), Some(MAX_RANKING_LIMIT));
        assert_eq!(parse_ranking_limit(None), None);
    }

    #[test]
    fn sanitize_robot_name_applies_trim_empty_and_max_len() {
        assert_eq!(sanitize_robot_name(""), "Robot");
        assert_eq!(sanitize_robot_name("   "), "Robot");
        assert_eq!(sanitize_robot_name(" Crusher "), "Crusher");
        assert_eq!(
            sanitize_robot_name("0123456789012345678901234567890123456789"),
            "01234567890123456789012345678901"
        );
    }

    #[test]
    fn normalize_new_robot_drops_blank_labels() {
        let robot = normalize_new_robot(NewRobot {
            name: " Tank ".to_string(),
            team: Some("  ".to_string()),
            image: Some(" /img/tank.png ".to_string()),
        });
        assert_eq!(robot.name, "Tank");
        assert_eq!(robot.team, None);
        assert_eq!(robot.image.as_deref(), Some("/img/tank.png"));
    }

    #[test]
    fn normalize_seconds_clamps_range() {
        assert_eq!(normalize_seconds(-10), 0);
        assert_eq!(normalize_seconds(0), 0);
        assert_eq!(normalize_seconds(180), 180);
        assert_eq!(normalize_seconds(i64::MAX), MAX_TIMER_SECONDS);
    }
}
