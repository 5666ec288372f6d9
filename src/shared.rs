use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::plugin::RegistryError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum BotError {
    /// A reply was asked for on an event that is not a chat message
    #[error("Unrecognized command type `{event}`")]
    UnroutableReply { event: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn plural(count: i64, unit: &str) -> String {
    format!("{} {}s ago", count, unit)
}

/// Describe how long ago `since` was, relative to `now`
pub fn pretty_elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(since);
    let days = elapsed.num_days();
    if days < 0 {
        return String::new();
    }
    if days == 0 {
        let seconds = elapsed.num_seconds();
        return match seconds {
            0..=9 => "just now".to_string(),
            10..=59 => plural(seconds, "second"),
            60..=119 => "a minute ago".to_string(),
            120..=3599 => plural(seconds / 60, "minute"),
            3600..=7199 => "an hour ago".to_string(),
            _ => plural(seconds / 3600, "hour"),
        };
    }
    match days {
        1 => "yesterday".to_string(),
        2..=6 => plural(days, "day"),
        7..=30 => plural(days / 7, "week"),
        31..=364 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::seconds(3), "just now")]
    #[case(Duration::seconds(42), "42 seconds ago")]
    #[case(Duration::seconds(90), "a minute ago")]
    #[case(Duration::minutes(25), "25 minutes ago")]
    #[case(Duration::minutes(61), "an hour ago")]
    #[case(Duration::hours(5), "5 hours ago")]
    #[case(Duration::hours(30), "yesterday")]
    #[case(Duration::days(4), "4 days ago")]
    #[case(Duration::days(15), "2 weeks ago")]
    #[case(Duration::days(95), "3 months ago")]
    #[case(Duration::days(800), "2 years ago")]
    fn test_pretty_elapsed(#[case] elapsed: Duration, #[case] expected: &str) {
        let now = Utc::now();
        assert_eq!(pretty_elapsed(now - elapsed, now), expected);
    }

    #[test]
    fn test_unroutable_reply_message() {
        let err = BotError::UnroutableReply { event: "ready" };
        assert_eq!(err.to_string(), "Unrecognized command type `ready`");
    }
}
