//! Schedule policy types

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Recurrence policy of a pipeline
///
/// The set is closed. Tokens that don't name a known policy resolve to
/// `None`, which never triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePolicy {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl SchedulePolicy {
    /// Resolves a schedule token from a pipeline definition
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("daily") => SchedulePolicy::Daily,
            Some("weekly") => SchedulePolicy::Weekly,
            Some("monthly") => SchedulePolicy::Monthly,
            _ => SchedulePolicy::None,
        }
    }

    /// Interval between two runs, `None` for pipelines that never recur
    ///
    /// A month is four weeks.
    pub fn recurrence(&self) -> Option<TimeDelta> {
        match self {
            SchedulePolicy::None => None,
            SchedulePolicy::Daily => Some(TimeDelta::days(1)),
            SchedulePolicy::Weekly => Some(TimeDelta::weeks(1)),
            SchedulePolicy::Monthly => Some(TimeDelta::weeks(4)),
        }
    }
}

impl std::fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulePolicy::None => write!(f, "none"),
            SchedulePolicy::Daily => write!(f, "daily"),
            SchedulePolicy::Weekly => write!(f, "weekly"),
            SchedulePolicy::Monthly => write!(f, "monthly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tokens() {
        assert_eq!(SchedulePolicy::from_token(Some("daily")), SchedulePolicy::Daily);
        assert_eq!(SchedulePolicy::from_token(Some("weekly")), SchedulePolicy::Weekly);
        assert_eq!(SchedulePolicy::from_token(Some("monthly")), SchedulePolicy::Monthly);
    }

    #[test]
    fn test_unknown_and_absent_tokens_never_recur() {
        for token in [None, Some(""), Some("hourly"), Some("Daily"), Some("none")] {
            let policy = SchedulePolicy::from_token(token);
            assert_eq!(policy, SchedulePolicy::None);
            assert_eq!(policy.recurrence(), None);
        }
    }

    #[test]
    fn test_recurrence_durations() {
        assert_eq!(SchedulePolicy::Daily.recurrence(), Some(TimeDelta::hours(24)));
        assert_eq!(SchedulePolicy::Weekly.recurrence(), Some(TimeDelta::days(7)));
        assert_eq!(SchedulePolicy::Monthly.recurrence(), Some(TimeDelta::days(28)));
    }
}
