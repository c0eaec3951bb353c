//! Schedule-due evaluation
//!
//! Decides whether a pipeline should run now given its recurrence policy and
//! the timestamp of its last run. Pure: nothing here reads storage or clocks.

use chrono::{DateTime, Utc};
use quarry_core::domain::schedule::SchedulePolicy;

/// Recurrence settings of one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub policy: SchedulePolicy,
    pub disabled: bool,
}

impl Schedule {
    pub fn new(policy: SchedulePolicy, disabled: bool) -> Self {
        Self { policy, disabled }
    }

    /// Whether the pipeline could ever become due
    ///
    /// When this is false `is_due` returns false without looking at the
    /// last-run timestamp, so callers can skip fetching it.
    pub fn is_active(&self) -> bool {
        !self.disabled && self.policy.recurrence().is_some()
    }

    /// Whether the pipeline is due at `now`
    ///
    /// A pipeline that never ran is due immediately. Otherwise it is due once
    /// strictly more than one recurrence interval has elapsed.
    pub fn is_due(&self, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if self.disabled {
            return false;
        }
        let Some(interval) = self.policy.recurrence() else {
            return false;
        };
        match last_run {
            None => true,
            Some(last_run) => now > last_run + interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use proptest::prelude::*;

    const POLICIES: [SchedulePolicy; 3] = [
        SchedulePolicy::Daily,
        SchedulePolicy::Weekly,
        SchedulePolicy::Monthly,
    ];

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_daily_scenarios() {
        let schedule = Schedule::new(SchedulePolicy::Daily, false);
        let now = Utc::now();

        assert!(schedule.is_due(Some(now - TimeDelta::hours(25)), now));
        assert!(!schedule.is_due(Some(now - TimeDelta::hours(23)), now));
    }

    #[test]
    fn test_exact_boundary_is_not_due() {
        for policy in POLICIES {
            let schedule = Schedule::new(policy, false);
            let last_run = at(1_700_000_000);
            let boundary = last_run + policy.recurrence().unwrap();

            assert!(!schedule.is_due(Some(last_run), boundary));
            assert!(schedule.is_due(Some(last_run), boundary + TimeDelta::seconds(1)));
        }
    }

    #[test]
    fn test_never_run_is_due() {
        let schedule = Schedule::new(SchedulePolicy::Weekly, false);
        assert!(schedule.is_due(None, Utc::now()));
    }

    #[test]
    fn test_no_policy_is_never_due() {
        let schedule = Schedule::new(SchedulePolicy::None, false);
        assert!(!schedule.is_active());
        assert!(!schedule.is_due(None, Utc::now()));
        assert!(!schedule.is_due(Some(at(0)), Utc::now()));
    }

    #[test]
    fn test_disabled_short_circuits() {
        let schedule = Schedule::new(SchedulePolicy::Daily, true);
        assert!(!schedule.is_active());
        assert!(!schedule.is_due(None, Utc::now()));
    }

    proptest! {
        #[test]
        fn due_iff_elapsed_exceeds_recurrence(
            policy_idx in 0usize..3,
            last in 0i64..4_000_000_000,
            elapsed in 1i64..10_000_000,
        ) {
            let policy = POLICIES[policy_idx];
            let schedule = Schedule::new(policy, false);
            let last_run = at(last);
            let now = at(last + elapsed);
            let expected = TimeDelta::seconds(elapsed) > policy.recurrence().unwrap();
            prop_assert_eq!(schedule.is_due(Some(last_run), now), expected);
        }

        #[test]
        fn disabled_is_never_due(
            policy_idx in 0usize..3,
            last in proptest::option::of(0i64..4_000_000_000),
            now in 0i64..4_000_000_000,
        ) {
            let schedule = Schedule::new(POLICIES[policy_idx], true);
            prop_assert!(!schedule.is_due(last.map(at), at(now)));
        }

        #[test]
        fn never_run_is_always_due(policy_idx in 0usize..3, now in 0i64..4_000_000_000) {
            let schedule = Schedule::new(POLICIES[policy_idx], false);
            prop_assert!(schedule.is_due(None, at(now)));
        }

        #[test]
        fn idempotent(last in 0i64..4_000_000_000, now in 0i64..4_000_000_000) {
            let schedule = Schedule::new(SchedulePolicy::Daily, false);
            let first = schedule.is_due(Some(at(last)), at(now));
            prop_assert_eq!(first, schedule.is_due(Some(at(last)), at(now)));
        }
    }
}
