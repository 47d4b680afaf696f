//! Core types and enums used throughout the domain layer
//!
//! This module defines the identifier newtypes and the repeat rule that
//! drives recurrence generation, trackability and streak accounting.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Declares a UUID-backed identifier so a habit id can never be passed where
/// a task id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from its string form (used when loading rows)
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a habit
    HabitId
);
uuid_id!(
    /// Unique identifier for a habit entry
    EntryId
);
uuid_id!(
    /// Unique identifier for a single task row
    TaskId
);
uuid_id!(
    /// Shared identifier of every task row materialized from one recurring task
    RepeatGroupId
);
uuid_id!(
    /// Unique identifier for a logged focus session
    SessionId
);

/// How an item repeats
///
/// Weekdays are numbered 0 (Sunday) through 6 (Saturday). Month days are
/// 1-based. Empty day sets are allowed and simply never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepeatRule {
    /// One-off item
    None,
    /// Every day
    Daily,
    /// Selected days of the week
    Weekly {
        #[serde(rename = "daysOfWeek", default)]
        days_of_week: BTreeSet<u8>,
    },
    /// Selected days of the month
    Monthly {
        #[serde(rename = "daysOfMonth", default)]
        days_of_month: BTreeSet<u8>,
    },
    /// Once a week, on the anchor's weekday
    EveryWeek,
    /// Once a month, on the anchor's day of month
    EveryMonth,
}

impl Default for RepeatRule {
    fn default() -> Self {
        RepeatRule::None
    }
}

impl RepeatRule {
    pub fn weekly<I: IntoIterator<Item = u8>>(days: I) -> Self {
        RepeatRule::Weekly { days_of_week: days.into_iter().collect() }
    }

    pub fn monthly<I: IntoIterator<Item = u8>>(days: I) -> Self {
        RepeatRule::Monthly { days_of_month: days.into_iter().collect() }
    }

    /// Whether this rule produces more than one occurrence
    pub fn repeats(&self) -> bool {
        !matches!(self, RepeatRule::None)
    }

    /// Short label for listings
    pub fn label(&self) -> &'static str {
        match self {
            RepeatRule::None => "none",
            RepeatRule::Daily => "daily",
            RepeatRule::Weekly { .. } => "weekly",
            RepeatRule::Monthly { .. } => "monthly",
            RepeatRule::EveryWeek => "every_week",
            RepeatRule::EveryMonth => "every_month",
        }
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatRule::Weekly { days_of_week } => write!(f, "weekly {:?}", days_of_week),
            RepeatRule::Monthly { days_of_month } => write!(f, "monthly {:?}", days_of_month),
            other => f.write_str(other.label()),
        }
    }
}

/// Whether a habit is a yes/no check or a counted target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HabitKind {
    Binary,
    Countable {
        #[serde(rename = "targetCount")]
        target: u32,
    },
}

impl HabitKind {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let HabitKind::Countable { target } = self {
            if *target == 0 {
                return Err(DomainError::InvalidValue {
                    message: "Target count must be at least 1".to_string(),
                });
            }
            if *target > 1000 {
                return Err(DomainError::InvalidValue {
                    message: "Target count cannot exceed 1000".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Which way a running timer counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Counts down from an initial duration
    Timer,
    /// Counts up from the banked total
    Stopwatch,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Timer => "timer",
            TimerMode::Stopwatch => "stopwatch",
        }
    }
}

/// The view a task belongs to; each scope only allows some repeat rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskScope {
    Today,
    Week,
    Month,
}

impl TaskScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskScope::Today => "today",
            TaskScope::Week => "week",
            TaskScope::Month => "month",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(TaskScope::Today),
            "week" => Ok(TaskScope::Week),
            "month" => Ok(TaskScope::Month),
            other => Err(DomainError::Validation {
                message: format!("Invalid scope '{}'. Valid options: today, week, month", other),
            }),
        }
    }

    /// Check that `rule` is offered for this scope
    pub fn allows(&self, rule: &RepeatRule) -> bool {
        match self {
            TaskScope::Today => matches!(
                rule,
                RepeatRule::None | RepeatRule::Daily | RepeatRule::Weekly { .. } | RepeatRule::Monthly { .. }
            ),
            TaskScope::Week => matches!(rule, RepeatRule::None | RepeatRule::EveryWeek),
            TaskScope::Month => matches!(rule, RepeatRule::None | RepeatRule::EveryMonth),
        }
    }

    /// Week and month tasks share one focus total across their repeat group
    pub fn shares_focus_across_group(&self) -> bool {
        matches!(self, TaskScope::Week | TaskScope::Month)
    }
}
