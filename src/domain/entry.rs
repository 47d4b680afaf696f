//! HabitEntry entity for tracking habit completions
//!
//! A habit has at most one entry per calendar day. Binary habits record a
//! completed flag, countable habits record how many times it was done.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{EntryId, HabitId, HabitKind, DomainError};

/// A record of a habit on a specific day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitEntry {
    /// Unique identifier for this entry
    pub id: EntryId,
    /// Which habit this entry is for
    pub habit_id: HabitId,
    /// Which day this entry is for
    pub date: NaiveDate,
    /// Completion flag (binary habits)
    pub completed: Option<bool>,
    /// Times done that day (countable habits)
    pub count: Option<u32>,
}

/// The only facts the streak engine needs about an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedEntry {
    pub date: NaiveDate,
    pub qualifies: bool,
}

impl HabitEntry {
    /// Entry marking a binary habit done (or undone) on `date`
    pub fn binary(habit_id: HabitId, date: NaiveDate, completed: bool) -> Self {
        Self {
            id: EntryId::new(),
            habit_id,
            date,
            completed: Some(completed),
            count: None,
        }
    }

    /// Entry recording a count for a countable habit on `date`
    pub fn counted(habit_id: HabitId, date: NaiveDate, count: u32) -> Result<Self, DomainError> {
        if count > 1000 {
            return Err(DomainError::InvalidValue {
                message: "Count cannot exceed 1000".to_string(),
            });
        }
        Ok(Self {
            id: EntryId::new(),
            habit_id,
            date,
            completed: None,
            count: Some(count),
        })
    }

    /// Create an entry from existing data (used when loading from database)
    pub fn from_existing(
        id: EntryId,
        habit_id: HabitId,
        date: NaiveDate,
        completed: Option<bool>,
        count: Option<u32>,
    ) -> Self {
        Self {
            id,
            habit_id,
            date,
            completed,
            count,
        }
    }

    /// Whether this entry counts as done for a habit of the given kind
    pub fn qualifies(&self, kind: &HabitKind) -> bool {
        match kind {
            HabitKind::Binary => self.completed.unwrap_or(false),
            HabitKind::Countable { target } => self.count.unwrap_or(0) >= *target,
        }
    }

    pub fn to_dated(&self, kind: &HabitKind) -> DatedEntry {
        DatedEntry {
            date: self.date,
            qualifies: self.qualifies(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::date::parse_date;

    #[test]
    fn test_binary_qualifies() {
        let day = parse_date("2024-01-01").unwrap();
        let done = HabitEntry::binary(HabitId::new(), day, true);
        let undone = HabitEntry::binary(HabitId::new(), day, false);

        assert!(done.qualifies(&HabitKind::Binary));
        assert!(!undone.qualifies(&HabitKind::Binary));
    }

    #[test]
    fn test_countable_needs_target() {
        let day = parse_date("2024-01-01").unwrap();
        let kind = HabitKind::Countable { target: 3 };

        assert!(!HabitEntry::counted(HabitId::new(), day, 2).unwrap().qualifies(&kind));
        assert!(HabitEntry::counted(HabitId::new(), day, 3).unwrap().qualifies(&kind));
        assert!(HabitEntry::counted(HabitId::new(), day, 5).unwrap().qualifies(&kind));
        // A binary flag on a countable habit never qualifies
        assert!(!HabitEntry::binary(HabitId::new(), day, true).qualifies(&kind));
    }

    #[test]
    fn test_count_limit() {
        let day = parse_date("2024-01-01").unwrap();
        assert!(HabitEntry::counted(HabitId::new(), day, 1001).is_err());
    }
}
