//! Habit entity and related functionality
//!
//! This module defines the Habit struct that represents something the user
//! wants to do on a repeating schedule, along with its validation rules.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{DomainError, HabitId, HabitKind, RepeatRule};

/// A habit the user wants to keep up
///
/// The creation day is fixed once the habit exists; it lower-bounds every
/// trackability and streak computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// Display name (e.g., "Morning Run", "Drink water")
    pub name: String,
    /// Yes/no habit or a counted target
    pub kind: HabitKind,
    /// Which days the habit is due
    pub rule: RepeatRule,
    /// Free-form grouping label ("Health", "Morning routine")
    pub group: String,
    /// Local calendar day the habit was created
    created_on: NaiveDate,
}

impl Habit {
    /// Create a new habit with validation
    pub fn new(
        name: String,
        kind: HabitKind,
        rule: RepeatRule,
        group: String,
        created_on: NaiveDate,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        kind.validate()?;
        Self::validate_rule(&rule)?;

        Ok(Self {
            id: HabitId::new(),
            name: name.trim().to_string(),
            kind,
            rule,
            group: group.trim().to_string(),
            created_on,
        })
    }

    /// Create a habit from existing data (used when loading from database)
    pub fn from_existing(
        id: HabitId,
        name: String,
        kind: HabitKind,
        rule: RepeatRule,
        group: String,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            rule,
            group,
            created_on,
        }
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_on
    }

    /// Update the habit's properties with validation
    ///
    /// The creation day cannot change.
    pub fn update(
        &mut self,
        name: Option<String>,
        kind: Option<HabitKind>,
        rule: Option<RepeatRule>,
        group: Option<String>,
    ) -> Result<(), DomainError> {
        if let Some(ref new_name) = name {
            Self::validate_name(new_name)?;
        }
        if let Some(ref new_kind) = kind {
            new_kind.validate()?;
        }
        if let Some(ref new_rule) = rule {
            Self::validate_rule(new_rule)?;
        }

        if let Some(new_name) = name {
            self.name = new_name.trim().to_string();
        }
        if let Some(new_kind) = kind {
            self.kind = new_kind;
        }
        if let Some(new_rule) = rule {
            self.rule = new_rule;
        }
        if let Some(new_group) = group {
            self.group = new_group.trim().to_string();
        }

        Ok(())
    }

    /// Target display for countable habits (e.g., "8x")
    pub fn target_display(&self) -> Option<String> {
        match self.kind {
            HabitKind::Countable { target } => Some(format!("{}x", target)),
            HabitKind::Binary => None,
        }
    }

    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidName("Habit name cannot be empty".to_string()));
        }

        if trimmed.len() > 100 {
            return Err(DomainError::InvalidName(
                "Habit name cannot be longer than 100 characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Habits repeat daily, on weekdays or on month days
    fn validate_rule(rule: &RepeatRule) -> Result<(), DomainError> {
        match rule {
            RepeatRule::Daily | RepeatRule::Weekly { .. } | RepeatRule::Monthly { .. } => Ok(()),
            other => Err(DomainError::InvalidRepeatRule(format!(
                "Habits repeat daily, weekly or monthly, got '{}'",
                other.label()
            ))),
        }
    }
}
