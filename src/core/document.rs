use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::activity::ActivityEntry;
use super::budget::Budget;
use super::daily_task::DailyTask;
use super::profile::{Preferences, Profile};
use super::project::Project;
use super::task::Task;

/// Everything stored for one principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub profile: Profile,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub daily_tasks: Vec<DailyTask>,
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
    #[serde(default)]
    pub budget: Budget,
}

impl UserDocument {
    pub fn empty(profile: Profile) -> Self {
        Self {
            profile,
            preferences: Preferences::default(),
            projects: Vec::new(),
            tasks: Vec::new(),
            daily_tasks: Vec::new(),
            activity_log: Vec::new(),
            budget: Budget::default(),
        }
    }

    /// Current value of a field, ready for a whole-field overwrite.
    pub fn field_value(&self, field: Field) -> Result<Value, serde_json::Error> {
        match field {
            Field::Profile => serde_json::to_value(&self.profile),
            Field::Preferences => serde_json::to_value(&self.preferences),
            Field::PreferredLanguage => serde_json::to_value(self.preferences.language),
            Field::Projects => serde_json::to_value(&self.projects),
            Field::Tasks => serde_json::to_value(&self.tasks),
            Field::DailyTasks => serde_json::to_value(&self.daily_tasks),
            Field::ActivityLog => serde_json::to_value(&self.activity_log),
            Field::Budget => serde_json::to_value(&self.budget),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.profile.created_at
    }
}

/// A persisted field of the user document, addressed by its stored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Profile,
    Preferences,
    /// `preferences.language` on its own, written when only the locale changes.
    PreferredLanguage,
    Projects,
    Tasks,
    DailyTasks,
    ActivityLog,
    Budget,
}

impl Field {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Preferences => "preferences",
            Self::PreferredLanguage => "preferences.language",
            Self::Projects => "projects",
            Self::Tasks => "tasks",
            Self::DailyTasks => "dailyTasks",
            Self::ActivityLog => "activityLog",
            Self::Budget => "budget",
        }
    }

    /// True when writing `self` already covers `other`.
    pub fn covers(&self, other: Field) -> bool {
        *self == other || (*self == Field::Preferences && other == Field::PreferredLanguage)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locale::Locale;

    #[test]
    fn field_values_use_stored_names() {
        let mut doc = UserDocument::empty(Profile::new("Ada", "ada@example.com", Utc::now()));
        doc.preferences.language = Locale::De;
        doc.tasks.push(Task::new("One", Utc::now()));

        let tasks = doc.field_value(Field::Tasks).unwrap();
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert!(tasks[0].get("createdAt").is_some());
        assert_eq!(doc.field_value(Field::PreferredLanguage).unwrap(), "de");

        let whole = serde_json::to_value(&doc).unwrap();
        assert!(whole.get("dailyTasks").is_some());
        assert!(whole.get("activityLog").is_some());
    }

    #[test]
    fn preferences_cover_language() {
        assert!(Field::Preferences.covers(Field::PreferredLanguage));
        assert!(!Field::PreferredLanguage.covers(Field::Preferences));
        assert!(Field::Tasks.covers(Field::Tasks));
    }
}
