use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::date::lenient;

/// Entries kept in the activity log; older ones are evicted first.
pub const ACTIVITY_LOG_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TaskCreated,
    TaskEdited,
    TaskCompleted,
    TaskUncompleted,
    TaskDeleted,
    ProjectCreated,
    ProjectEdited,
    ProjectDeleted,
    DailyTaskCreated,
    DailyTaskEdited,
    DailyTaskToggled,
    DailyTaskCompleted,
    DailyTaskUncompleted,
    DailyTaskDeleted,
    ItemsReordered,
    ProfileUpdated,
    PhotoRemoved,
    PreferencesUpdated,
    DataMigrated,
    UserCreated,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskEdited => "task_edited",
            Self::TaskCompleted => "task_completed",
            Self::TaskUncompleted => "task_uncompleted",
            Self::TaskDeleted => "task_deleted",
            Self::ProjectCreated => "project_created",
            Self::ProjectEdited => "project_edited",
            Self::ProjectDeleted => "project_deleted",
            Self::DailyTaskCreated => "daily_task_created",
            Self::DailyTaskEdited => "daily_task_edited",
            Self::DailyTaskToggled => "daily_task_toggled",
            Self::DailyTaskCompleted => "daily_task_completed",
            Self::DailyTaskUncompleted => "daily_task_uncompleted",
            Self::DailyTaskDeleted => "daily_task_deleted",
            Self::ItemsReordered => "items_reordered",
            Self::ProfileUpdated => "profile_updated",
            Self::PhotoRemoved => "photo_removed",
            Self::PreferencesUpdated => "preferences_updated",
            Self::DataMigrated => "data_migrated",
            Self::UserCreated => "user_created",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// Free-form so entries written by older clients survive.
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        action: Action,
        description: impl Into<String>,
        task_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.as_str().to_string(),
            description: description.into(),
            task_id,
            timestamp: now,
        }
    }
}

/// Append and drop the oldest entries beyond the limit.
pub fn push_bounded(log: &mut Vec<ActivityEntry>, entry: ActivityEntry) {
    log.push(entry);
    truncate_oldest(log);
}

pub fn truncate_oldest(log: &mut Vec<ActivityEntry>) {
    if log.len() > ACTIVITY_LOG_LIMIT {
        let excess = log.len() - ACTIVITY_LOG_LIMIT;
        log.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_most_recent_hundred() {
        let now = Utc::now();
        let mut log = Vec::new();
        for i in 0..150 {
            push_bounded(
                &mut log,
                ActivityEntry::new(Action::TaskCreated, format!("#{}", i), None, now),
            );
        }
        assert_eq!(log.len(), ACTIVITY_LOG_LIMIT);
        assert_eq!(log.first().unwrap().description, "#50");
        assert_eq!(log.last().unwrap().description, "#149");
        let order: Vec<usize> = log
            .iter()
            .map(|e| e.description.trim_start_matches('#').parse().unwrap())
            .collect();
        assert_eq!(order, (50..150).collect::<Vec<_>>());
    }
}
