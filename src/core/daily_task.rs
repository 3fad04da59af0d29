use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::date::{lenient, Day};
use super::new_id;
use super::streak;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DailyTaskStatus {
    #[default]
    Active,
    Inactive,
}

impl DailyTaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    #[default]
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(default, rename = "type")]
    pub kind: RecurrenceType,
    #[serde(default)]
    pub days: BTreeSet<Day>,
    /// `HH:MM`, local to `time_zone`.
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub time_zone: String,
}

fn default_time() -> String {
    "08:00".to_string()
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            kind: RecurrenceType::Weekly,
            days: Day::ALL.into_iter().collect(),
            time: default_time(),
            time_zone: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    #[serde(default = "enabled")]
    pub enable: bool,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default = "default_advance")]
    pub advance_minutes: u32,
}

fn enabled() -> bool {
    true
}

fn default_methods() -> Vec<String> {
    vec!["push".to_string()]
}

fn default_advance() -> u32 {
    15
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enable: true,
            methods: default_methods(),
            advance_minutes: default_advance(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub reminder: Reminder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default, deserialize_with = "lenient::date_set")]
    pub completed_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
}

/// A recurring task completed at most once per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: DailyTaskStatus,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// When a daily task next comes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOccurrence {
    Today,
    On(Day),
}

impl DailyTask {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            status: DailyTaskStatus::Active,
            schedule: Schedule::default(),
            progress: Progress::default(),
            created_at: now,
            updated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DailyTaskStatus::Active
    }

    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        self.schedule.recurrence.days.contains(&Day::of(date))
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.progress.completed_dates.contains(&date)
    }

    /// Record a completion. Returns false if `date` was already recorded.
    pub fn mark_complete(&mut self, date: NaiveDate, today: NaiveDate) -> bool {
        if !self.progress.completed_dates.insert(date) {
            return false;
        }
        self.recalculate_streak(today);
        true
    }

    /// Remove a completion. Returns false if `date` was not recorded.
    pub fn mark_incomplete(&mut self, date: NaiveDate, today: NaiveDate) -> bool {
        if !self.progress.completed_dates.remove(&date) {
            return false;
        }
        self.recalculate_streak(today);
        true
    }

    /// Recompute the current streak; the longest streak only ever grows.
    pub fn recalculate_streak(&mut self, today: NaiveDate) {
        let progress = &mut self.progress;
        progress.current_streak = streak::current_streak(&progress.completed_dates, today);
        if progress.current_streak > progress.longest_streak {
            progress.longest_streak = progress.current_streak;
        }
    }

    /// Next scheduled day counting today, wrapping into next week.
    pub fn next_occurrence(&self, today: NaiveDate) -> Option<NextOccurrence> {
        let days = &self.schedule.recurrence.days;
        let current = Day::of(today);
        if days.contains(&current) {
            return Some(NextOccurrence::Today);
        }
        days.iter()
            .find(|d| **d > current)
            .or_else(|| days.iter().next())
            .map(|d| NextOccurrence::On(*d))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewDailyTask {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Empty means every day.
    pub days: BTreeSet<Day>,
    pub time: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DailyTaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub days: Option<BTreeSet<Day>>,
    pub time: Option<String>,
    pub reminder: Option<Reminder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn completion_is_idempotent() {
        let mut task = DailyTask::new("Stretch", Utc::now());
        assert!(task.mark_complete(d(10), d(10)));
        assert!(!task.mark_complete(d(10), d(10)));
        assert_eq!(task.progress.completed_dates.len(), 1);
        assert_eq!(task.progress.current_streak, 1);
    }

    #[test]
    fn longest_streak_never_drops() {
        let mut task = DailyTask::new("Read", Utc::now());
        for day in 7..=10 {
            task.mark_complete(d(day), d(10));
        }
        assert_eq!(task.progress.current_streak, 4);
        assert_eq!(task.progress.longest_streak, 4);

        task.mark_incomplete(d(9), d(10));
        assert_eq!(task.progress.current_streak, 1);
        assert_eq!(task.progress.longest_streak, 4);

        task.mark_incomplete(d(10), d(10));
        assert_eq!(task.progress.current_streak, 0);
        assert_eq!(task.progress.longest_streak, 4);
    }

    #[test]
    fn next_occurrence_wraps_week() {
        let mut task = DailyTask::new("Gym", Utc::now());
        task.schedule.recurrence.days = [Day::Mon, Day::Tue].into_iter().collect();
        // 2024-01-10 is a Wednesday
        assert_eq!(task.next_occurrence(d(10)), Some(NextOccurrence::On(Day::Mon)));
        // 2024-01-08 is a Monday
        assert_eq!(task.next_occurrence(d(8)), Some(NextOccurrence::Today));
        task.schedule.recurrence.days.insert(Day::Fri);
        assert_eq!(task.next_occurrence(d(10)), Some(NextOccurrence::On(Day::Fri)));
        task.schedule.recurrence.days.clear();
        assert_eq!(task.next_occurrence(d(10)), None);
    }

    #[test]
    fn legacy_days_and_dates_parse() {
        let json = serde_json::json!({
            "id": "abc",
            "title": "Walk",
            "schedule": {
                "recurrence": { "type": "weekly", "days": ["mon", "wed"], "time": "07:30" }
            },
            "progress": { "completedDates": ["2024-01-09", "2024-01-09", ""] }
        });
        let task: DailyTask = serde_json::from_value(json).unwrap();
        assert_eq!(task.schedule.recurrence.days.len(), 2);
        assert_eq!(task.progress.completed_dates.len(), 1);
        assert!(task.schedule.reminder.enable);
    }
}
