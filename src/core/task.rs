use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::date::{lenient, Clock};
use super::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Active,
    Completed,
}

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_done()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Translation key for the badge text.
    pub fn label_key(&self) -> &'static str {
        match self {
            Self::High => "tasks.priority.high",
            Self::Medium => "tasks.priority.medium",
            Self::Low => "tasks.priority.low",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Self::High => "priority-high",
            Self::Medium => "priority-medium",
            Self::Low => "priority-low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Single,
    Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub task_type: TaskType,
    /// Meaningful only for single tasks, but kept for every type.
    #[serde(default, deserialize_with = "lenient::date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            project_id: None,
            priority: Priority::default(),
            task_type: TaskType::Single,
            due_date: None,
            start_date: None,
            end_date: None,
            labels: Vec::new(),
            status: TaskStatus::Active,
            created_at: now,
            completed_at: None,
            updated_at: None,
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
    }

    pub fn reopen(&mut self) {
        self.status = TaskStatus::Active;
        self.completed_at = None;
    }

    /// The date a task is judged against: due date for single tasks, end
    /// date for ranges.
    pub fn deadline(&self) -> Option<NaiveDate> {
        match self.task_type {
            TaskType::Single => self.due_date,
            TaskType::Range => self.end_date.or(self.due_date),
        }
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.status.is_active() && self.deadline() == Some(date)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_active() && self.deadline().is_some_and(|d| d < today)
    }

    pub fn completed_on(&self, date: NaiveDate, clock: &Clock) -> bool {
        self.status.is_done() && self.completed_at.is_some_and(|at| clock.date_of(at) == date)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Trim labels, drop empties and duplicates, keep first-seen order.
pub fn clean_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.as_ref().trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub project_id: Option<String>,
    pub priority: Priority,
    pub task_type: TaskType,
    pub due_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub labels: Vec<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Field changes for an existing task. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` detaches the task from its project.
    pub project_id: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub task_type: Option<TaskType>,
    pub due_date: Option<Option<NaiveDate>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub labels: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.project_id.is_none()
            && self.priority.is_none()
            && self.task_type.is_none()
            && self.due_date.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.labels.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_cleaned() {
        let labels = clean_labels([" work ", "", "home", "work", "  "]);
        assert_eq!(labels, vec!["work".to_string(), "home".to_string()]);
    }

    #[test]
    fn complete_and_reopen() {
        let now = Utc::now();
        let mut task = Task::new("Write report", now);
        task.complete(now);
        assert!(task.status.is_done());
        assert_eq!(task.completed_at, Some(now));
        task.reopen();
        assert!(task.status.is_active());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn range_deadline_is_end_date() {
        let now = Utc::now();
        let mut task = Task::new("Trip", now);
        task.task_type = TaskType::Range;
        task.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        task.end_date = NaiveDate::from_ymd_opt(2024, 1, 5);
        let today = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert!(task.is_overdue(today));
        assert!(task.is_due_on(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
    }

    #[test]
    fn reads_loose_legacy_shape() {
        let json = serde_json::json!({
            "id": "lq3k9x",
            "title": "Old task",
            "priority": "high",
            "dueDate": "",
            "startDate": null,
            "createdAt": "2023-05-01T10:00:00.000Z",
            "subtasks": [],
            "assignedTo": "uid-1"
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, None);
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.task_type, TaskType::Single);
    }
}
