use chrono::NaiveDate;

use crate::core::activity::ActivityEntry;
use crate::core::daily_task::{DailyTask, NextOccurrence};
use crate::core::date::{self, Day, DueStatus};
use crate::core::project::{DEFAULT_PROJECT_COLOR, Project};
use crate::core::task::{Priority, Task, TaskType};
use crate::localize::TranslationStore;
use crate::store::UserDataStore;

/// `dd-mm-yyyy (Due in 3 days)`, or a placeholder when there is no date.
pub fn due_text(
    due: Option<NaiveDate>,
    today: NaiveDate,
    translations: &TranslationStore,
) -> String {
    let Some(due) = due else {
        return translations.t("dates.noDueDate");
    };
    let status = DueStatus::classify(due, today);
    let count = status.days().to_string();
    let relative = translations.resolve(status.label_key(), &[("count", count.as_str())]);
    format!("{} ({})", date::format_display(due), relative)
}

pub fn range_text(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    translations: &TranslationStore,
) -> String {
    match (start, end) {
        (Some(start), Some(end)) => {
            let span = match date::days_between(start, end) {
                0 => translations.t("dates.sameDay"),
                1 => translations.t("dates.oneDay"),
                n => {
                    let count = n.to_string();
                    translations.resolve("dates.days", &[("count", count.as_str())])
                }
            };
            format!(
                "{} - {} ({})",
                date::format_display(start),
                date::format_display(end),
                span
            )
        }
        (Some(start), None) => {
            let shown = date::format_display(start);
            translations.resolve("dates.starts", &[("date", shown.as_str())])
        }
        (None, Some(end)) => {
            let shown = date::format_display(end);
            translations.resolve("dates.due", &[("date", shown.as_str())])
        }
        (None, None) => translations.t("dates.noDates"),
    }
}

/// Short weekday names joined with commas.
pub fn days_text<'a>(
    days: impl IntoIterator<Item = &'a Day>,
    translations: &TranslationStore,
) -> String {
    let names: Vec<String> = days
        .into_iter()
        .map(|day| translations.t(&day.label_key()))
        .collect();
    if names.is_empty() {
        translations.t("dates.noDays")
    } else {
        names.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub priority: Priority,
    pub priority_label: String,
    pub priority_class: &'static str,
    /// Title of the owning project, if it still exists.
    pub project: Option<&'a str>,
    pub color: &'a str,
    pub due_text: String,
    pub labels: &'a [String],
    pub completed: bool,
    pub overdue: bool,
}

pub fn task_card<'a>(
    task: &'a Task,
    store: &'a UserDataStore,
    translations: &TranslationStore,
) -> TaskCard<'a> {
    let today = store.today();
    let project = task.project_id.as_deref().and_then(|id| store.project(id));
    let due_text = match task.task_type {
        TaskType::Single => due_text(task.due_date, today, translations),
        TaskType::Range => range_text(task.start_date, task.end_date, translations),
    };
    TaskCard {
        id: &task.id,
        title: &task.title,
        description: &task.description,
        priority: task.priority,
        priority_label: translations.t(task.priority.label_key()),
        priority_class: task.priority.css_class(),
        project: project.map(|p| p.title.as_str()),
        color: project.map_or(DEFAULT_PROJECT_COLOR, |p| p.color.as_str()),
        due_text,
        labels: &task.labels,
        completed: task.status.is_done(),
        overdue: task.is_overdue(today),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCard<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub color: &'a str,
    pub task_count: usize,
    pub task_count_text: String,
    pub done: usize,
    pub progress: f64,
}

pub fn project_card<'a>(
    project: &'a Project,
    store: &UserDataStore,
    translations: &TranslationStore,
) -> ProjectCard<'a> {
    let (done, total) = project.completion_ratio(store.tasks());
    let count = total.to_string();
    ProjectCard {
        id: &project.id,
        title: &project.title,
        description: &project.description,
        color: &project.color,
        task_count: total,
        task_count_text: translations.resolve("projects.taskCount", &[("count", count.as_str())]),
        done,
        progress: project.progress,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTaskCard<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub active: bool,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_text: String,
    pub days_text: String,
    pub time: &'a str,
    pub completed_today: bool,
    /// Active and scheduled for today.
    pub active_today: bool,
    /// Next scheduled day, set only when the task does not come up today.
    pub next_day: Option<Day>,
}

pub fn daily_task_card<'a>(
    daily: &'a DailyTask,
    today: NaiveDate,
    translations: &TranslationStore,
) -> DailyTaskCard<'a> {
    let recurrence = &daily.schedule.recurrence;
    let active_today = daily.is_active() && daily.is_scheduled_on(today);
    let next_day = if active_today {
        None
    } else {
        match daily.next_occurrence(today) {
            Some(NextOccurrence::On(day)) => Some(day),
            Some(NextOccurrence::Today) | None => None,
        }
    };
    let streak = daily.progress.current_streak.to_string();
    DailyTaskCard {
        id: &daily.id,
        title: &daily.title,
        description: &daily.description,
        category: &daily.category,
        active: daily.is_active(),
        current_streak: daily.progress.current_streak,
        longest_streak: daily.progress.longest_streak,
        streak_text: translations.resolve("dailyTasks.streak", &[("count", streak.as_str())]),
        days_text: days_text(&recurrence.days, translations),
        time: &recurrence.time,
        completed_today: daily.is_completed_on(today),
        active_today,
        next_day,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityItem<'a> {
    pub action: &'a str,
    pub description: &'a str,
    pub when: String,
}

pub fn activity_item(entry: &ActivityEntry) -> ActivityItem<'_> {
    ActivityItem {
        action: &entry.action,
        description: &entry.description,
        when: entry.timestamp.format("%d-%m-%Y %H:%M").to_string(),
    }
}
