use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::date::lenient;
use super::new_id;
use super::task::Task;

pub const DEFAULT_PROJECT_COLOR: &str = "#3AA8FF";

fn default_color() -> String {
    DEFAULT_PROJECT_COLOR.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

/// A named group of tasks. Tasks point at projects, not the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Fraction done, always within `0.0..=1.0`.
    #[serde(default)]
    pub progress: f64,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: String::new(),
            color: default_color(),
            progress: 0.0,
            created_at: now,
            members: Vec::new(),
            status: ProjectStatus::Active,
            updated_at: None,
        }
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.progress = clamp_progress(progress);
    }

    pub fn task_count(&self, tasks: &[Task]) -> usize {
        tasks
            .iter()
            .filter(|t| t.project_id.as_deref() == Some(self.id.as_str()))
            .count()
    }

    /// (done, total) over the tasks that belong to this project.
    pub fn completion_ratio(&self, tasks: &[Task]) -> (usize, usize) {
        let mine = tasks
            .iter()
            .filter(|t| t.project_id.as_deref() == Some(self.id.as_str()));
        let (mut done, mut total) = (0, 0);
        for task in mine {
            total += 1;
            if task.status.is_done() {
                done += 1;
            }
        }
        (done, total)
    }
}

pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub color: Option<String>,
}

impl NewProject {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub progress: Option<f64>,
    pub status: Option<ProjectStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped() {
        let mut p = Project::new("Garden", Utc::now());
        p.set_progress(1.7);
        assert_eq!(p.progress, 1.0);
        p.set_progress(-0.2);
        assert_eq!(p.progress, 0.0);
        p.set_progress(f64::NAN);
        assert_eq!(p.progress, 0.0);
    }

    #[test]
    fn counts_only_own_tasks() {
        let now = Utc::now();
        let p = Project::new("Garden", now);
        let mut a = Task::new("Dig", now);
        a.project_id = Some(p.id.clone());
        a.complete(now);
        let mut b = Task::new("Plant", now);
        b.project_id = Some(p.id.clone());
        let c = Task::new("Unrelated", now);
        let tasks = vec![a, b, c];
        assert_eq!(p.task_count(&tasks), 2);
        assert_eq!(p.completion_ratio(&tasks), (1, 2));
    }
}
