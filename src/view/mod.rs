//! What each screen shows, selected from the store. Markup is someone
//! else's problem; these functions only decide which records appear and in
//! what order.

pub mod cards;

use crate::core::activity::ActivityEntry;
use crate::core::daily_task::DailyTask;
use crate::core::task::{Priority, Task};
use crate::store::UserDataStore;

pub const RECENT_TASK_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardCounts {
    pub active_tasks: usize,
    pub projects: usize,
    pub active_daily_tasks: usize,
    pub completed_today: usize,
}

pub fn dashboard_counts(store: &UserDataStore) -> DashboardCounts {
    let today = store.today();
    let tasks = store.tasks();
    DashboardCounts {
        active_tasks: tasks.iter().filter(|t| t.status.is_active()).count(),
        projects: store.projects().len(),
        active_daily_tasks: store.daily_tasks().iter().filter(|t| t.is_active()).count(),
        completed_today: tasks
            .iter()
            .filter(|t| t.completed_on(today, store.clock()))
            .count(),
    }
}

/// Newest active tasks first, at most [`RECENT_TASK_LIMIT`].
pub fn recent_tasks(store: &UserDataStore) -> Vec<&Task> {
    let mut tasks: Vec<&Task> = store
        .tasks()
        .iter()
        .filter(|t| t.status.is_active())
        .collect();
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tasks.truncate(RECENT_TASK_LIMIT);
    tasks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    High,
    Today,
    Overdue,
}

impl TaskFilter {
    pub const ALL: [TaskFilter; 4] = [Self::All, Self::High, Self::Today, Self::Overdue];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "high" => Some(Self::High),
            "today" => Some(Self::Today),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Self::All => "tasks.filters.all",
            Self::High => "tasks.filters.high",
            Self::Today => "tasks.filters.today",
            Self::Overdue => "tasks.filters.overdue",
        }
    }
}

/// Active tasks matching `filter`, in stored order.
pub fn filter_tasks(store: &UserDataStore, filter: TaskFilter) -> Vec<&Task> {
    let today = store.today();
    store
        .tasks()
        .iter()
        .filter(|t| t.status.is_active())
        .filter(|t| match filter {
            TaskFilter::All => true,
            TaskFilter::High => t.priority == Priority::High,
            TaskFilter::Today => t.is_due_on(today),
            TaskFilter::Overdue => t.is_overdue(today),
        })
        .collect()
}

pub fn completed_tasks(store: &UserDataStore) -> Vec<&Task> {
    store
        .tasks()
        .iter()
        .filter(|t| t.status.is_done())
        .collect()
}

/// Active daily tasks scheduled for today, in stored order.
pub fn todays_daily_tasks(store: &UserDataStore) -> Vec<&DailyTask> {
    store.daily_tasks_due_today().collect()
}

/// Activity log, newest first.
pub fn activity_feed(store: &UserDataStore) -> Vec<&ActivityEntry> {
    let mut entries: Vec<&ActivityEntry> = store.activity_log().iter().rev().collect();
    // Stable sort keeps later-appended entries first among equal timestamps.
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::Action;
    use crate::core::daily_task::NewDailyTask;
    use crate::core::date::{Clock, Day};
    use crate::core::document::UserDocument;
    use crate::core::profile::Profile;
    use crate::core::task::NewTask;
    use chrono::{Duration, NaiveDate};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn store() -> UserDataStore {
        let clock = Clock::fixed_on(d(10));
        let doc = UserDocument::empty(Profile::new("Ada", "ada@example.com", clock.now()));
        UserDataStore::new("uid-1", doc, clock)
    }

    #[test]
    fn counts() {
        let mut store = store();
        let a = store.create_task(NewTask::titled("A")).unwrap().id;
        store.create_task(NewTask::titled("B")).unwrap();
        store.complete_task(&a).unwrap();
        let daily = store
            .create_daily_task(NewDailyTask { title: "Walk".into(), ..Default::default() })
            .unwrap()
            .id;
        store
            .create_daily_task(NewDailyTask { title: "Swim".into(), ..Default::default() })
            .unwrap();
        store.toggle_daily_task_status(&daily).unwrap();

        let counts = dashboard_counts(&store);
        assert_eq!(
            counts,
            DashboardCounts {
                active_tasks: 1,
                projects: 0,
                active_daily_tasks: 1,
                completed_today: 1,
            }
        );
    }

    #[test]
    fn recent_is_newest_active_six() {
        let mut store = store();
        let base = store.now();
        for i in 0..8 {
            store.set_clock(Clock::Fixed(base + Duration::minutes(i)));
            store.create_task(NewTask::titled(format!("T{}", i))).unwrap();
        }
        let newest = store.tasks()[7].id.clone();
        store.complete_task(&newest).unwrap();

        let titles: Vec<&str> = recent_tasks(&store).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["T6", "T5", "T4", "T3", "T2", "T1"]);
    }

    #[test]
    fn filters() {
        let mut store = store();
        store
            .create_task(NewTask {
                title: "Late".into(),
                due_date: Some(d(8)),
                ..Default::default()
            })
            .unwrap();
        store
            .create_task(NewTask {
                title: "Now".into(),
                priority: Priority::High,
                ..Default::default()
            })
            .unwrap();
        store
            .create_task(NewTask {
                title: "Later".into(),
                due_date: Some(d(20)),
                ..Default::default()
            })
            .unwrap();

        let titles = |filter| -> Vec<String> {
            filter_tasks(&store, filter).iter().map(|t| t.title.clone()).collect()
        };
        assert_eq!(titles(TaskFilter::All).len(), 3);
        assert_eq!(titles(TaskFilter::High), ["Now"]);
        assert_eq!(titles(TaskFilter::Today), ["Now"]);
        assert_eq!(titles(TaskFilter::Overdue), ["Late"]);
        assert_eq!(TaskFilter::from_name("overdue"), Some(TaskFilter::Overdue));
    }

    #[test]
    fn todays_daily_tasks_follow_schedule() {
        let mut store = store();
        store
            .create_daily_task(NewDailyTask {
                title: "Weekends".into(),
                days: [Day::Sat, Day::Sun].into_iter().collect(),
                ..Default::default()
            })
            .unwrap();
        store
            .create_daily_task(NewDailyTask { title: "Always".into(), ..Default::default() })
            .unwrap();
        let titles: Vec<&str> = todays_daily_tasks(&store)
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, ["Always"]);
    }

    #[test]
    fn feed_is_newest_first() {
        let mut store = store();
        store.append_activity(Action::TaskCreated, "first", None);
        store.append_activity(Action::TaskCompleted, "second", None);
        let feed: Vec<&str> = activity_feed(&store)
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(feed, ["second", "first"]);
    }
}
