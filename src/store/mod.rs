pub mod migrate;

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

use crate::core::activity::{self, Action, ActivityEntry};
use crate::core::daily_task::{DailyTask, DailyTaskPatch, DailyTaskStatus, NewDailyTask};
use crate::core::date::{Clock, Day};
use crate::core::document::{Field, UserDocument};
use crate::core::locale::Locale;
use crate::core::profile::{Preferences, PreferencesPatch, Profile, ProfilePatch};
use crate::core::project::{NewProject, Project, ProjectPatch, clamp_progress};
use crate::core::reorder;
use crate::core::task::{NewTask, Task, TaskPatch, TaskType, clean_labels};
use crate::error::{StoreError, StoreResult};

/// The three collections users can drag to reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedCollection {
    Tasks,
    Projects,
    DailyTasks,
}

impl OrderedCollection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tasks" => Some(Self::Tasks),
            "projects" => Some(Self::Projects),
            "dailyTasks" => Some(Self::DailyTasks),
            _ => None,
        }
    }

    pub fn field(&self) -> Field {
        match self {
            Self::Tasks => Field::Tasks,
            Self::Projects => Field::Projects,
            Self::DailyTasks => Field::DailyTasks,
        }
    }
}

/// In-memory owner of one principal's document.
///
/// Every mutator either applies completely or returns an error and leaves the
/// document untouched. Fields changed since the last [`take_dirty`] are
/// tracked so the caller can hand exactly those to the remote store.
///
/// [`take_dirty`]: UserDataStore::take_dirty
#[derive(Debug, Clone)]
pub struct UserDataStore {
    principal_id: String,
    doc: UserDocument,
    clock: Clock,
    dirty: BTreeSet<Field>,
}

impl UserDataStore {
    pub fn new(principal_id: impl Into<String>, doc: UserDocument, clock: Clock) -> Self {
        Self {
            principal_id: principal_id.into(),
            doc,
            clock,
            dirty: BTreeSet::new(),
        }
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    pub fn document(&self) -> &UserDocument {
        &self.doc
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn profile(&self) -> &Profile {
        &self.doc.profile
    }

    pub fn preferences(&self) -> &Preferences {
        &self.doc.preferences
    }

    pub fn tasks(&self) -> &[Task] {
        &self.doc.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.doc.projects
    }

    pub fn daily_tasks(&self) -> &[DailyTask] {
        &self.doc.daily_tasks
    }

    pub fn activity_log(&self) -> &[ActivityEntry] {
        &self.doc.activity_log
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.doc.tasks.iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.doc.projects.iter().find(|p| p.id == id)
    }

    pub fn daily_task(&self, id: &str) -> Option<&DailyTask> {
        self.doc.daily_tasks.iter().find(|t| t.id == id)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.dirty.iter().copied()
    }

    /// Hand over the set of changed fields and start tracking afresh.
    pub fn take_dirty(&mut self) -> BTreeSet<Field> {
        std::mem::take(&mut self.dirty)
    }

    fn touch(&mut self, field: Field) {
        self.dirty.insert(field);
    }

    fn task_mut(&mut self, id: &str) -> StoreResult<&mut Task> {
        self.doc
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found("task", id))
    }

    fn project_mut(&mut self, id: &str) -> StoreResult<&mut Project> {
        self.doc
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("project", id))
    }

    fn daily_task_mut(&mut self, id: &str) -> StoreResult<&mut DailyTask> {
        self.doc
            .daily_tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found("daily task", id))
    }

    // Tasks

    pub fn create_task(&mut self, fields: NewTask) -> StoreResult<Task> {
        let title = required_title(&fields.title)?;
        if let Some(project_id) = &fields.project_id {
            if self.project(project_id).is_none() {
                return Err(StoreError::not_found("project", project_id.as_str()));
            }
        }

        let today = self.today();
        let mut task = Task::new(title, self.now());
        task.description = fields.description.trim().to_string();
        task.project_id = fields.project_id;
        task.priority = fields.priority;
        task.task_type = fields.task_type;
        task.labels = clean_labels(&fields.labels);
        match fields.task_type {
            TaskType::Single => {
                task.due_date = Some(fields.due_date.unwrap_or(today));
                task.start_date = fields.start_date;
                task.end_date = fields.end_date;
            }
            TaskType::Range => {
                let end = fields.end_date.or(fields.due_date).unwrap_or(today);
                check_range(fields.start_date, Some(end))?;
                task.start_date = fields.start_date;
                task.end_date = Some(end);
                task.due_date = Some(end);
            }
        }

        log::debug!("Created task {} ({})", task.id, task.title);
        self.doc.tasks.push(task.clone());
        self.touch(Field::Tasks);
        Ok(task)
    }

    /// Returns false when the task was already completed.
    pub fn complete_task(&mut self, id: &str) -> StoreResult<bool> {
        let now = self.now();
        let task = self.task_mut(id)?;
        if task.status.is_done() {
            return Ok(false);
        }
        task.complete(now);
        task.updated_at = Some(now);
        self.touch(Field::Tasks);
        Ok(true)
    }

    /// Returns false when the task was already active.
    pub fn uncomplete_task(&mut self, id: &str) -> StoreResult<bool> {
        let now = self.now();
        let task = self.task_mut(id)?;
        if task.status.is_active() {
            return Ok(false);
        }
        task.reopen();
        task.updated_at = Some(now);
        self.touch(Field::Tasks);
        Ok(true)
    }

    pub fn delete_task(&mut self, id: &str) -> StoreResult<Task> {
        let pos = self
            .doc
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found("task", id))?;
        let task = self.doc.tasks.remove(pos);
        self.touch(Field::Tasks);
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        let title = patch.title.as_deref().map(required_title).transpose()?;
        if let Some(Some(project_id)) = &patch.project_id {
            if self.project(project_id).is_none() {
                return Err(StoreError::not_found("project", project_id.as_str()));
            }
        }
        let now = self.now();
        let today = self.today();

        // Work on a copy so a rejected patch leaves the task as it was.
        let mut task = self.task_mut(id)?.clone();
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description.trim().to_string();
        }
        if let Some(project_id) = patch.project_id {
            task.project_id = project_id;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(labels) = patch.labels {
            task.labels = clean_labels(&labels);
        }
        if let Some(due) = patch.due_date {
            task.due_date = due;
        }
        if let Some(start) = patch.start_date {
            task.start_date = start;
        }
        if let Some(end) = patch.end_date {
            task.end_date = end;
        }
        if let Some(task_type) = patch.task_type {
            if task_type != task.task_type {
                // Switching to single drops the range. Switching to range
                // keeps the old due date as the end unless one was given.
                match task_type {
                    TaskType::Single => {
                        task.start_date = None;
                        task.end_date = None;
                    }
                    TaskType::Range => {
                        if task.end_date.is_none() {
                            task.end_date = task.due_date;
                        }
                    }
                }
            }
            task.task_type = task_type;
        }
        match task.task_type {
            TaskType::Single => {
                if task.due_date.is_none() {
                    task.due_date = Some(today);
                }
            }
            TaskType::Range => {
                let end = task.end_date.unwrap_or(today);
                check_range(task.start_date, Some(end))?;
                task.end_date = Some(end);
                task.due_date = Some(end);
            }
        }
        task.updated_at = Some(now);

        *self.task_mut(id)? = task;
        self.touch(Field::Tasks);
        Ok(())
    }

    // Projects

    pub fn create_project(&mut self, fields: NewProject) -> StoreResult<Project> {
        let title = required_title(&fields.title)?;
        let mut project = Project::new(title, self.now());
        project.description = fields.description.trim().to_string();
        if let Some(color) = fields.color.filter(|c| !c.trim().is_empty()) {
            project.color = color;
        }
        project.members = vec![self.principal_id.clone()];

        self.doc.projects.push(project.clone());
        self.touch(Field::Projects);
        Ok(project)
    }

    pub fn update_project(&mut self, id: &str, patch: ProjectPatch) -> StoreResult<()> {
        let title = patch.title.as_deref().map(required_title).transpose()?;
        let now = self.now();
        let project = self.project_mut(id)?;
        if let Some(title) = title {
            project.title = title;
        }
        if let Some(description) = patch.description {
            project.description = description.trim().to_string();
        }
        if let Some(color) = patch.color.filter(|c| !c.trim().is_empty()) {
            project.color = color;
        }
        if let Some(progress) = patch.progress {
            project.progress = clamp_progress(progress);
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        project.updated_at = Some(now);
        self.touch(Field::Projects);
        Ok(())
    }

    /// Remove a project and detach its tasks. Returns the project and the
    /// number of tasks that lost their project.
    pub fn delete_project(&mut self, id: &str) -> StoreResult<(Project, usize)> {
        let pos = self
            .doc
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("project", id))?;
        let project = self.doc.projects.remove(pos);
        self.touch(Field::Projects);

        let mut detached = 0;
        for task in self.doc.tasks.iter_mut() {
            if task.project_id.as_deref() == Some(id) {
                task.project_id = None;
                detached += 1;
            }
        }
        if detached > 0 {
            self.touch(Field::Tasks);
        }
        Ok((project, detached))
    }

    // Daily tasks

    pub fn create_daily_task(&mut self, fields: NewDailyTask) -> StoreResult<DailyTask> {
        let title = required_title(&fields.title)?;
        let mut daily = DailyTask::new(title, self.now());
        daily.description = fields.description.trim().to_string();
        daily.category = fields.category.trim().to_string();
        if !fields.days.is_empty() {
            daily.schedule.recurrence.days = fields.days;
        }
        if let Some(time) = fields.time {
            daily.schedule.recurrence.time = validate_time(&time)?;
        }
        daily.schedule.recurrence.time_zone = fields
            .time_zone
            .unwrap_or_else(|| self.doc.preferences.time_zone.clone());

        self.doc.daily_tasks.push(daily.clone());
        self.touch(Field::DailyTasks);
        Ok(daily)
    }

    pub fn update_daily_task(&mut self, id: &str, patch: DailyTaskPatch) -> StoreResult<()> {
        let title = patch.title.as_deref().map(required_title).transpose()?;
        let time = patch.time.as_deref().map(validate_time).transpose()?;
        let now = self.now();
        let daily = self.daily_task_mut(id)?;
        if let Some(title) = title {
            daily.title = title;
        }
        if let Some(description) = patch.description {
            daily.description = description.trim().to_string();
        }
        if let Some(category) = patch.category {
            daily.category = category.trim().to_string();
        }
        if let Some(days) = patch.days {
            daily.schedule.recurrence.days = days;
        }
        if let Some(time) = time {
            daily.schedule.recurrence.time = time;
        }
        if let Some(reminder) = patch.reminder {
            daily.schedule.reminder = reminder;
        }
        daily.updated_at = Some(now);
        self.touch(Field::DailyTasks);
        Ok(())
    }

    pub fn toggle_daily_task_status(&mut self, id: &str) -> StoreResult<DailyTaskStatus> {
        let now = self.now();
        let daily = self.daily_task_mut(id)?;
        daily.status = daily.status.toggled();
        daily.updated_at = Some(now);
        let status = daily.status;
        self.touch(Field::DailyTasks);
        Ok(status)
    }

    pub fn delete_daily_task(&mut self, id: &str) -> StoreResult<DailyTask> {
        let pos = self
            .doc
            .daily_tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::not_found("daily task", id))?;
        let daily = self.doc.daily_tasks.remove(pos);
        self.touch(Field::DailyTasks);
        Ok(daily)
    }

    /// Record a completion for `date`. Returns false if it was already there.
    pub fn mark_daily_task_complete(&mut self, id: &str, date: NaiveDate) -> StoreResult<bool> {
        let today = self.today();
        let now = self.now();
        let daily = self.daily_task_mut(id)?;
        if !daily.mark_complete(date, today) {
            return Ok(false);
        }
        daily.updated_at = Some(now);
        self.touch(Field::DailyTasks);
        Ok(true)
    }

    /// Remove the completion for `date`. Returns false if there was none.
    pub fn mark_daily_task_incomplete(&mut self, id: &str, date: NaiveDate) -> StoreResult<bool> {
        let today = self.today();
        let now = self.now();
        let daily = self.daily_task_mut(id)?;
        if !daily.mark_incomplete(date, today) {
            return Ok(false);
        }
        daily.updated_at = Some(now);
        self.touch(Field::DailyTasks);
        Ok(true)
    }

    /// Daily tasks that are active and scheduled for today's weekday.
    pub fn daily_tasks_due_today(&self) -> impl Iterator<Item = &DailyTask> {
        let today = self.today();
        let day = Day::of(today);
        self.doc
            .daily_tasks
            .iter()
            .filter(move |t| t.is_active() && t.schedule.recurrence.days.contains(&day))
    }

    // Ordering

    /// Move `dragged` before `target`. Returns whether the order changed.
    pub fn reorder(&mut self, collection: OrderedCollection, dragged: &str, target: &str) -> bool {
        let changed = match collection {
            OrderedCollection::Tasks => reorder::reorder(&mut self.doc.tasks, dragged, target),
            OrderedCollection::Projects => {
                reorder::reorder(&mut self.doc.projects, dragged, target)
            }
            OrderedCollection::DailyTasks => {
                reorder::reorder(&mut self.doc.daily_tasks, dragged, target)
            }
        };
        if changed {
            self.touch(collection.field());
        }
        changed
    }

    // Activity

    pub fn append_activity(
        &mut self,
        action: Action,
        description: impl Into<String>,
        related_id: Option<&str>,
    ) {
        let entry = ActivityEntry::new(
            action,
            description,
            related_id.map(str::to_string),
            self.now(),
        );
        activity::push_bounded(&mut self.doc.activity_log, entry);
        self.touch(Field::ActivityLog);
    }

    // Profile and preferences

    pub fn update_profile(&mut self, patch: ProfilePatch) -> StoreResult<()> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::validation("name", "must not be empty"));
            }
        }
        if let Some(email) = &patch.email {
            let email = email.trim();
            if email.is_empty() || !email.contains('@') {
                return Err(StoreError::validation("email", "not an email address"));
            }
        }

        let now = self.now();
        let profile = &mut self.doc.profile;
        let text = |v: String| v.trim().to_string();
        if let Some(v) = patch.name {
            profile.name = text(v);
        }
        if let Some(v) = patch.username {
            profile.username = text(v);
        }
        if let Some(v) = patch.email {
            profile.email = text(v);
        }
        if let Some(v) = patch.phone {
            profile.phone = text(v);
        }
        if let Some(v) = patch.bio {
            profile.bio = text(v);
        }
        if let Some(v) = patch.location {
            profile.location = text(v);
        }
        if let Some(v) = patch.gender {
            profile.gender = text(v);
        }
        if let Some(v) = patch.birth_date {
            profile.birth_date = v;
        }
        if let Some(v) = patch.job_title {
            profile.job_title = text(v);
        }
        if let Some(v) = patch.company {
            profile.company = text(v);
        }
        if let Some(v) = patch.website {
            profile.website = text(v);
        }
        if let Some(v) = patch.photo_ref {
            profile.photo_ref = v.filter(|r| !r.trim().is_empty());
        }
        profile.updated_at = Some(now);
        self.touch(Field::Profile);
        Ok(())
    }

    /// Returns false if there was no photo to remove.
    pub fn remove_photo(&mut self) -> bool {
        if self.doc.profile.photo_ref.is_none() {
            return false;
        }
        self.doc.profile.photo_ref = None;
        self.doc.profile.updated_at = Some(self.clock.now());
        self.touch(Field::Profile);
        true
    }

    pub fn update_preferences(&mut self, patch: PreferencesPatch) -> StoreResult<()> {
        let reminder = patch.reminder_time.as_deref().map(validate_time).transpose()?;
        let prefs = &mut self.doc.preferences;
        if let Some(theme) = patch.theme {
            prefs.theme = theme;
        }
        if let Some(language) = patch.language {
            prefs.language = language;
        }
        if let Some(tz) = patch.time_zone.filter(|tz| !tz.trim().is_empty()) {
            prefs.time_zone = tz;
        }
        if let Some(view) = patch.default_view.filter(|v| !v.trim().is_empty()) {
            prefs.default_view = view;
        }
        if let Some(time) = reminder {
            prefs.notification_settings.reminder_time = time;
        }
        if let Some(email) = patch.email_notifications {
            prefs.notification_settings.email = email;
        }
        if let Some(push) = patch.push_notifications {
            prefs.notification_settings.push = push;
        }
        self.touch(Field::Preferences);
        Ok(())
    }

    /// Change only the stored language. Returns false if it was already set.
    pub fn set_language(&mut self, locale: Locale) -> bool {
        if self.doc.preferences.language == locale {
            return false;
        }
        self.doc.preferences.language = locale;
        self.touch(Field::PreferredLanguage);
        true
    }
}

fn required_title(title: &str) -> StoreResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::validation("title", "must not be empty"));
    }
    Ok(title.to_string())
}

fn check_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> StoreResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(StoreError::validation(
            "endDate",
            format!("{} is before start {}", end, start),
        )),
        _ => Ok(()),
    }
}

/// Accepts `H:MM` or `HH:MM` and returns it zero-padded.
fn validate_time(time: &str) -> StoreResult<String> {
    chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| StoreError::validation("time", format!("{:?} is not HH:MM", time)))
}
