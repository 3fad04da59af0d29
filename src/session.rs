use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::core::activity::Action;
use crate::core::daily_task::{DailyTask, DailyTaskPatch, DailyTaskStatus, NewDailyTask};
use crate::core::date::Clock;
use crate::core::locale::Locale;
use crate::core::principal::Principal;
use crate::core::profile::{PreferencesPatch, ProfilePatch};
use crate::core::project::{NewProject, Project, ProjectPatch};
use crate::core::task::{NewTask, Task, TaskPatch};
use crate::error::{LoadError, StoreError, StoreResult};
use crate::localize::TranslationStore;
use crate::store::{OrderedCollection, UserDataStore};
use crate::sync::RemoteSync;

pub const DEFAULT_NOTICE_SECONDS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

/// A transient status message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub expires_at: DateTime<Utc>,
}

/// Something that is only removed after the user confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    Task(String),
    Project(String),
    DailyTask(String),
    Photo,
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub target: Deletion,
    /// Confirmation question to put in front of the user.
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    SignedOut,
}

/// One signed-in principal's application state.
///
/// Every action mutates the local store first, then writes the changed
/// fields remotely in one update. A failed write leaves local state as it is
/// and posts a warning.
pub struct Session {
    principal: Principal,
    data: UserDataStore,
    sync: RemoteSync,
    translations: TranslationStore,
    notices: Vec<Notice>,
    notice_duration: Duration,
    pending: Option<PendingDeletion>,
    state: SessionState,
}

impl Session {
    /// Translations, then the user document, then the stored language.
    pub async fn start(
        principal: Principal,
        sync: RemoteSync,
        mut translations: TranslationStore,
        clock: Clock,
    ) -> Result<Self, LoadError> {
        if !translations.is_ready() {
            translations.load_embedded();
        }

        let data = match sync.load_or_migrate(&principal, clock).await {
            Ok(data) => data,
            Err(e) => {
                log::error!("Failed to load data for {}: {}", principal.id, e);
                return Err(e);
            }
        };
        translations.set_active(data.preferences().language);
        log::info!(
            "Session ready for {} ({} tasks, {} projects, {} daily tasks)",
            principal.id,
            data.tasks().len(),
            data.projects().len(),
            data.daily_tasks().len()
        );

        Ok(Self {
            principal,
            data,
            sync,
            translations,
            notices: Vec::new(),
            notice_duration: Duration::seconds(DEFAULT_NOTICE_SECONDS),
            pending: None,
            state: SessionState::Active,
        })
    }

    pub fn with_notice_duration(mut self, seconds: i64) -> Self {
        self.notice_duration = Duration::seconds(seconds.max(1));
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn data(&self) -> &UserDataStore {
        &self.data
    }

    pub fn translations(&self) -> &TranslationStore {
        &self.translations
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn t(&self, key: &str) -> String {
        self.translations.t(key)
    }

    fn resolve(&self, key: &str, params: &[(&str, &str)]) -> String {
        self.translations.resolve(key, params)
    }

    // Notices

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    fn notify(&mut self, kind: NoticeKind, text: String) {
        let now = self.data.now();
        self.prune_notices(now);
        self.notices.push(Notice {
            kind,
            text,
            expires_at: now + self.notice_duration,
        });
    }

    /// Drop notices that have expired by `now`. Returns how many went.
    pub fn prune_notices(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| n.expires_at > now);
        before - self.notices.len()
    }

    pub fn dismiss_notice(&mut self, index: usize) {
        if index < self.notices.len() {
            self.notices.remove(index);
        }
    }

    fn reject(&mut self, err: StoreError) -> StoreError {
        let text = match &err {
            StoreError::Validation { field, reason } => {
                self.resolve("errors.validation", &[("field", *field), ("reason", reason.as_str())])
            }
            StoreError::NotFound { kind, .. } => {
                self.resolve("errors.notFound", &[("kind", *kind)])
            }
            StoreError::SignedOut => self.t("errors.signedOut"),
        };
        log::debug!("Rejected action: {}", err);
        self.notify(NoticeKind::Error, text);
        err
    }

    /// Actions after sign-out are refused before they touch the store.
    fn ensure_active(&mut self) -> StoreResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::SignedOut => Err(self.reject(StoreError::SignedOut)),
        }
    }

    /// Persist everything the last mutation touched and report the result.
    async fn commit(&mut self, success: String) {
        let result = self.sync.persist(&mut self.data).await;
        match result {
            Ok(_) => self.notify(NoticeKind::Success, success),
            Err(_) => {
                let text = self.t("errors.syncFailed");
                self.notify(NoticeKind::Warning, text);
            }
        }
    }

    // Tasks

    pub async fn create_task(&mut self, fields: NewTask) -> StoreResult<Task> {
        self.ensure_active()?;
        let task = self.data.create_task(fields).map_err(|e| self.reject(e))?;
        self.data.append_activity(
            Action::TaskCreated,
            format!("Created task \"{}\"", task.title),
            Some(&task.id),
        );
        let text = self.resolve("tasks.notices.created", &[("title", task.title.as_str())]);
        self.commit(text).await;
        Ok(task)
    }

    pub async fn update_task(&mut self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        self.ensure_active()?;
        if patch.is_empty() {
            return Ok(());
        }
        self.data.update_task(id, patch).map_err(|e| self.reject(e))?;
        let title = self.task_title(id);
        self.data.append_activity(
            Action::TaskEdited,
            format!("Edited task \"{}\"", title),
            Some(id),
        );
        let text = self.t("tasks.notices.updated");
        self.commit(text).await;
        Ok(())
    }

    pub async fn complete_task(&mut self, id: &str) -> StoreResult<bool> {
        self.ensure_active()?;
        let changed = self.data.complete_task(id).map_err(|e| self.reject(e))?;
        if changed {
            let title = self.task_title(id);
            self.data.append_activity(
                Action::TaskCompleted,
                format!("Completed task \"{}\"", title),
                Some(id),
            );
            let text = self.resolve("tasks.notices.completed", &[("title", title.as_str())]);
            self.commit(text).await;
        }
        Ok(changed)
    }

    pub async fn uncomplete_task(&mut self, id: &str) -> StoreResult<bool> {
        self.ensure_active()?;
        let changed = self.data.uncomplete_task(id).map_err(|e| self.reject(e))?;
        if changed {
            let title = self.task_title(id);
            self.data.append_activity(
                Action::TaskUncompleted,
                format!("Reopened task \"{}\"", title),
                Some(id),
            );
            let text = self.resolve("tasks.notices.reopened", &[("title", title.as_str())]);
            self.commit(text).await;
        }
        Ok(changed)
    }

    fn task_title(&self, id: &str) -> String {
        self.data
            .task(id)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    }

    // Projects

    pub async fn create_project(&mut self, fields: NewProject) -> StoreResult<Project> {
        self.ensure_active()?;
        let project = self.data.create_project(fields).map_err(|e| self.reject(e))?;
        self.data.append_activity(
            Action::ProjectCreated,
            format!("Created project \"{}\"", project.title),
            None,
        );
        let text = self.resolve("projects.notices.created", &[("title", project.title.as_str())]);
        self.commit(text).await;
        Ok(project)
    }

    pub async fn update_project(&mut self, id: &str, patch: ProjectPatch) -> StoreResult<()> {
        self.ensure_active()?;
        self.data.update_project(id, patch).map_err(|e| self.reject(e))?;
        let title = self
            .data
            .project(id)
            .map(|p| p.title.clone())
            .unwrap_or_default();
        self.data.append_activity(
            Action::ProjectEdited,
            format!("Edited project \"{}\"", title),
            None,
        );
        let text = self.t("projects.notices.updated");
        self.commit(text).await;
        Ok(())
    }

    // Daily tasks

    pub async fn create_daily_task(&mut self, fields: NewDailyTask) -> StoreResult<DailyTask> {
        self.ensure_active()?;
        let daily = self.data.create_daily_task(fields).map_err(|e| self.reject(e))?;
        self.data.append_activity(
            Action::DailyTaskCreated,
            format!("Created daily task \"{}\"", daily.title),
            Some(&daily.id),
        );
        let text = self.resolve("dailyTasks.notices.created", &[("title", daily.title.as_str())]);
        self.commit(text).await;
        Ok(daily)
    }

    pub async fn update_daily_task(&mut self, id: &str, patch: DailyTaskPatch) -> StoreResult<()> {
        self.ensure_active()?;
        self.data
            .update_daily_task(id, patch)
            .map_err(|e| self.reject(e))?;
        let title = self.daily_title(id);
        self.data.append_activity(
            Action::DailyTaskEdited,
            format!("Edited daily task \"{}\"", title),
            Some(id),
        );
        let text = self.t("dailyTasks.notices.updated");
        self.commit(text).await;
        Ok(())
    }

    pub async fn toggle_daily_task(&mut self, id: &str) -> StoreResult<DailyTaskStatus> {
        self.ensure_active()?;
        let status = self
            .data
            .toggle_daily_task_status(id)
            .map_err(|e| self.reject(e))?;
        let title = self.daily_title(id);
        let (verb, key) = match status {
            DailyTaskStatus::Active => ("Activated", "dailyTasks.notices.activated"),
            DailyTaskStatus::Inactive => ("Paused", "dailyTasks.notices.deactivated"),
        };
        self.data.append_activity(
            Action::DailyTaskToggled,
            format!("{} daily task \"{}\"", verb, title),
            Some(id),
        );
        let text = self.t(key);
        self.commit(text).await;
        Ok(status)
    }

    /// Returns false, with an info notice, when `date` was already done.
    pub async fn complete_daily_task(&mut self, id: &str, date: NaiveDate) -> StoreResult<bool> {
        self.ensure_active()?;
        let changed = self
            .data
            .mark_daily_task_complete(id, date)
            .map_err(|e| self.reject(e))?;
        let title = self.daily_title(id);
        if !changed {
            let text = self.resolve(
                "dailyTasks.notices.alreadyCompleted",
                &[("title", title.as_str())],
            );
            self.notify(NoticeKind::Info, text);
            return Ok(false);
        }
        self.data.append_activity(
            Action::DailyTaskCompleted,
            format!("Completed daily task \"{}\" for {}", title, date),
            Some(id),
        );
        let text = self.resolve("dailyTasks.notices.completed", &[("title", title.as_str())]);
        self.commit(text).await;
        Ok(true)
    }

    pub async fn uncomplete_daily_task(&mut self, id: &str, date: NaiveDate) -> StoreResult<bool> {
        self.ensure_active()?;
        let changed = self
            .data
            .mark_daily_task_incomplete(id, date)
            .map_err(|e| self.reject(e))?;
        if !changed {
            return Ok(false);
        }
        let title = self.daily_title(id);
        self.data.append_activity(
            Action::DailyTaskUncompleted,
            format!("Marked daily task \"{}\" not done for {}", title, date),
            Some(id),
        );
        let text = self.resolve("dailyTasks.notices.uncompleted", &[("title", title.as_str())]);
        self.commit(text).await;
        Ok(true)
    }

    fn daily_title(&self, id: &str) -> String {
        self.data
            .daily_task(id)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    }

    // Ordering

    /// Drop `dragged` onto `target`. Nothing is written when the order stays.
    pub async fn reorder(
        &mut self,
        collection: OrderedCollection,
        dragged: &str,
        target: &str,
    ) -> bool {
        if self.ensure_active().is_err() {
            return false;
        }
        if !self.data.reorder(collection, dragged, target) {
            return false;
        }
        self.data.append_activity(
            Action::ItemsReordered,
            format!("Reordered {}", collection.field()),
            None,
        );
        let text = self.t("common.notices.reordered");
        self.commit(text).await;
        true
    }

    // Profile and settings

    pub async fn update_profile(&mut self, patch: ProfilePatch) -> StoreResult<()> {
        self.ensure_active()?;
        self.data.update_profile(patch).map_err(|e| self.reject(e))?;
        self.data
            .append_activity(Action::ProfileUpdated, "Updated profile", None);
        let text = self.t("profile.notices.updated");
        self.commit(text).await;
        Ok(())
    }

    pub async fn update_preferences(&mut self, patch: PreferencesPatch) -> StoreResult<()> {
        self.ensure_active()?;
        let language = patch.language;
        self.data
            .update_preferences(patch)
            .map_err(|e| self.reject(e))?;
        if let Some(locale) = language {
            self.translations.set_active(locale);
        }
        self.data
            .append_activity(Action::PreferencesUpdated, "Updated preferences", None);
        let text = self.t("settings.notices.saved");
        self.commit(text).await;
        Ok(())
    }

    /// Switch language by code and store it as the preferred language.
    /// False for unsupported codes.
    pub async fn set_locale(&mut self, code: &str) -> bool {
        if self.ensure_active().is_err() {
            return false;
        }
        let Some(locale) = Locale::from_code(code) else {
            let text = self.resolve("errors.unsupportedLanguage", &[("code", code)]);
            self.notify(NoticeKind::Error, text);
            return false;
        };
        self.translations.set_active(locale);
        if self.data.set_language(locale) {
            let text = self.resolve(
                "settings.notices.languageChanged",
                &[("language", locale.display_name())],
            );
            self.commit(text).await;
        }
        true
    }

    // Deletion

    /// First step of a destructive action. Fails if the target is gone.
    pub fn request_deletion(&mut self, target: Deletion) -> StoreResult<PendingDeletion> {
        self.ensure_active()?;
        let prompt = match &target {
            Deletion::Task(id) => {
                let title = self
                    .data
                    .task(id)
                    .map(|t| t.title.clone())
                    .ok_or_else(|| StoreError::not_found("task", id.as_str()));
                let title = title.map_err(|e| self.reject(e))?;
                self.resolve("tasks.confirmDelete", &[("title", title.as_str())])
            }
            Deletion::Project(id) => {
                let project = self
                    .data
                    .project(id)
                    .map(|p| (p.title.clone(), p.task_count(self.data.tasks())))
                    .ok_or_else(|| StoreError::not_found("project", id.as_str()));
                let (title, count) = project.map_err(|e| self.reject(e))?;
                let count = count.to_string();
                self.resolve(
                    "projects.confirmDelete",
                    &[("title", title.as_str()), ("count", count.as_str())],
                )
            }
            Deletion::DailyTask(id) => {
                let title = self
                    .data
                    .daily_task(id)
                    .map(|t| t.title.clone())
                    .ok_or_else(|| StoreError::not_found("daily task", id.as_str()));
                let title = title.map_err(|e| self.reject(e))?;
                self.resolve("dailyTasks.confirmDelete", &[("title", title.as_str())])
            }
            Deletion::Photo => {
                if self.data.profile().photo_ref.is_none() {
                    return Err(self.reject(StoreError::not_found("photo", "profile")));
                }
                self.t("profile.confirmPhotoRemoval")
            }
            Deletion::Account => self.t("profile.confirmAccountDeletion"),
        };
        let pending = PendingDeletion { target, prompt };
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    pub fn pending_deletion(&self) -> Option<&PendingDeletion> {
        self.pending.as_ref()
    }

    pub fn cancel_deletion(&mut self) {
        self.pending = None;
    }

    /// Second step: carry out a deletion previously returned by
    /// [`request_deletion`](Self::request_deletion).
    pub async fn confirm_deletion(&mut self, confirmed: PendingDeletion) -> StoreResult<()> {
        self.ensure_active()?;
        if self.pending.as_ref() != Some(&confirmed) {
            return Err(self.reject(StoreError::validation(
                "deletion",
                "was not requested or was cancelled",
            )));
        }
        self.pending = None;

        match confirmed.target {
            Deletion::Task(id) => {
                let task = self.data.delete_task(&id).map_err(|e| self.reject(e))?;
                self.data.append_activity(
                    Action::TaskDeleted,
                    format!("Deleted task \"{}\"", task.title),
                    Some(&id),
                );
                let text = self.t("tasks.notices.deleted");
                self.commit(text).await;
            }
            Deletion::Project(id) => {
                let (project, detached) =
                    self.data.delete_project(&id).map_err(|e| self.reject(e))?;
                self.data.append_activity(
                    Action::ProjectDeleted,
                    format!(
                        "Deleted project \"{}\" ({} tasks detached)",
                        project.title, detached
                    ),
                    None,
                );
                let text = self.t("projects.notices.deleted");
                self.commit(text).await;
            }
            Deletion::DailyTask(id) => {
                let daily = self
                    .data
                    .delete_daily_task(&id)
                    .map_err(|e| self.reject(e))?;
                self.data.append_activity(
                    Action::DailyTaskDeleted,
                    format!("Deleted daily task \"{}\"", daily.title),
                    Some(&id),
                );
                let text = self.t("dailyTasks.notices.deleted");
                self.commit(text).await;
            }
            Deletion::Photo => {
                if !self.data.remove_photo() {
                    return Err(self.reject(StoreError::not_found("photo", "profile")));
                }
                self.data
                    .append_activity(Action::PhotoRemoved, "Removed profile photo", None);
                let text = self.t("profile.notices.photoRemoved");
                self.commit(text).await;
            }
            Deletion::Account => {
                let result = self.sync.delete_document(&self.principal.id).await;
                match result {
                    Ok(()) => {
                        let text = self.t("profile.notices.accountDeleted");
                        self.notify(NoticeKind::Success, text);
                        self.sign_out();
                    }
                    Err(e) => {
                        log::warn!("Account deletion for {} failed: {}", self.principal.id, e);
                        let text = self.t("errors.syncFailed");
                        self.notify(NoticeKind::Warning, text);
                    }
                }
            }
        }
        Ok(())
    }

    /// End the session. Unsaved state does not exist: every action has
    /// already been handed to the remote store.
    pub fn sign_out(&mut self) {
        if self.state == SessionState::SignedOut {
            return;
        }
        self.pending = None;
        self.state = SessionState::SignedOut;
        log::info!("Signed out {}", self.principal.id);
    }
}
