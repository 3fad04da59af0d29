//! Turning whatever the remote store holds into a well-formed [`UserDocument`].
//!
//! Documents written by older clients are missing fields, carry ids as
//! numbers, spell statuses differently or use the pre-`user_data` layout.
//! All of that is repaired here, once, at load time.

use serde_json::{Map, Value, json};

use crate::core::activity::{self, Action, ActivityEntry};
use crate::core::date::{Clock, Day};
use crate::core::document::UserDocument;
use crate::core::locale::Locale;
use crate::core::new_id;
use crate::core::principal::Principal;
use crate::core::profile::{Preferences, Profile, name_from_email};
use crate::core::project::clamp_progress;
use crate::core::streak;
use crate::core::task::clean_labels;
use crate::error::LoadError;

const UNTITLED: &str = "Untitled";
const WELCOME_BIO: &str = "Welcome to Clario!";

/// Preferences for a principal seen for the first time.
pub fn initial_preferences(principal: &Principal) -> Preferences {
    let mut prefs = Preferences::default();
    if let Some(locale) = principal.locale.as_deref().and_then(Locale::detect) {
        prefs.language = locale;
    }
    if let Some(tz) = principal.time_zone.as_deref().filter(|tz| !tz.is_empty()) {
        prefs.time_zone = tz.to_string();
    }
    prefs
}

fn display_name(principal: &Principal) -> String {
    principal
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| name_from_email(&principal.email))
}

/// The document created for a principal with no stored data at all.
pub fn default_document(principal: &Principal, clock: &Clock) -> UserDocument {
    let now = clock.now();
    let mut profile = Profile::new(display_name(principal), principal.email.clone(), now);
    profile.bio = WELCOME_BIO.to_string();

    let mut doc = UserDocument::empty(profile);
    doc.preferences = initial_preferences(principal);
    doc.activity_log.push(ActivityEntry::new(
        Action::UserCreated,
        "Account created",
        None,
        now,
    ));
    doc
}

/// Convert a document from the legacy `users` collection.
///
/// Two legacy layouts exist: profile fields nested under `userInfo`, and
/// profile fields at the top level next to `projects` and `tasks`.
pub fn migrate_legacy(
    legacy: &Value,
    principal: &Principal,
    clock: &Clock,
) -> Result<UserDocument, LoadError> {
    let root = legacy
        .as_object()
        .ok_or_else(|| LoadError::Migration("legacy document is not an object".to_string()))?;
    let info = root
        .get("userInfo")
        .and_then(Value::as_object)
        .unwrap_or(root);

    let text = |key: &str| {
        info.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let email = text("email").unwrap_or(principal.email.as_str()).to_string();
    let name = text("username")
        .or_else(|| text("displayName"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            let from_email = name_from_email(&email);
            if from_email.is_empty() {
                display_name(principal)
            } else {
                from_email
            }
        });

    let mut profile = Map::new();
    profile.insert("name".into(), json!(name));
    profile.insert("email".into(), json!(email));
    profile.insert("bio".into(), json!(text("bio").unwrap_or_default()));
    if let Some(photo) = text("photoURL").or_else(|| text("photoPATH")) {
        profile.insert("photoRef".into(), json!(photo));
    }
    match info.get("createdAt") {
        Some(created) if !created.is_null() => {
            profile.insert("createdAt".into(), created.clone());
        }
        _ => {
            profile.insert("createdAt".into(), json!(clock.now()));
        }
    }

    let preferences = serde_json::to_value(initial_preferences(principal))
        .map_err(|e| LoadError::Migration(e.to_string()))?;
    let carried = |key: &str| root.get(key).cloned().unwrap_or_else(|| json!([]));

    let raw = json!({
        "profile": profile,
        "preferences": preferences,
        "projects": carried("projects"),
        "tasks": carried("tasks"),
        "dailyTasks": carried("dailyTasks"),
        "activityLog": [],
    });

    let mut doc = normalize(raw, clock).map_err(|e| LoadError::Migration(e.to_string()))?;
    activity::push_bounded(
        &mut doc.activity_log,
        ActivityEntry::new(
            Action::DataMigrated,
            format!(
                "Migrated {} tasks and {} projects",
                doc.tasks.len(),
                doc.projects.len()
            ),
            None,
            clock.now(),
        ),
    );
    Ok(doc)
}

/// Repair a stored document and parse it.
pub fn normalize(mut raw: Value, clock: &Clock) -> Result<UserDocument, serde_json::Error> {
    if let Some(root) = raw.as_object_mut() {
        repair_root(root);
    }
    let mut doc: UserDocument = serde_json::from_value(raw)?;
    finish(&mut doc, clock);
    Ok(doc)
}

fn repair_root(root: &mut Map<String, Value>) {
    if !root.get("profile").is_some_and(Value::is_object) {
        root.insert("profile".into(), json!({}));
    }
    if let Some(profile) = root.get_mut("profile").and_then(Value::as_object_mut) {
        repair_profile(profile);
    }

    if root.get("preferences").is_some_and(|p| !p.is_object()) {
        root.remove("preferences");
    }
    if let Some(prefs) = root.get_mut("preferences").and_then(Value::as_object_mut) {
        repair_preferences(prefs);
    }
    if root.get("budget").is_some_and(|b| !b.is_object()) {
        root.remove("budget");
    }

    repair_list(root, "projects", repair_project);
    repair_list(root, "tasks", repair_task);
    repair_list(root, "dailyTasks", repair_daily_task);

    let mut log = take_list(root, "activityLog");
    log.retain(|entry| entry.get("action").is_some_and(Value::is_string));
    root.insert("activityLog".into(), Value::Array(log));
}

const PROFILE_TEXT: [&str; 10] = [
    "name", "username", "email", "phone", "bio", "location", "gender", "jobTitle", "company",
    "website",
];

/// Older clients stored the photo under `photoURL` or `photoPATH`. Those keys
/// are folded into `photoRef` unless it is already set.
fn repair_profile(profile: &mut Map<String, Value>) {
    let legacy: Vec<Value> = ["photoURL", "photoPATH"]
        .into_iter()
        .filter_map(|key| profile.remove(key))
        .collect();
    let has_photo = profile
        .get("photoRef")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_photo {
        let photo = legacy
            .into_iter()
            .find(|v| v.as_str().is_some_and(|s| !s.trim().is_empty()));
        match photo {
            Some(photo) => {
                profile.insert("photoRef".into(), photo);
            }
            None => {
                profile.remove("photoRef");
            }
        }
    }
    retain_strings(profile, &PROFILE_TEXT);
}

/// Remove `root[key]`, keeping only its object entries.
fn take_list(root: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    let mut items = match root.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    items.retain(Value::is_object);
    items
}

fn repair_list(root: &mut Map<String, Value>, key: &str, repair: fn(&mut Map<String, Value>)) {
    let mut items = take_list(root, key);
    for obj in items.iter_mut().filter_map(Value::as_object_mut) {
        repair_identity(obj);
        repair(obj);
    }
    root.insert(key.into(), Value::Array(items));
}

fn repair_identity(obj: &mut Map<String, Value>) {
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => None,
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => Some(new_id()),
    };
    if let Some(id) = id {
        obj.insert("id".into(), json!(id));
    }
    let titled = obj
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());
    if !titled {
        obj.insert("title".into(), json!(UNTITLED));
    }
    retain_strings(obj, &["description", "category", "color"]);
}

/// Drop `keys` whose values are not strings so their defaults apply.
fn retain_strings(obj: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if obj.get(*key).is_some_and(|v| !v.is_string()) {
            obj.remove(*key);
        }
    }
}

/// Keep `obj[key]` only when it is one of `allowed` (after lowercasing).
fn retain_choice(obj: &mut Map<String, Value>, key: &str, allowed: &[&str]) {
    let choice = obj
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| allowed.contains(&s.as_str()));
    match choice {
        Some(choice) => {
            obj.insert(key.into(), json!(choice));
        }
        None => {
            obj.remove(key);
        }
    }
}

fn repair_preferences(prefs: &mut Map<String, Value>) {
    let language = prefs
        .get("language")
        .and_then(Value::as_str)
        .and_then(Locale::detect);
    match language {
        Some(locale) => {
            prefs.insert("language".into(), json!(locale.code()));
        }
        None => {
            prefs.remove("language");
        }
    }
    retain_choice(prefs, "theme", &["dark", "light"]);
    retain_strings(prefs, &["timeZone", "defaultView"]);
    if prefs.get("notificationSettings").is_some_and(|n| !n.is_object()) {
        prefs.remove("notificationSettings");
    }
}

fn repair_project(project: &mut Map<String, Value>) {
    retain_choice(project, "status", &["active", "completed", "archived"]);
    if project.get("progress").is_some_and(|p| !p.is_number()) {
        project.remove("progress");
    }
    if let Some(members) = project.get_mut("members") {
        match members {
            Value::Array(ids) => ids.retain(Value::is_string),
            _ => *members = json!([]),
        }
    }
}

fn repair_task(task: &mut Map<String, Value>) {
    retain_choice(task, "priority", &["high", "medium", "low"]);
    retain_choice(task, "taskType", &["single", "range"]);

    // Some clients stored `done` or a bare `completed: true`.
    let status = match task.get("status").and_then(Value::as_str) {
        Some(s) if s.eq_ignore_ascii_case("completed") || s.eq_ignore_ascii_case("done") => {
            Some("completed")
        }
        Some(s) if s.eq_ignore_ascii_case("active") => Some("active"),
        _ => match task.get("completed").and_then(Value::as_bool) {
            Some(true) => Some("completed"),
            Some(false) => Some("active"),
            None => None,
        },
    };
    match status {
        Some(status) => {
            task.insert("status".into(), json!(status));
        }
        None => {
            task.remove("status");
        }
    }

    match task.get("projectId") {
        Some(Value::String(p)) if !p.trim().is_empty() => {}
        Some(Value::Number(n)) => {
            let id = n.to_string();
            task.insert("projectId".into(), json!(id));
        }
        Some(_) => {
            task.remove("projectId");
        }
        None => {}
    }

    if let Some(labels) = task.get_mut("labels") {
        match labels {
            Value::Array(items) => items.retain(Value::is_string),
            _ => *labels = json!([]),
        }
    }
}

fn repair_daily_task(daily: &mut Map<String, Value>) {
    retain_choice(daily, "status", &["active", "inactive"]);
    if !daily.contains_key("status") {
        if let Some(active) = daily.get("isActive").and_then(Value::as_bool) {
            let status = if active { "active" } else { "inactive" };
            daily.insert("status".into(), json!(status));
        }
    }
    daily.remove("isActive");

    if daily.get("schedule").is_some_and(|s| !s.is_object()) {
        daily.remove("schedule");
    }
    let recurrence = daily
        .get_mut("schedule")
        .and_then(Value::as_object_mut)
        .and_then(|s| s.get_mut("recurrence"))
        .and_then(Value::as_object_mut);
    if let Some(recurrence) = recurrence {
        recurrence.insert("type".into(), json!("weekly"));
        retain_strings(recurrence, &["time", "timeZone"]);
        if let Some(days) = recurrence.get_mut("days") {
            let codes: Vec<&str> = days
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(Day::from_code)
                        .map(|d| d.code())
                        .collect()
                })
                .unwrap_or_default();
            *days = json!(codes);
        }
    }

    if daily.get("progress").is_some_and(|p| !p.is_object()) {
        daily.remove("progress");
    }
    if let Some(progress) = daily.get_mut("progress").and_then(Value::as_object_mut) {
        for key in ["currentStreak", "longestStreak"] {
            if progress.get(key).is_some_and(|v| !v.is_u64()) {
                progress.remove(key);
            }
        }
    }
}

/// Adjustments that are easier on typed data.
fn finish(doc: &mut UserDocument, clock: &Clock) {
    let today = clock.today();

    if doc
        .profile
        .photo_ref
        .as_deref()
        .is_some_and(|r| r.trim().is_empty())
    {
        doc.profile.photo_ref = None;
    }

    for project in doc.projects.iter_mut() {
        project.progress = clamp_progress(project.progress);
    }

    for task in doc.tasks.iter_mut() {
        task.labels = clean_labels(&task.labels);
        if task.status.is_active() {
            task.completed_at = None;
        }
    }

    for daily in doc.daily_tasks.iter_mut() {
        let progress = &mut daily.progress;
        let current = streak::current_streak(&progress.completed_dates, today);
        let longest = streak::longest_run(&progress.completed_dates);
        progress.current_streak = current;
        progress.longest_streak = progress.longest_streak.max(current).max(longest);
    }

    activity::truncate_oldest(&mut doc.activity_log);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::daily_task::DailyTaskStatus;
    use crate::core::task::{Priority, TaskStatus, TaskType};
    use chrono::NaiveDate;

    fn clock() -> Clock {
        Clock::fixed_on(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
    }

    fn ada() -> Principal {
        Principal::new("uid-1", "ada@example.com")
    }

    #[test]
    fn default_document_shape() {
        let principal = ada().with_display_name("Ada L").with_locale("tr-TR");
        let doc = default_document(&principal, &clock());
        assert_eq!(doc.profile.name, "Ada L");
        assert_eq!(doc.profile.email, "ada@example.com");
        assert_eq!(doc.preferences.language, Locale::Tr);
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.activity_log.len(), 1);
        assert_eq!(doc.activity_log[0].action, "user_created");
    }

    #[test]
    fn default_name_falls_back_to_email() {
        let doc = default_document(&ada(), &clock());
        assert_eq!(doc.profile.name, "ada");
        assert_eq!(doc.preferences.language, Locale::En);
    }

    #[test]
    fn nested_legacy_layout() {
        let legacy = json!({
            "userInfo": {
                "username": "ada_l",
                "email": "old@example.com",
                "createdAt": "2022-03-01T08:00:00Z"
            },
            "projects": [{ "id": 17, "title": "Garden" }],
            "tasks": [
                { "id": "t1", "title": "Seeds", "projectId": 17, "priority": "urgent" },
                { "title": "", "status": "done" }
            ]
        });
        let doc = migrate_legacy(&legacy, &ada(), &clock()).unwrap();
        assert_eq!(doc.profile.name, "ada_l");
        assert_eq!(doc.profile.email, "old@example.com");
        assert_eq!(
            doc.profile.created_at.date_naive(),
            NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()
        );
        assert_eq!(doc.projects[0].id, "17");
        assert_eq!(doc.tasks[0].project_id.as_deref(), Some("17"));
        assert_eq!(doc.tasks[0].priority, Priority::Medium);
        assert_eq!(doc.tasks[1].title, "Untitled");
        assert_eq!(doc.tasks[1].status, TaskStatus::Completed);
        assert!(!doc.tasks[1].id.is_empty());
        let last = doc.activity_log.last().unwrap();
        assert_eq!(last.action, "data_migrated");
    }

    #[test]
    fn flat_legacy_layout() {
        let legacy = json!({
            "displayName": "Grace",
            "photoURL": "https://example.com/g.png",
            "bio": "Admiral",
            "tasks": []
        });
        let doc = migrate_legacy(&legacy, &ada(), &clock()).unwrap();
        assert_eq!(doc.profile.name, "Grace");
        assert_eq!(doc.profile.email, "ada@example.com");
        assert_eq!(doc.profile.bio, "Admiral");
        assert_eq!(doc.profile.photo_ref.as_deref(), Some("https://example.com/g.png"));
        assert!(doc.projects.is_empty());
    }

    #[test]
    fn legacy_must_be_an_object() {
        let err = migrate_legacy(&json!([1, 2]), &ada(), &clock()).unwrap_err();
        assert!(matches!(err, LoadError::Migration(_)));
    }

    #[test]
    fn normalize_repairs_daily_tasks() {
        let raw = json!({
            "profile": { "name": "Ada", "email": "ada@example.com", "photoPATH": "" },
            "preferences": { "language": "de-AT", "theme": "purple" },
            "dailyTasks": [{
                "id": "d1",
                "title": "Read",
                "isActive": false,
                "schedule": { "recurrence": { "days": ["Monday", "wed", "xyz"] } },
                "progress": {
                    "completedDates": [
                        "2024-01-01", "2024-01-02", "2024-01-03", "2024-01-09", "2024-01-10"
                    ],
                    "currentStreak": 9,
                    "longestStreak": 1
                }
            }],
            "activityLog": [{ "description": "no action" }, { "action": "task_created" }]
        });
        let doc = normalize(raw, &clock()).unwrap();
        assert_eq!(doc.preferences.language, Locale::De);
        assert_eq!(doc.profile.photo_ref, None);

        let daily = &doc.daily_tasks[0];
        assert_eq!(daily.status, DailyTaskStatus::Inactive);
        assert_eq!(daily.schedule.recurrence.days, [Day::Mon, Day::Wed].into_iter().collect());
        assert_eq!(daily.progress.current_streak, 2);
        assert_eq!(daily.progress.longest_streak, 3);
        assert_eq!(doc.activity_log.len(), 1);
    }

    #[test]
    fn normalize_folds_old_photo_keys() {
        let both = json!({
            "profile": { "name": "Ada", "photoRef": "a.png", "photoPATH": "" }
        });
        let doc = normalize(both, &clock()).unwrap();
        assert_eq!(doc.profile.photo_ref.as_deref(), Some("a.png"));

        let old_only = json!({
            "profile": { "name": "Ada", "photoRef": "", "photoURL": "https://example.com/a.png" }
        });
        let doc = normalize(old_only, &clock()).unwrap();
        assert_eq!(doc.profile.photo_ref.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn normalize_drops_non_text_profile_fields() {
        let raw = json!({
            "profile": {
                "name": "Ada",
                "phone": null,
                "location": 42,
                "jobTitle": ["engineer"],
                "website": { "url": "x" },
                "company": "Analytical Engines"
            }
        });
        let doc = normalize(raw, &clock()).unwrap();
        assert_eq!(doc.profile.phone, "");
        assert_eq!(doc.profile.location, "");
        assert_eq!(doc.profile.job_title, "");
        assert_eq!(doc.profile.website, "");
        assert_eq!(doc.profile.company, "Analytical Engines");
    }

    #[test]
    fn normalize_fills_missing_sections() {
        let doc = normalize(json!({ "tasks": null, "projects": "nope" }), &clock()).unwrap();
        assert!(doc.tasks.is_empty());
        assert!(doc.projects.is_empty());
        assert_eq!(doc.preferences, Preferences::default());
    }

    #[test]
    fn normalize_keeps_range_dates() {
        let raw = json!({
            "profile": {},
            "tasks": [{
                "id": "r1",
                "title": "Trip",
                "taskType": "RANGE",
                "startDate": "2024-02-01",
                "endDate": "2024-02-05",
                "dueDate": "2024-02-05",
                "labels": ["a", 3, " a "]
            }]
        });
        let doc = normalize(raw, &clock()).unwrap();
        let task = &doc.tasks[0];
        assert_eq!(task.task_type, TaskType::Range);
        assert!(task.start_date.is_some() && task.end_date.is_some() && task.due_date.is_some());
        assert_eq!(task.labels, vec!["a".to_string()]);
    }
}
