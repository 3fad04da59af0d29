use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::date::lenient;
use super::locale::Locale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient::date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub website: String,
    /// Opaque reference to an externally stored photo.
    #[serde(default)]
    pub photo_ref: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(name: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            username: String::new(),
            email: email.into(),
            phone: String::new(),
            bio: String::new(),
            location: String::new(),
            gender: String::new(),
            birth_date: None,
            job_title: String::new(),
            company: String::new(),
            website: String::new(),
            photo_ref: None,
            created_at: now,
            updated_at: None,
        }
    }

    /// Avatar letter shown next to the name.
    pub fn initial(&self) -> Option<char> {
        self.name.trim().chars().next().map(|c| c.to_ascii_uppercase())
    }
}

/// Name to show for an email-only principal: the part before `@`.
pub fn name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub photo_ref: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default = "yes")]
    pub email: bool,
    #[serde(default = "yes")]
    pub push: bool,
    #[serde(default = "default_reminder_time")]
    pub reminder_time: String,
}

fn yes() -> bool {
    true
}

fn default_reminder_time() -> String {
    "09:00".to_string()
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            reminder_time: default_reminder_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub language: Locale,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_view")]
    pub default_view: String,
    #[serde(default)]
    pub notification_settings: NotificationSettings,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_view() -> String {
    "dashboard".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            language: Locale::default(),
            time_zone: default_time_zone(),
            default_view: default_view(),
            notification_settings: NotificationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub language: Option<Locale>,
    pub time_zone: Option<String>,
    pub default_view: Option<String>,
    pub reminder_time: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_photo_ref() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "name": "ayse",
            "email": "ayse@example.com",
            "photoRef": "avatars/ayse.png"
        }))
        .unwrap();
        assert_eq!(profile.photo_ref.as_deref(), Some("avatars/ayse.png"));
        assert_eq!(profile.initial(), Some('A'));
    }

    #[test]
    fn preferences_fill_missing_fields() {
        let prefs: Preferences =
            serde_json::from_value(serde_json::json!({ "theme": "light" })).unwrap();
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, Locale::En);
        assert_eq!(prefs.notification_settings.reminder_time, "09:00");
    }

    #[test]
    fn email_local_part() {
        assert_eq!(name_from_email("mehmet@example.com"), "mehmet");
        assert_eq!(name_from_email("nobody"), "nobody");
    }
}
