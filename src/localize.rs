use regex::{Captures, Regex};
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::core::locale::Locale;

#[derive(RustEmbed)]
#[folder = "i18n/"]
struct Localizations;

static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

pub type LocaleListener = Box<dyn Fn(Locale) + Send + Sync>;

/// Dotted-key lookup over per-locale JSON tables.
///
/// Lookups try the active locale, then the fallback locale, then give back
/// the key itself. Nothing resolves until the tables are loaded.
pub struct TranslationStore {
    active: Locale,
    fallback: Locale,
    tables: HashMap<Locale, Value>,
    ready: bool,
    listeners: Vec<LocaleListener>,
}

impl Default for TranslationStore {
    fn default() -> Self {
        Self::new(Locale::default(), Locale::FALLBACK)
    }
}

impl TranslationStore {
    pub fn new(active: Locale, fallback: Locale) -> Self {
        Self {
            active,
            fallback,
            tables: HashMap::new(),
            ready: false,
            listeners: Vec::new(),
        }
    }

    /// A ready store over the tables compiled into the binary.
    pub fn embedded(active: Locale, fallback: Locale) -> Self {
        let mut store = Self::new(active, fallback);
        store.load_embedded();
        store
    }

    /// Load every embedded table and mark the store ready. Returns how many
    /// locales have a table.
    pub fn load_embedded(&mut self) -> usize {
        for locale in Locale::ALL {
            let path = format!("{}.json", locale.code());
            let Some(file) = Localizations::get(&path) else {
                log::warn!("No translation table for {}", locale);
                continue;
            };
            if let Err(e) = self.load_table(locale, &file.data) {
                log::warn!("Translation table {} is not valid JSON: {}", path, e);
            }
        }
        self.mark_ready();
        self.tables.len()
    }

    /// Add or replace the table for `locale`. Accepts both `{"en": {...}}`
    /// and a bare `{...}`.
    pub fn load_table(&mut self, locale: Locale, json: &[u8]) -> Result<(), serde_json::Error> {
        let mut table: Value = serde_json::from_slice(json)?;
        if let Some(inner) = table.get_mut(locale.code()).filter(|v| v.is_object()) {
            table = inner.take();
        }
        self.tables.insert(locale, table);
        Ok(())
    }

    /// Flip to ready and tell listeners which locale is active. Only the
    /// first call has an effect.
    pub fn mark_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        log::debug!(
            "Translations ready: {} tables, active {}, fallback {}",
            self.tables.len(),
            self.active,
            self.fallback
        );
        self.notify();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn active(&self) -> Locale {
        self.active
    }

    pub fn fallback(&self) -> Locale {
        self.fallback
    }

    pub fn supported(&self) -> &'static [Locale] {
        &Locale::ALL
    }

    pub fn on_locale_change(&mut self, listener: impl Fn(Locale) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(self.active);
        }
    }

    /// Switch the active locale by code. False for unsupported codes.
    pub fn set_locale(&mut self, code: &str) -> bool {
        match Locale::from_code(code) {
            Some(locale) => {
                self.set_active(locale);
                true
            }
            None => {
                log::warn!("Unsupported locale: {}", code);
                false
            }
        }
    }

    /// Returns whether the active locale changed.
    pub fn set_active(&mut self, locale: Locale) -> bool {
        if self.active == locale {
            return false;
        }
        self.active = locale;
        if self.ready {
            self.notify();
        }
        true
    }

    fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        let mut node = self.tables.get(&locale)?;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        node.as_str().filter(|s| !s.is_empty())
    }

    /// Translated text for `key`, with `{name}` tokens filled from `params`.
    /// Unknown tokens are left as written.
    pub fn resolve(&self, key: &str, params: &[(&str, &str)]) -> String {
        if !self.ready {
            return key.to_string();
        }
        let text = self
            .lookup(self.active, key)
            .or_else(|| self.lookup(self.fallback, key));
        let Some(text) = text else {
            log::debug!("Missing translation: {}", key);
            return key.to_string();
        };
        if params.is_empty() {
            return text.to_string();
        }
        PARAM_RE
            .replace_all(text, |caps: &Captures| {
                params
                    .iter()
                    .find(|(name, _)| *name == &caps[1])
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn t(&self, key: &str) -> String {
        self.resolve(key, &[])
    }

    /// True when `key` resolves in the active or fallback locale.
    pub fn has_key(&self, key: &str) -> bool {
        self.lookup(self.active, key).is_some() || self.lookup(self.fallback, key).is_some()
    }

    /// Direct child keys of `section` in the active locale, e.g.
    /// `["all", "high", ...]` for `tasks.filters`.
    pub fn section_keys(&self, section: &str) -> Vec<String> {
        let Some(mut node) = self.tables.get(&self.active) else {
            return Vec::new();
        };
        for part in section.split('.') {
            match node.get(part) {
                Some(next) => node = next,
                None => return Vec::new(),
            }
        }
        node.as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> TranslationStore {
        let mut store = TranslationStore::new(Locale::En, Locale::Tr);
        store
            .load_table(
                Locale::En,
                br#"{"en": {"common": {"save": "Save"}, "greet": "Hello, {name}! {unknown}"}}"#,
            )
            .unwrap();
        store
            .load_table(
                Locale::Tr,
                br#"{"common": {"save": "Kaydet", "cancel": "Vazgec"}}"#,
            )
            .unwrap();
        store
    }

    #[test]
    fn key_is_echoed_before_ready() {
        let store = store();
        assert_eq!(store.t("common.save"), "common.save");
    }

    #[test]
    fn active_then_fallback_then_key() {
        let mut store = store();
        store.mark_ready();
        assert_eq!(store.t("common.save"), "Save");
        assert_eq!(store.t("common.cancel"), "Vazgec");
        assert_eq!(store.t("common.missing"), "common.missing");
        assert_eq!(store.t("common"), "common");
        assert!(store.has_key("common.cancel"));
        assert!(!store.has_key("nope"));
    }

    #[test]
    fn params_fill_known_tokens_only() {
        let mut store = store();
        store.mark_ready();
        assert_eq!(
            store.resolve("greet", &[("name", "Ada")]),
            "Hello, Ada! {unknown}"
        );
    }

    #[test]
    fn set_locale_rejects_unknown_codes() {
        let mut store = store();
        store.mark_ready();
        assert!(!store.set_locale("xx"));
        assert_eq!(store.active(), Locale::En);
        assert!(store.set_locale("tr"));
        assert_eq!(store.t("common.save"), "Kaydet");
    }

    #[test]
    fn listeners_hear_ready_and_changes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = store();
        let seen = calls.clone();
        store.on_locale_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        store.set_active(Locale::De);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        store.mark_ready();
        store.mark_ready();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.set_active(Locale::Fr));
        assert!(!store.set_active(Locale::Fr));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn embedded_tables_load() {
        let store = TranslationStore::embedded(Locale::En, Locale::Tr);
        assert!(store.is_ready());
        assert_eq!(store.t("tasks.priority.high"), "High");
        let filters = store.section_keys("tasks.filters");
        assert!(filters.contains(&"overdue".to_string()));
    }

    #[test]
    fn partial_locale_falls_back_to_turkish() {
        let store = TranslationStore::embedded(Locale::De, Locale::Tr);
        assert_eq!(store.t("nav.tasks"), "Aufgaben");
        assert_eq!(store.t("tasks.priority.high"), "Yüksek");
    }
}
