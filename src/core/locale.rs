use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the application ships string tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Tr,
    En,
    De,
    Es,
    Fr,
}

impl Default for Locale {
    fn default() -> Self {
        Self::En
    }
}

impl Locale {
    pub const ALL: [Locale; 5] = [Locale::Tr, Locale::En, Locale::De, Locale::Es, Locale::Fr];

    /// Language used when a key is missing from the active table.
    pub const FALLBACK: Locale = Locale::Tr;

    pub fn code(&self) -> &'static str {
        match self {
            Self::Tr => "tr",
            Self::En => "en",
            Self::De => "de",
            Self::Es => "es",
            Self::Fr => "fr",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }

    /// Map a language tag such as `de-AT` or `pt_BR` onto a supported locale.
    pub fn detect(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::from_code(&primary)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tr => "Türkçe",
            Self::En => "English",
            Self::De => "Deutsch",
            Self::Es => "Español",
            Self::Fr => "Français",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_from_tags() {
        assert_eq!(Locale::detect("de-AT"), Some(Locale::De));
        assert_eq!(Locale::detect("tr_TR.UTF-8"), Some(Locale::Tr));
        assert_eq!(Locale::detect("EN"), Some(Locale::En));
        assert_eq!(Locale::detect("pt-BR"), None);
    }

    #[test]
    fn serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Locale::Es).unwrap(), "\"es\"");
        let parsed: Locale = serde_json::from_str("\"fr\"").unwrap();
        assert_eq!(parsed, Locale::Fr);
    }
}
