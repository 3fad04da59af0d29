/// The signed-in identity as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Language tag reported by the client, e.g. `de-AT`.
    pub locale: Option<String>,
    /// IANA zone name, e.g. `Europe/Istanbul`.
    pub time_zone: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
            locale: None,
            time_zone: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_locale(mut self, tag: impl Into<String>) -> Self {
        self.locale = Some(tag.into());
        self
    }
}
