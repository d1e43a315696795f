//! Per-locale text for product titles and descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Locale used when a requested translation is missing.
pub const DEFAULT_LOCALE: &str = "en";

/// A map of locale code to text.
///
/// Lookups fall back to [`DEFAULT_LOCALE`] and then to any available
/// translation, so a product with a single title always renders.
///
/// ```
/// use handicrafts_core::LocalizedText;
///
/// let title = LocalizedText::new("Terracotta Vase").with("hi", "टेराकोटा फूलदान");
/// assert_eq!(title.get("hi"), "टेराकोटा फूलदान");
/// assert_eq!(title.get("fr"), "Terracotta Vase");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Create text in the default locale.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self::default().with(DEFAULT_LOCALE, text)
    }

    /// Add or replace the translation for `locale`. Blank text is ignored.
    #[must_use]
    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.set(locale, text);
        self
    }

    /// Add or replace the translation for `locale`. Blank text removes it.
    pub fn set(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        let locale = locale.into().trim().to_ascii_lowercase();
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            self.0.remove(&locale);
        } else {
            self.0.insert(locale, text);
        }
    }

    /// Text for `locale`, falling back to the default locale, then to any
    /// translation, then to the empty string.
    #[must_use]
    pub fn get(&self, locale: &str) -> &str {
        self.0
            .get(locale)
            .or_else(|| self.0.get(DEFAULT_LOCALE))
            .or_else(|| self.0.values().next())
            .map_or("", String::as_str)
    }

    /// Text in the default locale (with the same fallbacks as [`Self::get`]).
    #[must_use]
    pub fn default_text(&self) -> &str {
        self.get(DEFAULT_LOCALE)
    }

    /// True when no translation is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive substring match against every translation.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.0
            .values()
            .any(|text| text.to_lowercase().contains(needle))
    }

    /// Iterate over `(locale, text)` pairs in locale order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Stored as a JSON object in a TEXT column.
#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for LocalizedText {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for LocalizedText {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(serde_json::from_str(&s)?)
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for LocalizedText {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let json = serde_json::to_string(&self.0)?;
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(json, buf)
    }
}
