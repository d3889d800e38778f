//! Vault record data model.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{RecordId, UserId};

/// Record category.
///
/// The storage value is preserved verbatim: anything outside the four known
/// categories round-trips through `Other` untouched, while the presentation
/// accessors fall back to the General arm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    General,
    Social,
    Work,
    Financial,
    /// Unrecognized storage value, kept as-is.
    Other(String),
}

impl Category {
    /// Parse a storage value into a category.
    pub fn parse(value: &str) -> Self {
        match value {
            "general" => Self::General,
            "social" => Self::Social,
            "work" => Self::Work,
            "financial" => Self::Financial,
            other => Self::Other(other.to_string()),
        }
    }

    /// The verbatim storage value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::General => "general",
            Self::Social => "social",
            Self::Work => "work",
            Self::Financial => "financial",
            Self::Other(value) => value,
        }
    }

    /// Human-readable label; unrecognized values present as General.
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Social => "Social",
            Self::Work => "Work",
            Self::Financial => "Financial",
            Self::Other(_) => "General",
        }
    }

    /// Icon identifier for presentation; unrecognized values present as General.
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::General => "key",
            Self::Social => "user",
            Self::Work => "file-text",
            Self::Financial => "shield",
            Self::Other(_) => "key",
        }
    }

    /// The known categories, in presentation order.
    pub fn known() -> [Self; 4] {
        [Self::General, Self::Social, Self::Work, Self::Financial]
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One stored credential entry, owned by exactly one identity.
///
/// `secret_value` is stored exactly as entered; this layer applies no
/// cryptographic transformation before transmission or storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Stable, provider-assigned identifier.
    pub id: RecordId,
    /// Identity that owns the record.
    pub owner_id: UserId,
    /// Non-empty display name.
    pub title: String,
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub secret_value: Option<String>,
    pub notes: Option<String>,
    pub category: Category,
    pub is_favorite: bool,
    /// Creation timestamp, immutable after insert.
    pub created_at: DateTime<Utc>,
}

impl VaultRecord {
    /// Case-insensitive substring match of `term` against title, website URL
    /// and username. Absent fields never match.
    pub fn matches_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let contains = |field: &str| field.to_lowercase().contains(&needle);

        contains(self.title.as_str())
            || self.website_url.as_deref().is_some_and(contains)
            || self.username.as_deref().is_some_and(contains)
    }

    /// Snapshot the user-editable fields as a draft.
    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            title: self.title.clone(),
            website_url: self.website_url.clone(),
            username: self.username.clone(),
            secret_value: self.secret_value.clone(),
            notes: self.notes.clone(),
            category: self.category.clone(),
            is_favorite: self.is_favorite,
        }
    }
}

/// The user-editable field set submitted on create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub title: String,
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub secret_value: Option<String>,
    pub notes: Option<String>,
    pub category: Category,
    pub is_favorite: bool,
}

impl RecordDraft {
    /// Start a draft with a title and defaults everywhere else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Check the locally enforced constraints.
    ///
    /// # Errors
    /// - Title empty or whitespace-only
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::Validation(
                "title must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Collapse blank optional fields to `None`.
    pub fn normalized(mut self) -> Self {
        let blank_to_none = |field: &mut Option<String>| {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        };
        blank_to_none(&mut self.website_url);
        blank_to_none(&mut self.username);
        blank_to_none(&mut self.secret_value);
        blank_to_none(&mut self.notes);
        self
    }
}

/// Alphabet used by the password generator.
const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Default generated password length.
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// Generate a random password over the mixed alphanumeric/symbol alphabet.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let index = rng.random_range(0..PASSWORD_ALPHABET.len());
            PASSWORD_ALPHABET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> VaultRecord {
        VaultRecord {
            id: RecordId::new("r1").unwrap(),
            owner_id: UserId::new("u1").unwrap(),
            title: title.to_string(),
            website_url: None,
            username: None,
            secret_value: None,
            notes: None,
            category: Category::General,
            is_favorite: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_parse_known() {
        assert_eq!(Category::parse("financial"), Category::Financial);
        assert_eq!(Category::parse("general"), Category::General);
    }

    #[test]
    fn test_category_unknown_preserved_verbatim() {
        let category = Category::parse("crypto-wallets");
        assert_eq!(category.as_str(), "crypto-wallets");
        // Presentation falls through to the General arm.
        assert_eq!(category.label(), "General");
        assert_eq!(category.icon_name(), "key");
    }

    #[test]
    fn test_category_serde_round_trip() {
        let json = "\"crypto-wallets\"";
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&category).unwrap(), json);
    }

    #[test]
    fn test_matches_term_case_insensitive() {
        let mut entry = record("Gmail");
        assert!(entry.matches_term("gmail"));
        assert!(!entry.matches_term("bob"));

        entry.username = Some("bob@x.com".to_string());
        assert!(entry.matches_term("BOB"));
    }

    #[test]
    fn test_matches_term_absent_fields() {
        let entry = record("Facebook");
        // No url/username present; must not match and must not panic.
        assert!(!entry.matches_term("x.com"));
    }

    #[test]
    fn test_draft_validate_rejects_blank_title() {
        assert!(RecordDraft::new("").validate().is_err());
        assert!(RecordDraft::new("   ").validate().is_err());
        assert!(RecordDraft::new("Gmail").validate().is_ok());
    }

    #[test]
    fn test_draft_normalized_collapses_blanks() {
        let mut draft = RecordDraft::new("Gmail");
        draft.website_url = Some("".to_string());
        draft.username = Some("bob".to_string());
        draft.notes = Some("  ".to_string());

        let draft = draft.normalized();
        assert_eq!(draft.website_url, None);
        assert_eq!(draft.username.as_deref(), Some("bob"));
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn test_record_to_draft_round_trip() {
        let mut entry = record("Bank");
        entry.is_favorite = true;
        entry.category = Category::Financial;

        let draft = entry.to_draft();
        assert_eq!(draft.title, "Bank");
        assert!(draft.is_favorite);
        assert_eq!(draft.category, Category::Financial);
    }

    #[test]
    fn test_generate_password() {
        let password = generate_password(DEFAULT_PASSWORD_LENGTH);
        assert_eq!(password.len(), 16);
        assert!(password
            .bytes()
            .all(|b| PASSWORD_ALPHABET.contains(&b)));
    }
}
