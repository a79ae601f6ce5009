/// Database row types. Each struct names its columns explicitly; they are
/// distinct from the buddy-types API documents to keep the DB layer independent.
use buddy_crypto::HashedSecret;
use buddy_types::models::{Gender, Role, UserLanguage};

/// Everything stored for a freshly registered, unverified user.
/// Timestamps are milliseconds since the Unix epoch.
pub struct NewUserRow {
    pub username: String,
    pub temporary_email: String,
    pub role: Role,
    pub given_name: String,
    pub family_name: String,
    pub gender: Gender,
    pub birthday: i64,
    pub password: HashedSecret,
    pub email_code: HashedSecret,
    pub email_code_expire: i64,
    pub created: i64,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub temporary_email: Option<String>,
    pub role: Role,
    pub admin: bool,
    pub active: bool,
    pub available: bool,
    pub given_name: String,
    pub family_name: String,
    pub gender: Gender,
    pub birthday: i64,
    pub password: HashedSecret,
    pub created: i64,
}

/// Pending email-verification state of a user.
pub struct EmailVerificationRow {
    pub temporary_email: Option<String>,
    pub code: Option<HashedSecret>,
    pub expire: Option<i64>,
}

/// One row of a buddy/comer listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedUserRow {
    pub username: String,
    pub given_name: String,
    pub family_name: String,
    pub role: Role,
    pub gender: Gender,
    pub birthday: i64,
    /// Sum of matched language weights; set only when a language filter was given.
    pub relevance: Option<i64>,
    /// All languages of the user, highest level first.
    pub languages: Vec<UserLanguage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRow {
    pub code2: String,
    pub name_en: Option<String>,
    pub name_cs: Option<String>,
    pub name_original: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub body: String,
    pub created: i64,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnnotifiedMessage {
    pub id: String,
    pub body: String,
    pub created: i64,
}

/// Unread, not yet notified messages of one sender → receiver direction,
/// oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnnotifiedGroup {
    pub sender: String,
    pub receiver: String,
    pub receiver_email: String,
    pub messages: Vec<UnnotifiedMessage>,
}
