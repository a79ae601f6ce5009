use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Gender, LanguageLevel, Role, UserLanguage};
use crate::validation::{
    validate_birthday, validate_code2, validate_email, validate_not_blank, validate_username,
    validate_verification_code,
};

// -- JWT Claims --

/// Token payload. A snapshot of the user's role and flags at issue time;
/// it is not re-checked against the database on later requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// The user has a verified email address.
    pub verified: bool,
    pub role: Role,
    /// Present only for buddies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Present only on tokens issued through the admin route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
    pub iat: usize,
    pub exp: usize,
}

// -- Envelope --

/// Top-level request document: `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document<T> {
    pub data: T,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(custom(function = "validate_username"))]
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LanguageIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(custom(function = "validate_code2"))]
    pub id: String,
}

// -- Users --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(nested)]
    pub attributes: NewUserAttributes,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NewUserAttributes {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(length(min = 10, max = 512, message = "password must be 10 to 512 characters"))]
    pub password: String,
    pub role: Role,
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub given_name: String,
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub family_name: String,
    #[validate(custom(function = "validate_birthday"))]
    pub birthday: NaiveDate,
    pub gender: Gender,
}

/// `PATCH /users/:username` body. The attribute shape alone decides which
/// operation is requested; anything else fails to deserialize.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserPatchResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(custom(function = "validate_username"))]
    pub id: String,
    pub attributes: UserPatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserPatch {
    Active(SetActive),
    Available(SetAvailable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetActive {
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetAvailable {
    pub available: bool,
}

// -- Account --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VerifyEmail {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(custom(function = "validate_username"))]
    pub id: String,
    #[validate(nested)]
    pub attributes: VerifyEmailAttributes,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct VerifyEmailAttributes {
    #[validate(custom(function = "validate_verification_code"))]
    pub email_verification_code: String,
}

// -- User languages --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewUserLanguage {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: NewUserLanguageAttributes,
    #[validate(nested)]
    pub relationships: NewUserLanguageRelationships,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUserLanguageAttributes {
    pub level: LanguageLevel,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewUserLanguageRelationships {
    #[validate(nested)]
    pub language: LanguageRelationship,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LanguageRelationship {
    #[validate(nested)]
    pub data: LanguageIdentifier,
}

// -- Messages --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(nested)]
    pub attributes: NewMessageAttributes,
    #[validate(nested)]
    pub relationships: NewMessageRelationships,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewMessageAttributes {
    #[validate(length(min = 1, max = 4096), custom(function = "validate_not_blank"))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRelationships {
    #[validate(nested)]
    pub receiver: UserRelationship,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserRelationship {
    #[validate(nested)]
    pub data: UserIdentifier,
}

// -- Responses --

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub meta: TokenMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenMeta {
    pub token: String,
}

/// `{ "data": [...] }` response document.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListDocument<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: ListedUserAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedUserAttributes {
    pub given_name: String,
    /// Shared by buddies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub age: i64,
    pub role: Role,
    pub gender: Gender,
    pub languages: Vec<UserLanguage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: MessageAttributes,
    pub relationships: MessageRelationships,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttributes {
    pub body: String,
    /// Milliseconds since the Unix epoch.
    pub created: i64,
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRelationships {
    pub sender: UserRef,
    pub receiver: UserRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub data: UserRefData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRefData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl UserRef {
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            data: UserRefData {
                kind: "users".to_string(),
                id: username.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageResource {
    #[serde(rename = "type")]
    pub kind: String,
    /// ISO 639-1 code.
    pub id: String,
    pub attributes: LanguageAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageAttributes {
    pub name_en: Option<String>,
    pub name_cs: Option<String>,
    pub name_original: Option<String>,
}

/// A language of one user, keyed by its code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLanguageResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: UserLanguageAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLanguageAttributes {
    pub level: LanguageLevel,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorSource {
    pub pointer: String,
}
