use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every user is either a local buddy or a newcomer. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buddy,
    Comer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buddy => "buddy",
            Role::Comer => "comer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Other => "other",
        }
    }
}

/// Language skill. Variants are declared in ascending order, so the derived
/// `Ord` matches the ranking weight returned by [`LanguageLevel::weight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageLevel {
    Beginner,
    Intermediate,
    Advanced,
    Native,
}

impl LanguageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageLevel::Beginner => "beginner",
            LanguageLevel::Intermediate => "intermediate",
            LanguageLevel::Advanced => "advanced",
            LanguageLevel::Native => "native",
        }
    }

    /// Stored value and relevance weight: beginner = 0 .. native = 3.
    pub fn weight(&self) -> i64 {
        match self {
            LanguageLevel::Beginner => 0,
            LanguageLevel::Intermediate => 1,
            LanguageLevel::Advanced => 2,
            LanguageLevel::Native => 3,
        }
    }

    pub fn from_weight(weight: i64) -> Option<Self> {
        match weight {
            0 => Some(LanguageLevel::Beginner),
            1 => Some(LanguageLevel::Intermediate),
            2 => Some(LanguageLevel::Advanced),
            3 => Some(LanguageLevel::Native),
            _ => None,
        }
    }
}

/// Returned when a stored or submitted enum value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buddy" => Ok(Role::Buddy),
            "comer" => Ok(Role::Comer),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "other" => Ok(Gender::Other),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for LanguageLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(LanguageLevel::Beginner),
            "intermediate" => Ok(LanguageLevel::Intermediate),
            "advanced" => Ok(LanguageLevel::Advanced),
            "native" => Ok(LanguageLevel::Native),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A language a user speaks, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLanguage {
    pub code2: String,
    pub level: LanguageLevel,
}
