use buddy_types::models::{LanguageLevel, UserLanguage};
use rusqlite::{Connection, Row, params};
use tracing::info;

use crate::error::expect_one;
use crate::models::LanguageRow;
use crate::{Database, DbResult};

impl Database {
    // -- Language catalog --

    pub fn create_language(&self, language: &LanguageRow) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO languages (code2, name_en, name_cs, name_original)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    language.code2,
                    language.name_en,
                    language.name_cs,
                    language.name_original
                ],
            )?;
            Ok(())
        })?;

        info!("Added language {}", language.code2);
        Ok(())
    }

    pub fn list_languages(&self) -> DbResult<Vec<LanguageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code2, name_en, name_cs, name_original FROM languages ORDER BY code2",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(LanguageRow {
                        code2: row.get(0)?,
                        name_en: row.get(1)?,
                        name_cs: row.get(2)?,
                        name_original: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- User languages --

    /// Attach a language to a user. `NotFound` when either side is missing,
    /// `Conflict` when the user already has the language.
    pub fn add_user_language(
        &self,
        username: &str,
        code2: &str,
        level: LanguageLevel,
    ) -> DbResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT INTO user_languages (user_id, language_id, level)
                 SELECT u.id, l.id, ?3
                 FROM users AS u CROSS JOIN languages AS l
                 WHERE u.username = ?1 AND l.code2 = ?2",
                params![username, code2, level.weight()],
            )?;
            expect_one(affected)
        })
    }

    pub fn remove_user_language(&self, username: &str, code2: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM user_languages
                 WHERE user_id = (SELECT id FROM users WHERE username = ?1)
                   AND language_id = (SELECT id FROM languages WHERE code2 = ?2)",
                params![username, code2],
            )?;
            expect_one(affected)
        })
    }

    /// Languages of a user, highest level first.
    pub fn read_user_languages(&self, username: &str) -> DbResult<Vec<UserLanguage>> {
        self.with_conn(|conn| query_user_languages(conn, username))
    }
}

fn query_user_languages(conn: &Connection, username: &str) -> DbResult<Vec<UserLanguage>> {
    let mut stmt = conn.prepare(
        "SELECT l.code2, ul.level
         FROM user_languages AS ul
         JOIN users AS u ON u.id = ul.user_id
         JOIN languages AS l ON l.id = ul.language_id
         WHERE u.username = ?1
         ORDER BY ul.level DESC, l.code2",
    )?;
    let rows = stmt
        .query_map([username], |row| {
            Ok(UserLanguage {
                code2: row.get(0)?,
                level: level_column(row, 1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Decode a stored 0..=3 level weight.
pub(crate) fn level_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<LanguageLevel> {
    let weight: i64 = row.get(idx)?;
    LanguageLevel::from_weight(weight).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, weight))
}
