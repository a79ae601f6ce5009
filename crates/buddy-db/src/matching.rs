use std::collections::HashMap;

use buddy_types::models::{Gender, Role, UserLanguage};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::languages::level_column;
use crate::models::ListedUserRow;
use crate::users::enum_column;
use crate::{Database, DbResult, YEAR_MS};

/// Optional listing filters. Empty sets and `None` bounds do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub genders: Vec<Gender>,
    /// Inclusive, in whole years.
    pub min_age: Option<i64>,
    /// Inclusive, in whole years.
    pub max_age: Option<i64>,
    /// Language codes; a user must speak at least one of them.
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

impl Database {
    /// List verified, available users of `role` for matching.
    ///
    /// With a language filter the result is ranked by the summed level of the
    /// matched languages, otherwise it is sorted by username. Inactive buddies
    /// are listed too; only messaging requires `active`.
    pub fn list_users(
        &self,
        role: Role,
        filter: &UserFilter,
        page: Page,
        now: i64,
    ) -> DbResult<Vec<ListedUserRow>> {
        self.with_conn(|conn| {
            let mut users = query_listed_users(conn, role, filter, page, now)?;
            if users.is_empty() {
                return Ok(Vec::new());
            }

            let ids: Vec<&str> = users.iter().map(|(id, _)| id.as_str()).collect();
            let mut languages = query_languages_of(conn, &ids)?;
            for (id, user) in &mut users {
                user.languages = languages.remove(id.as_str()).unwrap_or_default();
            }

            Ok(users.into_iter().map(|(_, user)| user).collect())
        })
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `now` moved back by `years`, clamped to the `i64` range.
fn years_before(now: i64, years: i64) -> i64 {
    now.saturating_sub(years.saturating_mul(YEAR_MS))
}

/// Build the filtered listing statement and its positional parameters.
fn listing_sql(role: Role, filter: &UserFilter, page: Page, now: i64) -> (String, Vec<Value>) {
    let by_language = !filter.languages.is_empty();
    let mut sql = String::from(
        "SELECT u.id, u.username, u.given_name, u.family_name, u.role, u.gender, u.birthday",
    );
    let mut values: Vec<Value> = Vec::new();

    if by_language {
        sql.push_str(
            ", SUM(ul.level) AS relevance
             FROM users AS u
             JOIN user_languages AS ul ON ul.user_id = u.id
             JOIN languages AS l ON l.id = ul.language_id",
        );
    } else {
        sql.push_str(", NULL AS relevance FROM users AS u");
    }

    sql.push_str(" WHERE u.email IS NOT NULL AND u.available = 1 AND u.role = ?");
    values.push(Value::Text(role.as_str().to_string()));

    if !filter.genders.is_empty() {
        sql.push_str(&format!(
            " AND u.gender IN ({})",
            placeholders(filter.genders.len())
        ));
        values.extend(
            filter
                .genders
                .iter()
                .map(|g| Value::Text(g.as_str().to_string())),
        );
    }

    // age >= min  <=>  birthday <= now - min years
    if let Some(min) = filter.min_age {
        sql.push_str(" AND u.birthday <= ?");
        values.push(Value::Integer(years_before(now, min)));
    }
    // age <= max  <=>  birthday > now - (max + 1) years
    if let Some(max) = filter.max_age {
        sql.push_str(" AND u.birthday > ?");
        values.push(Value::Integer(years_before(now, max.saturating_add(1))));
    }

    if by_language {
        sql.push_str(&format!(
            " AND l.code2 IN ({}) GROUP BY u.id ORDER BY relevance DESC, u.username",
            placeholders(filter.languages.len())
        ));
        values.extend(filter.languages.iter().cloned().map(Value::Text));
    } else {
        sql.push_str(" ORDER BY u.username");
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    values.push(Value::Integer(page.limit.into()));
    values.push(Value::Integer(page.offset.into()));

    (sql, values)
}

fn query_listed_users(
    conn: &Connection,
    role: Role,
    filter: &UserFilter,
    page: Page,
    now: i64,
) -> DbResult<Vec<(String, ListedUserRow)>> {
    let (sql, values) = listing_sql(role, filter, page, now);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get(0)?,
                ListedUserRow {
                    username: row.get(1)?,
                    given_name: row.get(2)?,
                    family_name: row.get(3)?,
                    role: enum_column(row, 4)?,
                    gender: enum_column(row, 5)?,
                    birthday: row.get(6)?,
                    relevance: row.get(7)?,
                    languages: Vec::new(),
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All languages of the given users keyed by user id, highest level first.
fn query_languages_of(
    conn: &Connection,
    ids: &[&str],
) -> DbResult<HashMap<String, Vec<UserLanguage>>> {
    let sql = format!(
        "SELECT ul.user_id, l.code2, ul.level
         FROM user_languages AS ul
         JOIN languages AS l ON l.id = ul.language_id
         WHERE ul.user_id IN ({})
         ORDER BY ul.level DESC, l.code2",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            UserLanguage {
                code2: row.get(1)?,
                level: level_column(row, 2)?,
            },
        ))
    })?;

    let mut by_user: HashMap<String, Vec<UserLanguage>> = HashMap::new();
    for row in rows {
        let (id, language) = row?;
        by_user.entry(id).or_default().push(language);
    }
    Ok(by_user)
}
