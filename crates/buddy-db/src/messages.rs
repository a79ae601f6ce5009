use rusqlite::{Connection, params, params_from_iter};
use tracing::debug;

use crate::error::expect_one;
use crate::models::{MessageRow, UnnotifiedGroup, UnnotifiedMessage};
use crate::{Database, DbResult};

impl Database {
    // -- Messages --

    /// Store a message from `sender` to `receiver`.
    ///
    /// Both users must be verified and exactly one of them an active buddy,
    /// the other a comer. A missing user and an ineligible pair both end in
    /// `NotFound`.
    pub fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
        now: i64,
    ) -> DbResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, body, created)
                 SELECT ?1, s.id, r.id, ?4, ?5
                 FROM users AS s CROSS JOIN users AS r
                 WHERE s.username = ?2 AND r.username = ?3
                   AND s.id != r.id
                   AND s.email IS NOT NULL AND r.email IS NOT NULL
                   AND (
                        (s.role = 'buddy' AND s.active = 1 AND r.role = 'comer')
                     OR (s.role = 'comer' AND r.role = 'buddy' AND r.active = 1)
                   )",
                params![id, sender, receiver, body, now],
            )?;
            expect_one(affected)
        })?;

        debug!("Message {} from {} to {}", id, sender, receiver);
        Ok(id)
    }

    /// Both directions of the conversation between `a` and `b`, newest first.
    pub fn read_conversation(&self, a: &str, b: &str) -> DbResult<Vec<MessageRow>> {
        self.with_conn(|conn| query_conversation(conn, a, b))
    }

    /// Unread messages nobody was notified about yet, grouped per
    /// sender → receiver direction.
    pub fn read_unnotified(&self) -> DbResult<Vec<UnnotifiedGroup>> {
        self.with_conn(query_unnotified)
    }

    pub fn mark_notified(&self, ids: &[String]) -> DbResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE messages SET is_notified = 1 WHERE id IN ({})",
                vec!["?"; ids.len()].join(", ")
            );
            conn.execute(&sql, params_from_iter(ids.iter()))?;
            Ok(())
        })
    }
}

fn query_conversation(conn: &Connection, a: &str, b: &str) -> DbResult<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, s.username, r.username, m.body, m.created, m.is_read
         FROM messages AS m
         JOIN users AS s ON s.id = m.sender_id
         JOIN users AS r ON r.id = m.receiver_id
         WHERE (s.username = ?1 AND r.username = ?2)
            OR (s.username = ?2 AND r.username = ?1)
         ORDER BY m.created DESC, m.rowid DESC",
    )?;
    let rows = stmt
        .query_map([a, b], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender: row.get(1)?,
                receiver: row.get(2)?,
                body: row.get(3)?,
                created: row.get(4)?,
                is_read: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_unnotified(conn: &Connection) -> DbResult<Vec<UnnotifiedGroup>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.body, m.created, s.username, r.username, r.email
         FROM messages AS m
         JOIN users AS s ON s.id = m.sender_id
         JOIN users AS r ON r.id = m.receiver_id
         WHERE m.is_read = 0 AND m.is_notified = 0 AND r.email IS NOT NULL
         ORDER BY m.created ASC, m.rowid ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            UnnotifiedMessage {
                id: row.get(0)?,
                body: row.get(1)?,
                created: row.get(2)?,
            },
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut groups: Vec<UnnotifiedGroup> = Vec::new();
    for row in rows {
        let (message, sender, receiver, receiver_email) = row?;
        match groups
            .iter_mut()
            .find(|g| g.sender == sender && g.receiver == receiver)
        {
            Some(group) => group.messages.push(message),
            None => groups.push(UnnotifiedGroup {
                sender,
                receiver,
                receiver_email,
                messages: vec![message],
            }),
        }
    }
    Ok(groups)
}
