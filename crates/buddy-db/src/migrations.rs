use rusqlite::Connection;
use tracing::info;

use crate::DbResult;

pub fn run(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                   TEXT PRIMARY KEY,
            username             TEXT NOT NULL UNIQUE,
            email                TEXT UNIQUE,
            temporary_email      TEXT,
            role                 TEXT NOT NULL CHECK (role IN ('buddy', 'comer')),
            admin                INTEGER NOT NULL DEFAULT 0,
            active               INTEGER NOT NULL DEFAULT 0,
            available            INTEGER NOT NULL DEFAULT 0,
            password_hash        TEXT NOT NULL,
            password_salt        TEXT NOT NULL,
            password_iterations  INTEGER NOT NULL,
            given_name           TEXT NOT NULL,
            family_name          TEXT NOT NULL,
            gender               TEXT NOT NULL CHECK (gender IN ('female', 'male', 'other')),
            birthday             INTEGER NOT NULL,
            te_hash              TEXT,
            te_salt              TEXT,
            te_iterations        INTEGER,
            te_expire            INTEGER,
            created              INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS languages (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            code2          TEXT NOT NULL UNIQUE,
            name_en        TEXT,
            name_cs        TEXT,
            name_original  TEXT
        );

        CREATE TABLE IF NOT EXISTS user_languages (
            user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            language_id  INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
            level        INTEGER NOT NULL CHECK (level BETWEEN 0 AND 3),
            UNIQUE(user_id, language_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id           TEXT PRIMARY KEY,
            sender_id    TEXT NOT NULL REFERENCES users(id),
            receiver_id  TEXT NOT NULL REFERENCES users(id),
            body         TEXT NOT NULL,
            created      INTEGER NOT NULL,
            is_read      INTEGER NOT NULL DEFAULT 0,
            is_notified  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, receiver_id, created);

        CREATE INDEX IF NOT EXISTS idx_messages_unnotified
            ON messages(is_read, is_notified);

        -- Seed the language catalog
        INSERT OR IGNORE INTO languages (code2, name_en, name_cs, name_original) VALUES
            ('ar', 'Arabic', 'arabština', 'العربية'),
            ('cs', 'Czech', 'čeština', 'čeština'),
            ('de', 'German', 'němčina', 'Deutsch'),
            ('en', 'English', 'angličtina', 'English'),
            ('es', 'Spanish', 'španělština', 'español'),
            ('fr', 'French', 'francouzština', 'français'),
            ('ru', 'Russian', 'ruština', 'русский'),
            ('sk', 'Slovak', 'slovenština', 'slovenčina'),
            ('uk', 'Ukrainian', 'ukrajinština', 'українська'),
            ('zh', 'Chinese', 'čínština', '中文');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
