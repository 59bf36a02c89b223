//! Persistent SQLite database for accounts, bots, scripts and conversations.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::chatbot::message::{
    Bot, BotUpdate, Conversation, NewBot, Platform, Role, Script, StoredMessage, User,
};
use crate::trainer::{CorpusSource, PersonalityProfile, ProfileSink};

const BOT_COLUMNS: &str =
    "id, name, description, personality, owner_id, personality_profile, trained_at";

/// Persistent SQLite database for the service.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to create in-memory database: {e}"))?;
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;
        Ok(db)
    }

    /// Open the database at `path`, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| format!("Failed to open database {}: {e}", path.display()))?;
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;

        let (users, bots, scripts) = db.get_counts()?;
        info!(
            "Loaded database from {:?} ({} users, {} bots, {} scripts)",
            path, users, bots, scripts
        );
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, String> {
        self.conn.lock().map_err(|_| "database lock poisoned".to_string())
    }

    fn init_schema(&self) -> Result<(), String> {
        let conn = self.conn()?;

        conn.execute_batch(r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user'
            );

            CREATE TABLE IF NOT EXISTS bots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                personality TEXT NOT NULL DEFAULT 'neutral',
                owner_id INTEGER NOT NULL REFERENCES users(id),
                personality_profile TEXT,
                trained_at TEXT
            );

            CREATE TABLE IF NOT EXISTS scripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bot_id INTEGER NOT NULL REFERENCES bots(id),
                content TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                platform TEXT NOT NULL,
                user_id TEXT NOT NULL,
                bot_id INTEGER NOT NULL REFERENCES bots(id),
                UNIQUE(platform, user_id, bot_id)
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL REFERENCES conversations(id),
                content TEXT NOT NULL,
                is_from_user INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_bots_owner ON bots(owner_id);
            CREATE INDEX IF NOT EXISTS idx_scripts_bot ON scripts(bot_id);
            CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
        "#).map_err(|e| format!("Failed to initialize database schema: {e}"))
    }

    fn get_counts(&self) -> Result<(usize, usize, usize), String> {
        let conn = self.conn()?;
        let count = |table: &str| -> usize {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get::<_, i64>(0))
                .unwrap_or(0) as usize
        };
        Ok((count("users"), count("bots"), count("scripts")))
    }

    // ==================== USER METHODS ====================

    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, String> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, email, hashed_password, role) VALUES (?1, ?2, ?3, ?4)",
            params![username, email, password_hash, role.as_str()],
        ).map_err(|e| format!("Failed to insert user: {e}"))?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>, String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, email, hashed_password, role FROM users WHERE id = ?1",
            params![user_id],
            user_from_row,
        ).optional().map_err(|e| format!("Failed to load user: {e}"))
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, email, hashed_password, role FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        ).optional().map_err(|e| format!("Failed to load user: {e}"))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, email, hashed_password, role FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        ).optional().map_err(|e| format!("Failed to load user: {e}"))
    }

    pub fn list_users(&self) -> Result<Vec<User>, String> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, username, email, hashed_password, role FROM users ORDER BY id")
            .map_err(|e| format!("Failed to list users: {e}"))?;
        let rows = stmt
            .query_map([], user_from_row)
            .map_err(|e| format!("Failed to list users: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read user: {e}"))
    }

    /// Update email and/or password hash. Returns false if the user does not exist.
    pub fn update_user(
        &self,
        user_id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool, String> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET email = COALESCE(?2, email), hashed_password = COALESCE(?3, hashed_password)
             WHERE id = ?1",
            params![user_id, email, password_hash],
        ).map_err(|e| format!("Failed to update user: {e}"))?;
        Ok(changed > 0)
    }

    pub fn delete_user(&self, user_id: i64) -> Result<bool, String> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])
            .map_err(|e| format!("Failed to delete user: {e}"))?;
        Ok(changed > 0)
    }

    // ==================== BOT METHODS ====================

    pub fn create_bot(&self, owner_id: i64, bot: &NewBot) -> Result<Bot, String> {
        let personality = bot.personality.clone().unwrap_or_else(|| "neutral".to_string());
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bots (name, description, personality, owner_id) VALUES (?1, ?2, ?3, ?4)",
            params![bot.name, bot.description, personality, owner_id],
        ).map_err(|e| format!("Failed to insert bot: {e}"))?;

        Ok(Bot {
            id: conn.last_insert_rowid(),
            name: bot.name.clone(),
            description: bot.description.clone(),
            personality,
            owner_id,
            personality_profile: None,
            trained_at: None,
        })
    }

    pub fn get_bot(&self, bot_id: i64) -> Result<Option<Bot>, String> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {BOT_COLUMNS} FROM bots WHERE id = ?1"),
            params![bot_id],
            bot_from_row,
        ).optional().map_err(|e| format!("Failed to load bot: {e}"))
    }

    pub fn find_bot_by_name(&self, name: &str) -> Result<Option<Bot>, String> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {BOT_COLUMNS} FROM bots WHERE name = ?1"),
            params![name],
            bot_from_row,
        ).optional().map_err(|e| format!("Failed to load bot: {e}"))
    }

    /// List bots, optionally restricted to one owner.
    pub fn list_bots(&self, owner_id: Option<i64>, skip: usize, limit: usize) -> Result<Vec<Bot>, String> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOT_COLUMNS} FROM bots
             WHERE (?1 IS NULL OR owner_id = ?1)
             ORDER BY id LIMIT ?2 OFFSET ?3"
        )).map_err(|e| format!("Failed to list bots: {e}"))?;

        let rows = stmt
            .query_map(params![owner_id, limit as i64, skip as i64], bot_from_row)
            .map_err(|e| format!("Failed to list bots: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read bot: {e}"))
    }

    /// Apply a partial update. Returns the updated bot, or `None` if it does not exist.
    pub fn update_bot(&self, bot_id: i64, update: &BotUpdate) -> Result<Option<Bot>, String> {
        {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE bots SET
                    name = COALESCE(?2, name),
                    description = COALESCE(?3, description),
                    personality = COALESCE(?4, personality)
                 WHERE id = ?1",
                params![bot_id, update.name, update.description, update.personality],
            ).map_err(|e| format!("Failed to update bot: {e}"))?;
        }
        self.get_bot(bot_id)
    }

    // ==================== SCRIPT METHODS ====================

    pub fn add_script(&self, bot_id: i64, content: &str) -> Result<Script, String> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scripts (bot_id, content) VALUES (?1, ?2)",
            params![bot_id, content],
        ).map_err(|e| format!("Failed to insert script: {e}"))?;

        let script = Script {
            id: conn.last_insert_rowid(),
            bot_id,
            content: content.to_string(),
        };
        debug!("Stored script {} for bot {} ({} chars)", script.id, bot_id, content.len());
        Ok(script)
    }

    pub fn get_script(&self, script_id: i64) -> Result<Option<Script>, String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, bot_id, content FROM scripts WHERE id = ?1",
            params![script_id],
            script_from_row,
        ).optional().map_err(|e| format!("Failed to load script: {e}"))
    }

    pub fn list_scripts(&self, bot_id: i64, skip: usize, limit: usize) -> Result<Vec<Script>, String> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, bot_id, content FROM scripts WHERE bot_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
        ).map_err(|e| format!("Failed to list scripts: {e}"))?;

        let rows = stmt
            .query_map(params![bot_id, limit as i64, skip as i64], script_from_row)
            .map_err(|e| format!("Failed to list scripts: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read script: {e}"))
    }

    pub fn delete_script(&self, script_id: i64) -> Result<bool, String> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM scripts WHERE id = ?1", params![script_id])
            .map_err(|e| format!("Failed to delete script: {e}"))?;
        Ok(changed > 0)
    }

    pub fn script_count(&self, bot_id: i64) -> Result<usize, String> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM scripts WHERE bot_id = ?1",
            params![bot_id],
            |row| row.get::<_, i64>(0),
        ).map(|n| n as usize).map_err(|e| format!("Failed to count scripts: {e}"))
    }

    // ==================== CONVERSATION METHODS ====================

    pub fn find_or_create_conversation(
        &self,
        platform: Platform,
        user_id: &str,
        bot_id: i64,
    ) -> Result<Conversation, String> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO conversations (platform, user_id, bot_id) VALUES (?1, ?2, ?3)",
            params![platform.as_str(), user_id, bot_id],
        ).map_err(|e| format!("Failed to create conversation: {e}"))?;

        let id: i64 = conn.query_row(
            "SELECT id FROM conversations WHERE platform = ?1 AND user_id = ?2 AND bot_id = ?3",
            params![platform.as_str(), user_id, bot_id],
            |row| row.get(0),
        ).map_err(|e| format!("Failed to load conversation: {e}"))?;

        Ok(Conversation {
            id,
            platform,
            user_id: user_id.to_string(),
            bot_id,
        })
    }

    pub fn add_message(
        &self,
        conversation_id: i64,
        content: &str,
        is_from_user: bool,
        timestamp: &str,
    ) -> Result<StoredMessage, String> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (conversation_id, content, is_from_user, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, content, is_from_user, timestamp],
        ).map_err(|e| format!("Failed to insert message: {e}"))?;

        Ok(StoredMessage {
            id: conn.last_insert_rowid(),
            conversation_id,
            content: content.to_string(),
            is_from_user,
            timestamp: timestamp.to_string(),
        })
    }

    /// Most recent `limit` messages of a conversation, oldest first.
    pub fn get_messages(&self, conversation_id: i64, limit: usize) -> Result<Vec<StoredMessage>, String> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, content, is_from_user, timestamp FROM messages
             WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2"
        ).map_err(|e| format!("Failed to read messages: {e}"))?;

        let rows = stmt.query_map(params![conversation_id, limit as i64], |row| {
            Ok(StoredMessage {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                content: row.get(2)?,
                is_from_user: row.get(3)?,
                timestamp: row.get(4)?,
            })
        }).map_err(|e| format!("Failed to read messages: {e}"))?;

        let mut result = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read message: {e}"))?;
        result.reverse();
        Ok(result)
    }

    pub fn list_conversations(&self, bot_id: i64) -> Result<Vec<Conversation>, String> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, platform, user_id, bot_id FROM conversations WHERE bot_id = ?1 ORDER BY id"
        ).map_err(|e| format!("Failed to list conversations: {e}"))?;

        let rows = stmt.query_map(params![bot_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, i64>(3)?))
        }).map_err(|e| format!("Failed to list conversations: {e}"))?;

        let mut result = Vec::new();
        for row in rows {
            let (id, platform, user_id, bot_id) = row.map_err(|e| format!("Failed to read conversation: {e}"))?;
            match platform.parse() {
                Ok(platform) => result.push(Conversation { id, platform, user_id, bot_id }),
                Err(e) => warn!("Skipping conversation {id}: {e}"),
            }
        }
        Ok(result)
    }
}

impl CorpusSource for Database {
    fn fetch_scripts(&self, bot_id: i64) -> Result<Vec<String>, String> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT content FROM scripts WHERE bot_id = ?1 ORDER BY id")
            .map_err(|e| format!("Failed to fetch scripts: {e}"))?;
        let rows = stmt
            .query_map(params![bot_id], |row| row.get::<_, String>(0))
            .map_err(|e| format!("Failed to fetch scripts: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read script: {e}"))
    }
}

impl ProfileSink for Database {
    fn save_personality(&self, bot_id: i64, profile: &PersonalityProfile) -> Result<(), String> {
        let json = serde_json::to_string(profile)
            .map_err(|e| format!("Failed to serialize profile: {e}"))?;
        let trained_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE bots SET personality_profile = ?2, trained_at = ?3 WHERE id = ?1",
            params![bot_id, json, trained_at],
        ).map_err(|e| format!("Failed to save personality: {e}"))?;

        if changed == 0 {
            warn!("Personality for unknown bot {} not saved", bot_id);
        }
        Ok(())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::from_db(&row.get::<_, String>(4)?),
    })
}

fn bot_from_row(row: &Row<'_>) -> rusqlite::Result<Bot> {
    let profile_json: Option<String> = row.get(5)?;
    let personality_profile = profile_json.and_then(|json| match serde_json::from_str(&json) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("Ignoring unreadable personality profile: {e}");
            None
        }
    });

    Ok(Bot {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        personality: row.get(3)?,
        owner_id: row.get(4)?,
        personality_profile,
        trained_at: row.get(6)?,
    })
}

fn script_from_row(row: &Row<'_>) -> rusqlite::Result<Script> {
    Ok(Script {
        id: row.get(0)?,
        bot_id: row.get(1)?,
        content: row.get(2)?,
    })
}
