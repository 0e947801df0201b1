use crate::config::Config;
use crate::llm::transcript::ConversationState;
use rusqlite::{Connection, OptionalExtension, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// SQLite-backed store for per-user conversation state. Strongly consistent
/// per key; the caller drives at most one exchange per user at a time.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS chat_state (
                user_id TEXT PRIMARY KEY,
                transcript TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS chat_images (
                user_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                data BLOB NOT NULL,
                PRIMARY KEY (user_id, position)
            );
        ";
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    pub fn load_chat_state(&self, user_id: &str) -> anyhow::Result<Option<ConversationState>> {
        let conn = self.conn.lock().unwrap();

        let transcript_json: Option<String> = conn
            .query_row(
                "SELECT transcript FROM chat_state WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(transcript_json) = transcript_json else {
            return Ok(None);
        };

        let transcript = serde_json::from_str(&transcript_json)?;

        let mut stmt =
            conn.prepare("SELECT data FROM chat_images WHERE user_id = ?1 ORDER BY position")?;
        let rows = stmt.query_map([user_id], |row| row.get::<_, Vec<u8>>(0))?;

        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }

        debug!(
            "Database: Loaded chat state for user {} ({} images)",
            user_id,
            images.len()
        );
        Ok(Some(ConversationState {
            user_id: user_id.to_string(),
            transcript,
            images,
        }))
    }

    /// Replace the user's stored state wholesale: transcript plus all images.
    pub fn save_chat_state(&self, state: &ConversationState) -> anyhow::Result<()> {
        debug!(
            "Database: Saving chat state for user {} ({} messages, {} images)",
            state.user_id,
            state.transcript.len(),
            state.images.len()
        );
        let transcript_json = serde_json::to_string(&state.transcript)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO chat_state (user_id, transcript, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id) DO UPDATE SET transcript = ?2, updated_at = CURRENT_TIMESTAMP",
            (&state.user_id, &transcript_json),
        )?;
        tx.execute("DELETE FROM chat_images WHERE user_id = ?1", (&state.user_id,))?;
        for (position, data) in state.images.iter().enumerate() {
            tx.execute(
                "INSERT INTO chat_images (user_id, position, data) VALUES (?1, ?2, ?3)",
                (&state.user_id, position as i64, data),
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove the user's state entirely. Returns whether anything existed.
    pub fn reset_chat_state(&self, user_id: &str) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM chat_state WHERE user_id = ?1", [user_id])?;
        conn.execute("DELETE FROM chat_images WHERE user_id = ?1", [user_id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::transcript::Message;

    fn test_config() -> Config {
        Config {
            discord_token: "test".to_string(),
            llama_url: "test".to_string(),
            llama_api_key: None,
            chat_model: "test".to_string(),
            guard_model: "test".to_string(),
            vision_model: "test".to_string(),
            database_url: ":memory:".to_string(),
            system_prompt: "test".to_string(),
            status_message: "test".to_string(),
            agent_max_rounds: 10,
            response_chunk_limit: 4000,
            safety_exempt_codes: vec!["S14".to_string()],
            roblox_api_key: None,
            roblox_universe_id: None,
            roblox_place_id: None,
            luau_poll_interval_secs: 2,
            searx_url: "test".to_string(),
            search_results_amount: 3,
            scrape_timeout_secs: 30,
        }
    }

    fn test_db() -> Database {
        let db = Database::new(&test_config()).unwrap();
        db.execute_init().unwrap();
        db
    }

    #[test]
    fn test_load_absent_state() {
        let db = test_db();
        assert!(db.load_chat_state("42").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let db = test_db();

        let mut state = ConversationState::new("42", "sys prompt");
        state.transcript.push(Message::user("hello"));
        state.register_images(vec![vec![1, 2, 3], vec![4, 5]]);

        db.save_chat_state(&state).unwrap();

        let loaded = db.load_chat_state("42").unwrap().unwrap();
        assert_eq!(loaded.transcript, state.transcript);
        assert_eq!(loaded.images, vec![vec![1, 2, 3], vec![4, 5]]);
        assert_eq!(loaded.user_id, "42");
    }

    #[test]
    fn test_save_replaces_wholesale() {
        let db = test_db();

        let mut state = ConversationState::new("42", "sys");
        state.register_images(vec![vec![1]]);
        db.save_chat_state(&state).unwrap();

        state.transcript.push(Message::user("more"));
        state.register_images(vec![vec![2], vec![3]]);
        db.save_chat_state(&state).unwrap();

        let loaded = db.load_chat_state("42").unwrap().unwrap();
        assert_eq!(loaded.transcript.len(), 2);
        assert_eq!(loaded.images, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_reset_reports_whether_state_existed() {
        let db = test_db();

        assert!(!db.reset_chat_state("42").unwrap());

        let state = ConversationState::new("42", "sys");
        db.save_chat_state(&state).unwrap();

        assert!(db.reset_chat_state("42").unwrap());
        assert!(db.load_chat_state("42").unwrap().is_none());
        assert!(!db.reset_chat_state("42").unwrap());
    }

    #[test]
    fn test_states_are_isolated_per_user() {
        let db = test_db();

        let mut a = ConversationState::new("1", "sys");
        a.register_images(vec![vec![1]]);
        let b = ConversationState::new("2", "sys");
        db.save_chat_state(&a).unwrap();
        db.save_chat_state(&b).unwrap();

        db.reset_chat_state("1").unwrap();
        assert!(db.load_chat_state("1").unwrap().is_none());
        assert!(db.load_chat_state("2").unwrap().is_some());
    }
}
