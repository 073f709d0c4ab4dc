//! Database schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS user_tokens (
    user_id TEXT PRIMARY KEY,
    google_credentials TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Insert or replace the credentials row for one user
pub const UPSERT_CREDENTIALS: &str = r"
INSERT INTO user_tokens (user_id, google_credentials, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(user_id) DO UPDATE SET
    google_credentials = excluded.google_credentials,
    updated_at = excluded.updated_at
";
