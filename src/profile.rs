//! Read-only user profile access.
//!
//! Profiles are seeded by the surrounding platform; the memory core only
//! reads them — the display name feeds slug auto-generation and the
//! timezone is surfaced to callers assembling prompt context.

use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub timezone: String,
    pub created_at: String,
}

impl UserProfile {
    /// First token of the display name, used as the slug prefix.
    pub fn owner_handle(&self) -> &str {
        self.display_name.split_whitespace().next().unwrap_or("user")
    }
}

/// Look up a profile by user ID.
pub fn get_user_profile(
    conn: &Connection,
    user_id: &str,
) -> rusqlite::Result<Option<UserProfile>> {
    conn.query_row(
        "SELECT user_id, display_name, first_name, timezone, created_at \
         FROM user_profiles WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(UserProfile {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
                first_name: row.get(2)?,
                timezone: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO user_profiles (user_id, display_name, first_name, timezone, created_at) \
             VALUES ('u1', 'Dave Smith', 'Dave', 'America/Los_Angeles', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn lookup_returns_profile() {
        let conn = test_db();
        let profile = get_user_profile(&conn, "u1").unwrap().unwrap();
        assert_eq!(profile.display_name, "Dave Smith");
        assert_eq!(profile.timezone, "America/Los_Angeles");
    }

    #[test]
    fn lookup_missing_returns_none() {
        let conn = test_db();
        assert!(get_user_profile(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn owner_handle_is_first_token() {
        let conn = test_db();
        let profile = get_user_profile(&conn, "u1").unwrap().unwrap();
        assert_eq!(profile.owner_handle(), "Dave");
    }

    #[test]
    fn owner_handle_falls_back_on_empty_name() {
        let profile = UserProfile {
            user_id: "u2".into(),
            display_name: "  ".into(),
            first_name: None,
            timezone: "UTC".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert_eq!(profile.owner_handle(), "user");
    }
}
