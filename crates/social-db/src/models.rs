//! Database row types. These map directly to SQLite rows and stay independent
//! of the API models in `social-types`.

pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub nick: String,
    pub email: String,
    pub created_at: String,
}

/// Credentials looked up at login.
pub struct CredentialRow {
    pub id: i64,
    pub password: String,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_nick: String,
    pub likes: i64,
    pub created_at: String,
}
