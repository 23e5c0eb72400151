use crate::Database;
use crate::models::{CredentialRow, PostRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "u.id, u.name, u.nick, u.email, u.created_at";

const POST_COLUMNS: &str =
    "p.id, p.title, p.content, p.author_id, u.nick, p.likes, p.created_at";

impl Database {
    // -- Users --

    /// Inserts a user and returns the assigned id. `password_hash` must already be hashed.
    pub fn create_user(
        &self,
        name: &str,
        nick: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (name, nick, email, password) VALUES (?1, ?2, ?3, ?4)",
                (name, nick, email, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Case-insensitive substring match over name or nick. An empty filter matches everyone.
    pub fn search_users(&self, filter: &str) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", escape_like(&filter.to_lowercase()));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                r"SELECT {USER_COLUMNS} FROM users u
                  WHERE unicode_lower(u.name) LIKE ?1 ESCAPE '\'
                     OR unicode_lower(u.nick) LIKE ?1 ESCAPE '\'
                  ORDER BY u.id"
            ))?;

            let rows = stmt
                .query_map([&pattern], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<CredentialRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, password FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(CredentialRow {
                        id: row.get(0)?,
                        password: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Returns false when no user has `id`.
    pub fn update_user(&self, id: i64, name: &str, nick: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?1, nick = ?2, email = ?3 WHERE id = ?4",
                rusqlite::params![name, nick, email, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the user. Posts and follow edges go with it through ON DELETE CASCADE.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn get_password_hash(&self, id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT password FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    pub fn update_password(&self, id: i64, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Followers --

    /// Records that `follower_id` follows `user_id`. Already following is not an error.
    pub fn follow(&self, user_id: i64, follower_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO followers (user_id, follower_id) VALUES (?1, ?2)",
                [user_id, follower_id],
            )?;
            Ok(())
        })
    }

    /// Removes the edge if present.
    pub fn unfollow(&self, user_id: i64, follower_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM followers WHERE user_id = ?1 AND follower_id = ?2",
                [user_id, follower_id],
            )?;
            Ok(())
        })
    }

    /// Users following `user_id`.
    pub fn get_followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u
                 INNER JOIN followers f ON f.follower_id = u.id
                 WHERE f.user_id = ?1
                 ORDER BY u.id"
            ))?;

            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users that `user_id` follows.
    pub fn get_following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u
                 INNER JOIN followers f ON f.user_id = u.id
                 WHERE f.follower_id = ?1
                 ORDER BY u.id"
            ))?;

            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn create_post(&self, title: &str, content: &str, author_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (title, content, author_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![title, content, author_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts p
                     INNER JOIN users u ON u.id = p.author_id
                     WHERE p.id = ?1"
                ),
                [id],
                post_from_row,
            )
            .optional()
        })
    }

    /// Posts written by `user_id` or by anyone `user_id` follows, newest first.
    pub fn feed(&self, user_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            // The subquery keeps each post to one row no matter how edges fan out.
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts p
                 INNER JOIN users u ON u.id = p.author_id
                 WHERE p.author_id = ?1
                    OR p.author_id IN (SELECT user_id FROM followers WHERE follower_id = ?1)
                 ORDER BY p.created_at DESC, p.id DESC"
            ))?;

            let rows = stmt
                .query_map([user_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_posts_by_user(&self, author_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts p
                 INNER JOIN users u ON u.id = p.author_id
                 WHERE p.author_id = ?1
                 ORDER BY p.created_at DESC, p.id DESC"
            ))?;

            let rows = stmt
                .query_map([author_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: i64, title: &str, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = ?1, content = ?2 WHERE id = ?3",
                rusqlite::params![title, content, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Returns false when the post does not exist.
    pub fn like_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE posts SET likes = likes + 1 WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Decrements the like counter, stopping at zero.
    pub fn unlike_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET likes = CASE WHEN likes > 0 THEN likes - 1 ELSE 0 END
                 WHERE id = ?1",
                [id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
        [id],
        user_from_row,
    )
    .optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        nick: row.get(2)?,
        email: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_nick: row.get(4)?,
        likes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
