use crate::auth::hash_password;
use crate::database::{parse_datetime, Database, DbResult};
use crate::users::models::User;
use rusqlite::{Connection, OptionalExtension, Row};
use std::sync::Arc;

pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     is_staff, is_superuser, is_active, date_joined, last_login";

/// Maps a row selected with [`USER_COLUMNS`].
pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        is_staff: row.get::<_, i64>(6)? != 0,
        is_superuser: row.get::<_, i64>(7)? != 0,
        is_active: row.get::<_, i64>(8)? != 0,
        date_joined: parse_datetime(row.get::<_, String>(9)?),
        last_login: row.get::<_, Option<String>>(10)?.map(parse_datetime),
    })
}

pub(crate) fn find_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [id],
        user_from_row,
    )
    .optional()
}

/// Writes every mutable column of `user` back to its row.
pub(crate) fn save_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET username = ?1, email = ?2, first_name = ?3, last_name = ?4,
             is_staff = ?5, is_superuser = ?6, is_active = ?7
         WHERE id = ?8",
        rusqlite::params![
            &user.username,
            &user.email,
            &user.first_name,
            &user.last_name,
            user.is_staff,
            user.is_superuser,
            user.is_active,
            user.id
        ],
    )?;
    Ok(())
}

/// Column values for a new `users` row.
#[derive(Debug, Clone, Default)]
pub(crate) struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

pub(crate) fn insert_user(conn: &Connection, user: &NewUser) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, password_hash, first_name, last_name, is_staff, is_superuser, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            &user.username,
            &user.email,
            &user.password_hash,
            &user.first_name,
            &user.last_name,
            user.is_staff,
            user.is_superuser,
            user.is_active
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Creates an account directly, bypassing the signup flow.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> DbResult<User> {
        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            is_staff,
            is_superuser,
            is_active: true,
            ..Default::default()
        };
        let db = self.db.clone();

        let user_id = tokio::task::spawn_blocking(move || -> DbResult<i64> {
            let conn = db.lock()?;
            Ok(insert_user(&conn, &new_user)?)
        })
        .await??;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| format!("user {} vanished after insert", user_id).into())
    }

    /// Creates the configured superuser unless that username already exists.
    pub async fn ensure_superuser(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DbResult<User> {
        if let Some(existing) = self.find_by_username(username).await? {
            return Ok(existing);
        }
        self.create_user(username, email, password, true, true).await
    }

    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let db = self.db.clone();
        let username = username.to_string();

        tokio::task::spawn_blocking(move || -> DbResult<Option<User>> {
            let conn = db.lock()?;

            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                    [&username],
                    user_from_row,
                )
                .optional()?;

            Ok(user)
        })
        .await?
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Option<User>> {
            let conn = db.lock()?;
            Ok(find_user(&conn, id)?)
        })
        .await?
    }

    pub async fn username_exists(&self, username: &str) -> DbResult<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    pub async fn save(&self, user: &User) -> DbResult<()> {
        let db = self.db.clone();
        let user = user.clone();

        tokio::task::spawn_blocking(move || -> DbResult<()> {
            let conn = db.lock()?;
            save_user(&conn, &user)?;
            Ok(())
        })
        .await?
    }

    pub async fn record_login(&self, user_id: i64) -> DbResult<()> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> DbResult<()> {
            let conn = db.lock()?;
            conn.execute(
                "UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = ?1",
                [user_id],
            )?;
            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> UserRepository {
        let db = Database::new(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        UserRepository::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = test_repo().await;
        let user = repo
            .create_user("grace", "grace@example.com", "password123", false, false)
            .await
            .unwrap();

        assert!(user.is_active);
        assert!(!user.is_staff);
        assert_eq!(repo.find_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert!(repo.username_exists("grace").await.unwrap());
        assert!(repo.find_by_id(user.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_superuser_is_idempotent() {
        let repo = test_repo().await;
        let first = repo
            .ensure_superuser("root", "root@example.com", "password123")
            .await
            .unwrap();
        let second = repo
            .ensure_superuser("root", "other@example.com", "password456")
            .await
            .unwrap();

        assert!(first.is_superuser && first.is_staff);
        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "root@example.com");
    }

    #[tokio::test]
    async fn test_insert_user_writes_each_column() {
        let repo = test_repo().await;
        let user_id = {
            let conn = repo.db.lock().unwrap();
            insert_user(
                &conn,
                &NewUser {
                    username: "ken".to_string(),
                    email: "ken@example.com".to_string(),
                    password_hash: "hash".to_string(),
                    first_name: "Ken".to_string(),
                    last_name: "Thompson".to_string(),
                    is_staff: true,
                    ..Default::default()
                },
            )
            .unwrap()
        };

        let user = repo.find_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.email, "ken@example.com");
        assert_eq!(user.password_hash, "hash");
        assert_eq!(user.last_name, "Thompson");
        assert!(user.is_staff);
        assert!(!user.is_superuser);
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn test_save_persists_flags() {
        let repo = test_repo().await;
        let mut user = repo
            .create_user("linus", "linus@example.com", "password123", false, false)
            .await
            .unwrap();

        user.is_active = false;
        user.first_name = "Linus".to_string();
        repo.save(&user).await.unwrap();

        let reloaded = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!reloaded.is_active);
        assert_eq!(reloaded.first_name, "Linus");
    }
}
