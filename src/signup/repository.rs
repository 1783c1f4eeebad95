use crate::config::SignupSentinels;
use crate::database::{parse_datetime, Database, DbResult};
use crate::signup::models::{ActivationKey, Signup};
use crate::users::models::User;
use crate::users::repository::{find_user, insert_user, save_user, NewUser};
use rusqlite::{Connection, OptionalExtension, Row};
use std::sync::Arc;

const SIGNUP_COLUMNS: &str = "id, user_id, activation_key, created_at, updated_at";

fn signup_from_row(row: &Row<'_>, sentinels: &SignupSentinels) -> rusqlite::Result<Signup> {
    Ok(Signup {
        id: row.get(0)?,
        user_id: row.get(1)?,
        activation_key: ActivationKey::from_stored(row.get(2)?, sentinels),
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

pub(crate) fn find_signup_for_user(
    conn: &Connection,
    user_id: i64,
    sentinels: &SignupSentinels,
) -> rusqlite::Result<Option<Signup>> {
    conn.query_row(
        &format!("SELECT {} FROM signups WHERE user_id = ?1", SIGNUP_COLUMNS),
        [user_id],
        |row| signup_from_row(row, sentinels),
    )
    .optional()
}

fn save_signup(
    conn: &Connection,
    signup: &Signup,
    sentinels: &SignupSentinels,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE signups SET activation_key = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        rusqlite::params![signup.activation_key.to_stored(sentinels), signup.id],
    )?;
    Ok(())
}

/// Fields collected from a self-registration form.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub activation_key: String,
}

pub struct SignupRepository {
    db: Arc<Database>,
    sentinels: SignupSentinels,
}

impl SignupRepository {
    pub fn new(db: Arc<Database>, sentinels: SignupSentinels) -> Self {
        Self { db, sentinels }
    }

    /// Inserts an inactive user, its signup and a default profile together.
    pub async fn register(&self, registration: NewRegistration) -> DbResult<(User, Signup)> {
        let db = self.db.clone();
        let sentinels = self.sentinels.clone();

        tokio::task::spawn_blocking(move || -> DbResult<(User, Signup)> {
            let mut conn = db.lock()?;
            let tx = conn.transaction()?;

            let user_id = insert_user(
                &tx,
                &NewUser {
                    username: registration.username,
                    email: registration.email,
                    password_hash: registration.password_hash,
                    first_name: registration.first_name,
                    last_name: registration.last_name,
                    ..Default::default()
                },
            )?;
            tx.execute(
                "INSERT INTO signups (user_id, activation_key) VALUES (?1, ?2)",
                rusqlite::params![user_id, &registration.activation_key],
            )?;
            tx.execute("INSERT INTO profiles (user_id) VALUES (?1)", [user_id])?;

            let user = find_user(&tx, user_id)?.ok_or("registered user not found")?;
            let signup = find_signup_for_user(&tx, user_id, &sentinels)?
                .ok_or("registered signup not found")?;
            tx.commit()?;

            Ok((user, signup))
        })
        .await?
    }

    /// Attaches a signup to an existing user, e.g. one created by staff.
    pub async fn attach(&self, user_id: i64, key: ActivationKey) -> DbResult<Signup> {
        let db = self.db.clone();
        let sentinels = self.sentinels.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Signup> {
            let conn = db.lock()?;
            conn.execute(
                "INSERT INTO signups (user_id, activation_key) VALUES (?1, ?2)",
                rusqlite::params![user_id, key.to_stored(&sentinels)],
            )?;
            let signup = find_signup_for_user(&conn, user_id, &sentinels)?
                .ok_or("attached signup not found")?;
            Ok(signup)
        })
        .await?
    }

    /// The user's signup, or `None` for accounts that never went through
    /// self-registration.
    pub async fn find_for_user(&self, user_id: i64) -> DbResult<Option<Signup>> {
        let db = self.db.clone();
        let sentinels = self.sentinels.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Option<Signup>> {
            let conn = db.lock()?;
            Ok(find_signup_for_user(&conn, user_id, &sentinels)?)
        })
        .await?
    }

    /// Looks up a live token. Sentinel values never match.
    pub async fn find_by_token(&self, token: &str) -> DbResult<Option<Signup>> {
        let key = ActivationKey::from_stored(token.to_string(), &self.sentinels);
        if !matches!(key, ActivationKey::Token(_)) {
            return Ok(None);
        }

        let db = self.db.clone();
        let sentinels = self.sentinels.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || -> DbResult<Option<Signup>> {
            let conn = db.lock()?;
            let signup = conn
                .query_row(
                    &format!("SELECT {} FROM signups WHERE activation_key = ?1", SIGNUP_COLUMNS),
                    [&token],
                    |row| signup_from_row(row, &sentinels),
                )
                .optional()?;
            Ok(signup)
        })
        .await?
    }

    /// Persists the signup and then its user inside one transaction.
    pub async fn save_with_user(&self, signup: &Signup, user: &User) -> DbResult<()> {
        let db = self.db.clone();
        let sentinels = self.sentinels.clone();
        let signup = signup.clone();
        let user = user.clone();

        tokio::task::spawn_blocking(move || -> DbResult<()> {
            let mut conn = db.lock()?;
            let tx = conn.transaction()?;
            save_signup(&tx, &signup, &sentinels)?;
            save_user(&tx, &user)?;
            tx.commit()?;
            Ok(())
        })
        .await?
    }
}
