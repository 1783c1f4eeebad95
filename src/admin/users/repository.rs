use std::sync::Arc;

use crate::admin::users::models::AdminUserRow;
use crate::config::SignupSentinels;
use crate::database::{Database, DbResult};
use crate::signup::models::SignupInline;
use crate::signup::repository::find_signup_for_user;
use crate::users::models::User;
use crate::users::repository::{find_user, user_from_row, USER_COLUMNS};

fn to_row(user: User, signup: Option<SignupInline>) -> AdminUserRow {
    AdminUserRow {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_staff: user.is_staff,
        is_active: user.is_active,
        date_joined: user.date_joined,
        signup,
    }
}

pub struct AdminUserRepository {
    db: Arc<Database>,
    sentinels: SignupSentinels,
}

impl AdminUserRepository {
    pub fn new(db: Arc<Database>, sentinels: SignupSentinels) -> Self {
        Self { db, sentinels }
    }

    /// All users ordered by username, each with its signup inline.
    pub async fn list_with_signups(&self) -> DbResult<Vec<AdminUserRow>> {
        let db = self.db.clone();
        let sentinels = self.sentinels.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Vec<AdminUserRow>> {
            let conn = db.lock()?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY username",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let mut rows = Vec::with_capacity(users.len());
            for user in users {
                let signup = find_signup_for_user(&conn, user.id, &sentinels)?
                    .map(|signup| SignupInline::new(&signup, &sentinels));
                rows.push(to_row(user, signup));
            }

            Ok(rows)
        })
        .await?
    }

    pub async fn find_with_signup(&self, user_id: i64) -> DbResult<Option<AdminUserRow>> {
        let db = self.db.clone();
        let sentinels = self.sentinels.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Option<AdminUserRow>> {
            let conn = db.lock()?;

            let Some(user) = find_user(&conn, user_id)? else {
                return Ok(None);
            };
            let signup = find_signup_for_user(&conn, user_id, &sentinels)?
                .map(|signup| SignupInline::new(&signup, &sentinels));

            Ok(Some(to_row(user, signup)))
        })
        .await?
    }
}
