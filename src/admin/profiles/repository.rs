use crate::admin::profiles::models::{Privacy, Profile};
use crate::database::{parse_datetime, Database, DbResult};
use std::sync::Arc;

pub struct AdminProfileRepository {
    db: Arc<Database>,
}

impl AdminProfileRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List all profiles ordered by their owner's username
    pub async fn list_all_profiles(&self) -> DbResult<Vec<Profile>> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Vec<Profile>> {
            let conn = db.lock()?;

            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, u.username, p.privacy, p.language, p.mugshot_url, p.created_at
                 FROM profiles p JOIN users u ON u.id = p.user_id
                 ORDER BY u.username",
            )?;

            let profiles = stmt
                .query_map([], |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        privacy: Privacy::from(row.get::<_, String>(3)?),
                        language: row.get(4)?,
                        mugshot_url: row.get(5)?,
                        created_at: parse_datetime(row.get::<_, String>(6)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(profiles)
        })
        .await?
    }
}
