use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;

use super::DbClient;
use crate::db::models::{Admin, NewAdmin};
use crate::Result;

impl DbClient {
    pub async fn find_admin_by_username(&self, login: &str) -> Result<Option<Admin>> {
        use crate::schema::admins::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        admins
            .filter(username.eq(login))
            .first::<Admin>(conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    /// Inserts the admin unless the username is taken. Returns whether a row
    /// was created.
    pub async fn ensure_admin(&self, login: &str, hash: &str) -> Result<bool> {
        use crate::schema::admins::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let inserted = diesel::insert_into(admins)
            .values(&NewAdmin {
                username: login,
                password_hash: hash,
            })
            .on_conflict(username)
            .do_nothing()
            .execute(conn)
            .await?;
        Ok(inserted > 0)
    }
}
