use diesel::upsert::excluded;
use diesel::{BoolExpressionMethods, ExpressionMethods, PgTextExpressionMethods, QueryDsl, QueryResult};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::DbClient;
use crate::db::models::{NewUser, SearchQuery, User};
use crate::Result;

/// Customers are keyed by phone number; the latest name given wins
pub(crate) async fn upsert_user(
    conn: &mut AsyncPgConnection,
    name: &str,
    phone: &str,
) -> QueryResult<User> {
    use crate::schema::users;

    diesel::insert_into(users::table)
        .values(&NewUser { name, phone })
        .on_conflict(users::phone)
        .do_update()
        .set(users::name.eq(excluded(users::name)))
        .get_result::<User>(conn)
        .await
}

/// Pattern for a case-insensitive substring match
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl DbClient {
    pub async fn list_users(&self, query: &SearchQuery) -> Result<Vec<User>> {
        use crate::schema::users::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let mut statement = users.order_by(created_at.desc()).into_boxed();

        if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
            let pattern = like_pattern(term);
            statement = statement.filter(name.ilike(pattern.clone()).or(phone.ilike(pattern)));
        }

        statement.load::<User>(conn).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" para "), "%para%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
