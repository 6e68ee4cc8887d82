use sqlx::{Pool, Row, Sqlite};

/*
Key/value queries backing the persisted session.
The token and the serialized user are always written and removed together.
 */

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

pub async fn get_value(pool: &Pool<Sqlite>, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query("SELECT value FROM session_store WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(r) => Ok(Some(r.try_get("value")?)),
        None => Ok(None),
    }
}

// Both keys in one transaction, so a crash never leaves half a session behind.
pub async fn put_session(pool: &Pool<Sqlite>, token: &str, user_json: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (key, value) in [(TOKEN_KEY, token), (USER_KEY, user_json)] {
        sqlx::query(
            r#"
            INSERT INTO session_store (key, value, updated_at)
            VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
            ON CONFLICT(key) DO UPDATE SET
              value      = excluded.value,
              updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn clear_session(pool: &Pool<Sqlite>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM session_store WHERE key IN (?, ?)")
        .bind(TOKEN_KEY)
        .bind(USER_KEY)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{connection, migrate};

    async fn pool() -> Pool<Sqlite> {
        let pool = connection::get_memory_pool().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn put_overwrites_and_clear_removes_both_keys() {
        let pool = pool().await;
        assert_eq!(get_value(&pool, TOKEN_KEY).await.unwrap(), None);

        put_session(&pool, "t1", r#"{"id":1}"#).await.unwrap();
        put_session(&pool, "t2", r#"{"id":2}"#).await.unwrap();
        assert_eq!(get_value(&pool, TOKEN_KEY).await.unwrap().as_deref(), Some("t2"));
        assert_eq!(get_value(&pool, USER_KEY).await.unwrap().as_deref(), Some(r#"{"id":2}"#));

        assert_eq!(clear_session(&pool).await.unwrap(), 2);
        assert_eq!(clear_session(&pool).await.unwrap(), 0);
        assert_eq!(get_value(&pool, USER_KEY).await.unwrap(), None);
    }
}
