//! Notification outbox operations.

use crate::domain::{Notification, TimeMs};
use sqlx::Row;

use super::{parse_user_id, OutboxRow, Repository};

impl Repository {
    /// Enqueue a notification for external delivery. Returns the row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn enqueue_notification(
        &self,
        notification: &Notification,
        now: TimeMs,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO outbox_notifications (user_id, kind, message, metadata, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.recipient().to_string())
        .bind(notification.kind())
        .bind(notification.message())
        .bind(notification.metadata().to_string())
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Undelivered notifications, oldest first.
    pub async fn unsent_notifications(&self, limit: i64) -> Result<Vec<OutboxRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, message, metadata, created_at, sent_at
            FROM outbox_notifications
            WHERE sent_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let user_id: String = row.get("user_id");
                let sent_at: Option<i64> = row.get("sent_at");
                Ok(OutboxRow {
                    id: row.get("id"),
                    user_id: parse_user_id("user_id", &user_id)?,
                    kind: row.get("kind"),
                    message: row.get("message"),
                    metadata: row.get("metadata"),
                    created_at: TimeMs::new(row.get("created_at")),
                    sent_at: sent_at.map(TimeMs::new),
                })
            })
            .collect()
    }

    /// Acknowledge delivery of one notification. Single-shot: returns false
    /// when the row was already acknowledged or does not exist.
    pub async fn mark_notification_sent(
        &self,
        id: i64,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_notifications SET sent_at = ?
            WHERE id = ? AND sent_at IS NULL
            "#,
        )
        .bind(now.as_ms())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
