// src/repositories/meeting_repository.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppResult;

/// Batch/meeting ownership lookups, owned by the course module.
#[async_trait]
pub trait MeetingDirectory: Send + Sync {
    /// True when the teacher teaches any meeting of the batch that owns `meeting_id`.
    async fn is_meeting_owned_by_teacher(&self, teacher_id: i64, meeting_id: i64) -> AppResult<bool>;

    /// The batch owning the meeting, if the meeting exists.
    async fn batch_for_meeting(&self, meeting_id: i64) -> AppResult<Option<i64>>;
}

/// Payment lookups, owned by the purchase module.
#[async_trait]
pub trait PurchaseLedger: Send + Sync {
    async fn has_paid(&self, user_id: i64, batch_id: i64) -> AppResult<bool>;
}

pub struct PgMeetingDirectory {
    pool: PgPool,
}

impl PgMeetingDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingDirectory for PgMeetingDirectory {
    async fn is_meeting_owned_by_teacher(&self, teacher_id: i64, meeting_id: i64) -> AppResult<bool> {
        let owned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM meetings target
                JOIN meetings taught ON taught.batch_id = target.batch_id
                WHERE target.id = $2 AND taught.teacher_id = $1
            )
            "#,
        )
        .bind(teacher_id)
        .bind(meeting_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owned)
    }

    async fn batch_for_meeting(&self, meeting_id: i64) -> AppResult<Option<i64>> {
        let batch_id = sqlx::query_scalar("SELECT batch_id FROM meetings WHERE id = $1")
            .bind(meeting_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch_id)
    }
}

pub struct PgPurchaseLedger {
    pool: PgPool,
}

impl PgPurchaseLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseLedger for PgPurchaseLedger {
    async fn has_paid(&self, user_id: i64, batch_id: i64) -> AppResult<bool> {
        let paid: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = $1 AND batch_id = $2 AND status = 'paid')",
        )
        .bind(user_id)
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(paid)
    }
}
