//! Tenant activity log. Writes are fire-and-forget: a failed insert is logged and
//! never fails the request that produced it.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    ScreeningCompleted,
    SettingsUpdated,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::ScreeningCompleted => "screening_completed",
            ActivityKind::SettingsUpdated => "settings_updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub user_id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
}

pub trait ActivityLog: Send + Sync {
    fn record(&self, event: ActivityEvent);
}

pub struct PgActivityLog {
    pool: PgPool,
}

impl PgActivityLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ActivityLog for PgActivityLog {
    fn record(&self, event: ActivityEvent) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let result =
                sqlx::query("INSERT INTO activity_log (user_id, kind, message) VALUES ($1, $2, $3)")
                    .bind(event.user_id)
                    .bind(event.kind.as_str())
                    .bind(&event.message)
                    .execute(&pool)
                    .await;
            if let Err(e) = result {
                warn!(user_id = %event.user_id, kind = event.kind.as_str(), error = %e,
                    "failed to write activity log");
            }
        });
    }
}
