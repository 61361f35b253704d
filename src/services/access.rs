// src/services/access.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::user::{CurrentUser, Role},
    repositories::{MeetingDirectory, PurchaseLedger},
};

/// Decides, for one role, whether a user may act on resources of a meeting.
#[async_trait]
pub trait AccessStrategy: Send + Sync {
    async fn allows(&self, user_id: i64, meeting_id: i64) -> AppResult<bool>;
}

pub struct AdminAlways;

#[async_trait]
impl AccessStrategy for AdminAlways {
    async fn allows(&self, _user_id: i64, _meeting_id: i64) -> AppResult<bool> {
        Ok(true)
    }
}

/// Teachers act on meetings of batches they teach in.
pub struct TeacherOwnership {
    directory: Arc<dyn MeetingDirectory>,
}

#[async_trait]
impl AccessStrategy for TeacherOwnership {
    async fn allows(&self, user_id: i64, meeting_id: i64) -> AppResult<bool> {
        self.directory.is_meeting_owned_by_teacher(user_id, meeting_id).await
    }
}

/// Students act on meetings of batches they paid for.
pub struct StudentPayment {
    directory: Arc<dyn MeetingDirectory>,
    ledger: Arc<dyn PurchaseLedger>,
}

#[async_trait]
impl AccessStrategy for StudentPayment {
    async fn allows(&self, user_id: i64, meeting_id: i64) -> AppResult<bool> {
        match self.directory.batch_for_meeting(meeting_id).await? {
            Some(batch_id) => self.ledger.has_paid(user_id, batch_id).await,
            None => Ok(false),
        }
    }
}

/// The shared access predicate consulted by every quiz operation.
pub struct AccessGuard {
    admin: Box<dyn AccessStrategy>,
    teacher: Box<dyn AccessStrategy>,
    student: Box<dyn AccessStrategy>,
}

impl AccessGuard {
    pub fn new(directory: Arc<dyn MeetingDirectory>, ledger: Arc<dyn PurchaseLedger>) -> Self {
        Self {
            admin: Box::new(AdminAlways),
            teacher: Box::new(TeacherOwnership {
                directory: directory.clone(),
            }),
            student: Box::new(StudentPayment { directory, ledger }),
        }
    }

    fn strategy(&self, role: Role) -> Option<&dyn AccessStrategy> {
        match role {
            Role::Admin => Some(self.admin.as_ref()),
            Role::Teacher => Some(self.teacher.as_ref()),
            Role::Student => Some(self.student.as_ref()),
            Role::Unknown => None,
        }
    }

    /// Unknown roles and failed lookups both deny.
    pub async fn can_access(&self, user: &CurrentUser, meeting_id: i64) -> bool {
        let Some(strategy) = self.strategy(user.role) else {
            tracing::debug!("Denying unknown role for user {} on meeting {}", user.id, meeting_id);
            return false;
        };

        match strategy.allows(user.id, meeting_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(
                    "Access lookup failed for user {} ({}) on meeting {}: {}",
                    user.id,
                    user.role.as_str(),
                    meeting_id,
                    e
                );
                false
            }
        }
    }

    pub async fn ensure_access(&self, user: &CurrentUser, meeting_id: i64) -> AppResult<()> {
        if self.can_access(user, meeting_id).await {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "you do not have access to this meeting".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Directory;

    #[async_trait]
    impl MeetingDirectory for Directory {
        // Meeting 1 belongs to batch 100, taught by teacher 5. Meeting 2 lookups fail.
        async fn is_meeting_owned_by_teacher(&self, teacher_id: i64, meeting_id: i64) -> AppResult<bool> {
            match meeting_id {
                1 => Ok(teacher_id == 5),
                2 => Err(AppError::InternalServerError("lookup failed".into())),
                _ => Ok(false),
            }
        }

        async fn batch_for_meeting(&self, meeting_id: i64) -> AppResult<Option<i64>> {
            match meeting_id {
                1 => Ok(Some(100)),
                2 => Err(AppError::InternalServerError("lookup failed".into())),
                _ => Ok(None),
            }
        }
    }

    struct Ledger;

    #[async_trait]
    impl PurchaseLedger for Ledger {
        async fn has_paid(&self, user_id: i64, batch_id: i64) -> AppResult<bool> {
            Ok(user_id == 9 && batch_id == 100)
        }
    }

    fn guard() -> AccessGuard {
        AccessGuard::new(Arc::new(Directory), Arc::new(Ledger))
    }

    #[tokio::test]
    async fn test_admin_always_allowed() {
        let admin = CurrentUser::new(1, Role::Admin);
        assert!(guard().can_access(&admin, 1).await);
        assert!(guard().can_access(&admin, 999).await);
    }

    #[tokio::test]
    async fn test_teacher_needs_ownership() {
        let g = guard();
        assert!(g.can_access(&CurrentUser::new(5, Role::Teacher), 1).await);
        assert!(!g.can_access(&CurrentUser::new(6, Role::Teacher), 1).await);
    }

    #[tokio::test]
    async fn test_student_needs_payment() {
        let g = guard();
        assert!(g.can_access(&CurrentUser::new(9, Role::Student), 1).await);
        assert!(!g.can_access(&CurrentUser::new(10, Role::Student), 1).await);
        // Unknown meeting: no batch, no access.
        assert!(!g.can_access(&CurrentUser::new(9, Role::Student), 3).await);
    }

    #[tokio::test]
    async fn test_failed_lookup_and_unknown_role_deny() {
        let g = guard();
        assert!(!g.can_access(&CurrentUser::new(5, Role::Teacher), 2).await);
        assert!(!g.can_access(&CurrentUser::new(9, Role::Student), 2).await);
        assert!(!g.can_access(&CurrentUser::new(9, Role::Unknown), 1).await);
    }

    #[tokio::test]
    async fn test_ensure_access_maps_to_forbidden() {
        let err = guard()
            .ensure_access(&CurrentUser::new(6, Role::Teacher), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
