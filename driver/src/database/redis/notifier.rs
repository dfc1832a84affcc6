use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Connection;
use error_stack::{Report, ResultExt};
use kernel::interface::database::DatabaseConnection;
use kernel::interface::notify::LoanNotifier;
use kernel::prelude::entity::{LoanId, NotificationKind};
use kernel::KernelError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::database::RedisDatabase;
use crate::error::ConvertError;

const NOTIFICATION_STREAM: &str = "NOTIFICATION_STREAM";
const DEFAULT_STREAM: &str = "loan-notifications";
const PAYLOAD_FIELD: &str = "notification";

/// Entry appended to the stream for the mailer to pick up.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LoanNotification {
    pub loan_id: Uuid,
    pub kind: NotificationKind,
    /// Unix timestamp, seconds.
    pub queued_at: i64,
}

/// Publishes loan events to a Redis stream with `XADD`.
#[derive(Clone)]
pub struct RedisLoanNotifier {
    db: RedisDatabase,
    stream: String,
}

impl RedisLoanNotifier {
    pub fn new(db: RedisDatabase) -> Self {
        let stream = dotenvy::var(NOTIFICATION_STREAM).unwrap_or_else(|_| DEFAULT_STREAM.into());
        Self::with_stream(db, stream)
    }

    pub fn with_stream(db: RedisDatabase, stream: impl Into<String>) -> Self {
        Self {
            db,
            stream: stream.into(),
        }
    }

    pub async fn pending(&self) -> error_stack::Result<i64, KernelError> {
        let mut con = self.db.transact().await?;
        RedisNotifierInternal::len(&mut con, &self.stream).await
    }
}

#[async_trait::async_trait]
impl LoanNotifier for RedisLoanNotifier {
    #[tracing::instrument(skip_all, fields(loan_id = %loan_id.as_ref(), %kind))]
    async fn notify(
        &self,
        loan_id: &LoanId,
        kind: NotificationKind,
    ) -> error_stack::Result<(), KernelError> {
        let notification = LoanNotification {
            loan_id: *loan_id.as_ref(),
            kind,
            queued_at: OffsetDateTime::now_utc().unix_timestamp(),
        };
        let mut con = self.db.transact().await?;
        RedisNotifierInternal::append(&mut con, &self.stream, &notification).await?;
        tracing::debug!(stream = %self.stream, "notification queued");
        Ok(())
    }
}

pub(in crate::database) struct RedisNotifierInternal;

impl RedisNotifierInternal {
    async fn append(
        con: &mut Connection,
        stream: &str,
        notification: &LoanNotification,
    ) -> error_stack::Result<(), KernelError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| Report::new(e).change_context(KernelError::Internal))?;
        let _: String = con
            .xadd(stream, "*", &[(PAYLOAD_FIELD, &payload)])
            .await
            .convert_error()?;
        Ok(())
    }

    async fn len(con: &mut Connection, stream: &str) -> error_stack::Result<i64, KernelError> {
        con.xlen(stream)
            .await
            .convert_error()
            .attach_printable_lazy(|| format!("Failed to get size. target: {stream}"))
    }
}

#[cfg(test)]
mod test {
    use kernel::interface::database::DatabaseConnection;
    use kernel::interface::notify::LoanNotifier;
    use kernel::prelude::entity::{LoanId, NotificationKind};
    use kernel::KernelError;
    use uuid::Uuid;

    use crate::database::redis::notifier::RedisNotifierInternal;
    use crate::database::{LoanNotification, RedisDatabase, RedisLoanNotifier};

    #[test]
    fn payload_uses_camel_case_kinds() {
        let notification = LoanNotification {
            loan_id: Uuid::nil(),
            kind: NotificationKind::ReturnedLoan,
            queued_at: 0,
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains(r#""kind":"returnedLoan""#));
    }

    #[test_with::env(REDIS_TEST)]
    #[tokio::test]
    async fn test() -> error_stack::Result<(), KernelError> {
        let db = RedisDatabase::new()?;
        let stream = format!("test-{}", Uuid::new_v4());
        let notifier = RedisLoanNotifier::with_stream(db.clone(), stream.clone());

        let before = notifier.pending().await?;
        notifier
            .notify(&LoanId::new(Uuid::new_v4()), NotificationKind::NewLoan)
            .await?;
        assert_eq!(notifier.pending().await?, before + 1);

        let mut con = db.transact().await?;
        assert_eq!(RedisNotifierInternal::len(&mut con, &stream).await?, 1);
        Ok(())
    }
}
