use error_stack::Report;
use time::{Duration, OffsetDateTime};
use vodca::{AsRefln, Fromln};

use crate::KernelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Fromln, AsRefln)]
pub struct DueDate(OffsetDateTime);

impl DueDate {
    pub fn new(time: impl Into<OffsetDateTime>) -> Self {
        Self(time.into())
    }

    /// `start + duration`, or `InvalidInput` when that leaves the representable range.
    pub fn after(
        start: OffsetDateTime,
        duration: Duration,
    ) -> error_stack::Result<Self, KernelError> {
        start.checked_add(duration).map(Self).ok_or_else(|| {
            Report::new(KernelError::InvalidInput)
                .attach_printable(format!("{start} + {duration} is out of range"))
        })
    }

    pub fn extended_by(&self, duration: Duration) -> error_stack::Result<Self, KernelError> {
        Self::after(self.0, duration)
    }
}

#[cfg(test)]
mod test {
    use time::macros::datetime;
    use time::Duration;

    use crate::entity::DueDate;
    use crate::KernelError;

    #[test]
    fn far_future_is_invalid_input() {
        let err = DueDate::after(datetime!(2024-01-01 00:00 UTC), Duration::days(5_000_000))
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);

        let err = DueDate::new(datetime!(9999-12-30 00:00 UTC))
            .extended_by(Duration::days(14))
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);

        let due = DueDate::new(datetime!(2024-01-01 00:00 UTC))
            .extended_by(Duration::days(14))
            .unwrap();
        assert_eq!(due.as_ref(), &datetime!(2024-01-15 00:00 UTC));
    }
}
