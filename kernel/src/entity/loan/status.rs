use std::fmt::{Display, Formatter};
use std::str::FromStr;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::entity::NotificationKind;
use crate::KernelError;

const PENDING: &str = "pending";
const ACTIVE: &str = "active";
const RETURNED: &str = "returned";
const OVERDUE: &str = "overdue";
const REJECTED: &str = "rejected";

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Active,
    Returned,
    Overdue,
    Rejected,
}

/// How a transition moves the book's `available` count.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InventoryEffect {
    Decrement,
    Increment,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Transition {
    inventory: InventoryEffect,
    notification: Option<NotificationKind>,
    stamps_return: bool,
}

impl Transition {
    const fn new(
        inventory: InventoryEffect,
        notification: Option<NotificationKind>,
        stamps_return: bool,
    ) -> Self {
        Self {
            inventory,
            notification,
            stamps_return,
        }
    }

    pub fn inventory(&self) -> InventoryEffect {
        self.inventory
    }

    pub fn notification(&self) -> Option<NotificationKind> {
        self.notification
    }

    pub fn stamps_return(&self) -> bool {
        self.stamps_return
    }
}

const APPROVE: Transition = Transition::new(
    InventoryEffect::Decrement,
    Some(NotificationKind::NewLoan),
    false,
);
const REJECT: Transition = Transition::new(
    InventoryEffect::Unchanged,
    Some(NotificationKind::RejectedLoan),
    false,
);
const RETURN: Transition = Transition::new(
    InventoryEffect::Increment,
    Some(NotificationKind::ReturnedLoan),
    true,
);

impl LoanStatus {
    pub const ALL: [LoanStatus; 5] = [
        LoanStatus::Pending,
        LoanStatus::Active,
        LoanStatus::Returned,
        LoanStatus::Overdue,
        LoanStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => PENDING,
            LoanStatus::Active => ACTIVE,
            LoanStatus::Returned => RETURNED,
            LoanStatus::Overdue => OVERDUE,
            LoanStatus::Rejected => REJECTED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Returned | LoanStatus::Rejected)
    }

    /// Statuses counted against a user's concurrent loan limit.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active)
    }

    /// Statuses in which a physical copy is out of the library.
    pub fn holds_copy(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }

    /// The caller-requested edges. Reclassification to `overdue` is not one of
    /// them; see [`LoanStatus::reclassify_overdue`].
    pub fn transition(&self, to: &LoanStatus) -> error_stack::Result<Transition, KernelError> {
        match (self, to) {
            (LoanStatus::Pending, LoanStatus::Active) => Ok(APPROVE),
            (LoanStatus::Pending, LoanStatus::Rejected) => Ok(REJECT),
            (LoanStatus::Active | LoanStatus::Overdue, LoanStatus::Returned) => Ok(RETURN),
            (from, to) if from == to => Err(Report::new(KernelError::InvalidTransition)
                .attach_printable(format!("loan is already {to}"))),
            (from, to) => Err(Report::new(KernelError::InvalidTransition)
                .attach_printable(format!("{from} -> {to} is not a permitted transition"))),
        }
    }

    /// System-side reclassification of a lapsed loan.
    pub fn reclassify_overdue(&self) -> error_stack::Result<LoanStatus, KernelError> {
        match self {
            LoanStatus::Active => Ok(LoanStatus::Overdue),
            other => Err(Report::new(KernelError::InvalidTransition)
                .attach_printable(format!("{other} loans cannot become overdue"))),
        }
    }
}

impl Display for LoanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = Report<KernelError>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            PENDING => Ok(LoanStatus::Pending),
            ACTIVE => Ok(LoanStatus::Active),
            RETURNED => Ok(LoanStatus::Returned),
            OVERDUE => Ok(LoanStatus::Overdue),
            REJECTED => Ok(LoanStatus::Rejected),
            _ => Err(Report::new(KernelError::InvalidInput)
                .attach_printable(format!("Unknown loan status: {s}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use crate::entity::{InventoryEffect, LoanStatus, NotificationKind};
    use crate::KernelError;

    const ALL: [LoanStatus; 5] = [
        LoanStatus::Pending,
        LoanStatus::Active,
        LoanStatus::Returned,
        LoanStatus::Overdue,
        LoanStatus::Rejected,
    ];

    #[test]
    fn only_four_edges_are_permitted() {
        let permitted = [
            (LoanStatus::Pending, LoanStatus::Active),
            (LoanStatus::Pending, LoanStatus::Rejected),
            (LoanStatus::Active, LoanStatus::Returned),
            (LoanStatus::Overdue, LoanStatus::Returned),
        ];
        for from in ALL {
            for to in ALL {
                let result = from.transition(&to);
                if permitted.contains(&(from, to)) {
                    assert!(result.is_ok(), "{from} -> {to} should be permitted");
                } else {
                    let err = result.expect_err("edge should be rejected");
                    assert_eq!(err.current_context(), &KernelError::InvalidTransition);
                }
            }
        }
    }

    #[test]
    fn same_status_is_never_a_silent_success() {
        for status in ALL {
            assert!(status.transition(&status).is_err());
        }
    }

    #[test]
    fn returned_cannot_go_back_to_active() {
        let err = LoanStatus::Returned
            .transition(&LoanStatus::Active)
            .unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidTransition);
    }

    #[test]
    fn effects_of_each_edge() {
        let approve = LoanStatus::Pending.transition(&LoanStatus::Active).unwrap();
        assert_eq!(approve.inventory(), InventoryEffect::Decrement);

        let reject = LoanStatus::Pending
            .transition(&LoanStatus::Rejected)
            .unwrap();
        assert_eq!(reject.inventory(), InventoryEffect::Unchanged);
        assert_eq!(reject.notification(), Some(NotificationKind::RejectedLoan));

        let ret = LoanStatus::Overdue
            .transition(&LoanStatus::Returned)
            .unwrap();
        assert_eq!(ret.inventory(), InventoryEffect::Increment);
        assert!(ret.stamps_return());
    }

    #[test]
    fn only_active_loans_become_overdue() {
        assert_eq!(
            LoanStatus::Active.reclassify_overdue().unwrap(),
            LoanStatus::Overdue
        );
        for status in [
            LoanStatus::Pending,
            LoanStatus::Returned,
            LoanStatus::Overdue,
            LoanStatus::Rejected,
        ] {
            assert!(status.reclassify_overdue().is_err());
        }
    }

    #[test]
    fn parses_case_insensitively_and_rejects_unknown() {
        assert_eq!(
            LoanStatus::from_str(" Returned ").unwrap(),
            LoanStatus::Returned
        );
        let err = LoanStatus::from_str("lost").unwrap_err();
        assert_eq!(err.current_context(), &KernelError::InvalidInput);
    }
}
