use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    NewLoan,
    ReturnedLoan,
    OverdueLoan,
    RejectedLoan,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewLoan => "newLoan",
            NotificationKind::ReturnedLoan => "returnedLoan",
            NotificationKind::OverdueLoan => "overdueLoan",
            NotificationKind::RejectedLoan => "rejectedLoan",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
