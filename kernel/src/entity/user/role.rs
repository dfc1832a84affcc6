use std::fmt::{Display, Formatter};
use std::str::FromStr;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::KernelError;

const ADMIN: &str = "admin";
const STUDENT: &str = "student";

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ADMIN,
            UserRole::Student => STUDENT,
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Report<KernelError>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ADMIN => Ok(UserRole::Admin),
            STUDENT => Ok(UserRole::Student),
            _ => Err(Report::new(KernelError::InvalidInput)
                .attach_printable(format!("Unknown user role: {s}"))),
        }
    }
}
