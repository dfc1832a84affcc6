use std::fmt::Display;

use error_stack::Context;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KernelError {
    NotFound,
    PermissionDenied,
    Unavailable,
    LimitExceeded,
    InvalidTransition,
    InvalidInput,
    AmbiguousMatch,
    InventoryOverflow,
    HasActiveLoans,
    Concurrency,
    Timeout,
    Internal,
}

impl KernelError {
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::NotFound => "not_found",
            KernelError::PermissionDenied => "permission_denied",
            KernelError::Unavailable => "unavailable",
            KernelError::LimitExceeded => "limit_exceeded",
            KernelError::InvalidTransition => "invalid_transition",
            KernelError::InvalidInput => "invalid_input",
            KernelError::AmbiguousMatch => "ambiguous_match",
            KernelError::InventoryOverflow => "inventory_overflow",
            KernelError::HasActiveLoans => "has_active_loans",
            KernelError::Concurrency => "concurrency",
            KernelError::Timeout => "timeout",
            KernelError::Internal => "internal",
        }
    }
}

impl Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::NotFound => write!(f, "Resource not found"),
            KernelError::PermissionDenied => write!(f, "Permission denied"),
            KernelError::Unavailable => write!(f, "No copy is available"),
            KernelError::LimitExceeded => write!(f, "Loan limit exceeded"),
            KernelError::InvalidTransition => write!(f, "Invalid loan status transition"),
            KernelError::InvalidInput => write!(f, "Invalid input"),
            KernelError::AmbiguousMatch => write!(f, "More than one candidate matched"),
            KernelError::InventoryOverflow => write!(f, "Available copies would exceed stock"),
            KernelError::HasActiveLoans => write!(f, "Book still has active loans"),
            KernelError::Concurrency => write!(f, "Concurrency error"),
            KernelError::Timeout => write!(f, "Process timed out"),
            KernelError::Internal => write!(f, "Internal kernel error"),
        }
    }
}

impl Context for KernelError {}
