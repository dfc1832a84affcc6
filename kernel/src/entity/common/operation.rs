use error_stack::Report;
use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

use crate::KernelError;

fn non_negative(name: &str, value: i64) -> error_stack::Result<i64, KernelError> {
    if value < 0 {
        return Err(Report::new(KernelError::InvalidInput)
            .attach_printable(format!("{name} must not be negative, got {value}")));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Fromln, AsRefln, Serialize, Deserialize)]
pub struct SelectLimit(i64);

impl SelectLimit {
    pub fn new(value: impl Into<i64>) -> Self {
        SelectLimit(value.into())
    }

    pub fn try_new(value: i64) -> error_stack::Result<Self, KernelError> {
        non_negative("limit", value).map(SelectLimit)
    }
}

impl Default for SelectLimit {
    fn default() -> Self {
        Self::new(30)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Fromln, AsRefln, Serialize, Deserialize)]
pub struct SelectOffset(i64);

impl SelectOffset {
    pub fn new(value: impl Into<i64>) -> Self {
        SelectOffset(value.into())
    }

    pub fn try_new(value: i64) -> error_stack::Result<Self, KernelError> {
        non_negative("offset", value).map(SelectOffset)
    }
}
