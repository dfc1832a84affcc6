use error_stack::Report;

use crate::entity::OverflowPolicy;
use crate::KernelError;

/// Copies owned (`stock`) and copies currently loanable (`available`).
///
/// A value of this type always satisfies `0 <= available <= stock`: every
/// constructor and every adjustment re-checks it.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct BookInventory {
    stock: i32,
    available: i32,
}

/// Result of returning a copy to the shelf.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Restock {
    Restored,
    /// `available` already equalled `stock`; the count was left as is.
    Clamped,
}

impl BookInventory {
    pub fn new(
        stock: impl Into<i32>,
        available: impl Into<i32>,
    ) -> error_stack::Result<Self, KernelError> {
        let stock = stock.into();
        let available = available.into();
        if stock < 0 {
            return Err(Report::new(KernelError::InvalidInput)
                .attach_printable(format!("stock must not be negative, got {stock}")));
        }
        if available < 0 || available > stock {
            return Err(Report::new(KernelError::InvalidInput).attach_printable(format!(
                "available must be between 0 and {stock}, got {available}"
            )));
        }
        Ok(Self { stock, available })
    }

    pub fn fully_available(stock: impl Into<i32>) -> error_stack::Result<Self, KernelError> {
        let stock = stock.into();
        Self::new(stock, stock)
    }

    pub fn stock(&self) -> i32 {
        self.stock
    }

    pub fn available(&self) -> i32 {
        self.available
    }

    pub fn is_available(&self) -> bool {
        self.available > 0
    }

    pub fn checkout(&self) -> error_stack::Result<Self, KernelError> {
        if !self.is_available() {
            return Err(Report::new(KernelError::Unavailable)
                .attach_printable(format!("all {} copies are on loan", self.stock)));
        }
        Ok(Self {
            available: self.available - 1,
            ..*self
        })
    }

    pub fn check_in(
        &self,
        policy: &OverflowPolicy,
    ) -> error_stack::Result<(Self, Restock), KernelError> {
        if self.available < self.stock {
            return Ok((
                Self {
                    available: self.available + 1,
                    ..*self
                },
                Restock::Restored,
            ));
        }
        match policy {
            OverflowPolicy::Clamp => Ok((*self, Restock::Clamped)),
            OverflowPolicy::Reject => Err(Report::new(KernelError::InventoryOverflow)
                .attach_printable(format!("available is already at stock ({})", self.stock))),
        }
    }
}
