mod book;
mod ledger;
mod library;
mod loan;
mod user;

pub use self::{book::*, ledger::*, library::*, loan::*, user::*};
