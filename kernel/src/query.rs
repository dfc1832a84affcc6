mod book;
mod library;
mod loan;
mod user;

pub use self::{book::*, library::*, loan::*, user::*};
