mod book;
mod common;
mod library;
mod loan;
mod policy;
mod tenant;
mod user;

pub use self::{book::*, common::*, library::*, loan::*, policy::*, tenant::*, user::*};
