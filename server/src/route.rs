mod book;
mod library;
mod loan;
mod tool;
mod user;

pub use self::{
    book::BookRouter, library::LibraryRouter, loan::LoanRouter, tool::ToolRouter,
    user::UserRouter,
};
