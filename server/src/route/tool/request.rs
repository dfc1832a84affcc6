use crate::controller::TryIntake;
use application::transfer::{LoanByNamesDto, RenewLoanDto};
use error_stack::Report;
use kernel::KernelError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamesArguments {
    user_name: String,
    book_title: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RenewArguments {
    user_name: String,
    book_title: String,
    #[serde(default)]
    new_due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
enum ToolCall {
    BorrowBook(NamesArguments),
    ReturnBook(NamesArguments),
    RenewLoan(RenewArguments),
}

pub enum ToolCommand {
    Borrow(LoanByNamesDto),
    Return(LoanByNamesDto),
    Renew(RenewLoanDto),
}

impl ToolCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCommand::Borrow(_) => "borrow_book",
            ToolCommand::Return(_) => "return_book",
            ToolCommand::Renew(_) => "renew_loan",
        }
    }
}

fn non_blank(field: &str, value: String) -> error_stack::Result<String, KernelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Report::new(KernelError::InvalidInput)
            .attach_printable(format!("argument {field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

pub struct Transformer;

impl TryIntake<Value> for Transformer {
    type To = ToolCommand;
    type Error = Report<KernelError>;
    fn emit(&self, input: Value) -> Result<Self::To, Self::Error> {
        let call: ToolCall = serde_json::from_value(input).map_err(|e| {
            Report::new(KernelError::InvalidInput).attach_printable(format!("invalid tool call: {e}"))
        })?;
        Ok(match call {
            ToolCall::BorrowBook(args) => ToolCommand::Borrow(LoanByNamesDto {
                user_name: non_blank("user_name", args.user_name)?,
                book_title: non_blank("book_title", args.book_title)?,
            }),
            ToolCall::ReturnBook(args) => ToolCommand::Return(LoanByNamesDto {
                user_name: non_blank("user_name", args.user_name)?,
                book_title: non_blank("book_title", args.book_title)?,
            }),
            ToolCall::RenewLoan(args) => ToolCommand::Renew(RenewLoanDto {
                user_name: non_blank("user_name", args.user_name)?,
                book_title: non_blank("book_title", args.book_title)?,
                new_due_date: args.new_due_date,
            }),
        })
    }
}
