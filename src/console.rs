//! Interactive console prompts
//!
//! The operator supplies the reference employee and the group keyword, and
//! confirms the signed-in account before anything is read or written.

use crate::error::AppError;
use dialoguer::console::Term;
use dialoguer::{Confirm, Input};
use std::fmt::Display;
use tracing::error;

/// Ask whether to go on after signing in
pub fn confirm_continue() -> Result<bool, AppError> {
    Confirm::new()
        .with_prompt("Continue with this account?")
        .default(true)
        .interact_on(&Term::stderr())
        .map_err(prompt_failed)
}

/// Show `message` and wait for Enter
pub fn acknowledge(message: &str) -> Result<(), AppError> {
    let term = Term::stderr();
    term.write_line(message)
        .and_then(|_| term.read_line())
        .map(|_| ())
        .map_err(prompt_failed)
}

/// Ask for the employee SID whose mobile inbox is copied
pub fn prompt_employee_sid() -> Result<i64, AppError> {
    Input::<i64>::new()
        .with_prompt(
            "Enter the EmployeeSID of the User that has the Mobile Inbox you want to push out to other users",
        )
        .interact_text()
        .map_err(prompt_failed)
}

/// Ask for the keyword of the group to update
pub fn prompt_group_keyword() -> Result<String, AppError> {
    Input::<String>::new()
        .with_prompt(
            "Enter the Keyword of the Group that has the other users you want to update with the Mobile Inbox from the User above",
        )
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("keyword cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map(|keyword| keyword.trim().to_string())
        .map_err(prompt_failed)
}

/// A prompt that cannot be answered ends the run; record why in the log
fn prompt_failed(e: impl Display) -> AppError {
    let err = AppError::Prompt(e.to_string());
    error!("{}", err);
    err
}
