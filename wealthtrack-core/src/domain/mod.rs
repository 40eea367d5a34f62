//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with no I/O.

mod expense;
mod user;
pub mod result;

pub use expense::{Category, Expense, ExpenseInsert, NewExpense};
pub use user::{Session, SignUpOutcome, User};
