//! Form intake - validation and staging of new expenses
//!
//! Input arrives as text, exactly as typed. Validation happens before any
//! network call; only a valid draft reaches the expense store.

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, RequiredField, Result, ValidationError};
use crate::domain::{Category, Expense, NewExpense};
use crate::services::expense_store::ExpenseStore;

/// Raw form values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: String,
    pub category: String,
    pub description: String,
    /// "YYYY-MM-DD"; empty means today
    pub date: String,
}

/// Categories a new expense may use: the known set plus configured extras
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedCategories {
    categories: Vec<Category>,
}

impl Default for AcceptedCategories {
    fn default() -> Self {
        Self {
            categories: Category::KNOWN.to_vec(),
        }
    }
}

impl AcceptedCategories {
    pub fn with_extras<S: AsRef<str>>(extras: &[S]) -> Self {
        let mut accepted = Self::default();
        for extra in extras {
            let category = Category::from_label(extra.as_ref());
            if !category.label().is_empty() && !accepted.categories.contains(&category) {
                accepted.categories.push(category);
            }
        }
        accepted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Resolve a typed label to an accepted category
    pub fn resolve(&self, label: &str) -> Option<Category> {
        let label = label.trim();
        self.categories
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
            .cloned()
    }
}

/// Validate a draft against the accepted categories.
///
/// Every problem is collected, so one error reports all of them.
pub fn validate(
    draft: &ExpenseDraft,
    accepted: &AcceptedCategories,
    today: NaiveDate,
) -> std::result::Result<NewExpense, ValidationError> {
    let mut error = ValidationError::default();

    let title = draft.title.trim();
    if title.is_empty() {
        error.missing.push(RequiredField::Title);
    }

    let amount_text = draft.amount.trim();
    let amount = if amount_text.is_empty() {
        error.missing.push(RequiredField::Amount);
        None
    } else {
        match Decimal::from_str(amount_text) {
            Ok(amount) if amount.is_sign_negative() && !amount.is_zero() => {
                error.problems.push("Amount cannot be negative".to_string());
                None
            }
            Ok(amount) => Some(amount),
            Err(_) => {
                error
                    .problems
                    .push(format!("Amount '{}' is not a number", amount_text));
                None
            }
        }
    };

    let category_text = draft.category.trim();
    let category = if category_text.is_empty() {
        error.missing.push(RequiredField::Category);
        None
    } else {
        let resolved = accepted.resolve(category_text);
        if resolved.is_none() {
            error
                .problems
                .push(format!("Unknown category '{}'", category_text));
        }
        resolved
    };

    let date_text = draft.date.trim();
    let date = if date_text.is_empty() {
        Some(today)
    } else {
        match NaiveDate::parse_from_str(date_text, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                error
                    .problems
                    .push(format!("Date '{}' must be YYYY-MM-DD", date_text));
                None
            }
        }
    };

    match (amount, category, date) {
        (Some(amount), Some(category), Some(date)) if error.is_empty() => {
            let description = draft.description.trim();
            Ok(NewExpense {
                title: title.to_string(),
                amount,
                category,
                description: (!description.is_empty()).then(|| description.to_string()),
                date,
            })
        }
        _ => Err(error),
    }
}

/// Stateful form: holds the draft between edits and the surfaced error
#[derive(Debug, Clone, Default)]
pub struct FormIntake {
    pub draft: ExpenseDraft,
    error: Option<String>,
    accepted: AcceptedCategories,
}

impl FormIntake {
    pub fn new(accepted: AcceptedCategories) -> Self {
        Self {
            draft: ExpenseDraft::default(),
            error: None,
            accepted,
        }
    }

    /// Message of the last failed submit
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn accepted(&self) -> &AcceptedCategories {
        &self.accepted
    }

    pub fn validate(&self) -> Result<NewExpense> {
        validate(&self.draft, &self.accepted, Local::now().date_naive()).map_err(Error::from)
    }

    /// Validate and hand the draft to the store. Success resets the form;
    /// any failure keeps the typed values and surfaces the message.
    pub async fn submit(&mut self, store: &ExpenseStore) -> Result<Expense> {
        let result = match self.validate() {
            Ok(expense) => store.add(expense).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(stored) => {
                self.cancel();
                Ok(stored)
            }
            Err(e) => {
                self.error = Some(e.message());
                Err(e)
            }
        }
    }

    /// Back to blank defaults
    pub fn cancel(&mut self) {
        self.draft = ExpenseDraft::default();
        self.error = None;
    }
}
