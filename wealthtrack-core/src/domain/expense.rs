//! Expense domain model

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Spending category
///
/// The known set is what the expense form offers. Labels outside the set are
/// kept as `Custom` so rows written by other clients still load; whether a
/// custom label is accepted for new expenses is decided by the intake layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    FoodAndDining,
    Transportation,
    Shopping,
    Entertainment,
    BillsAndUtilities,
    Healthcare,
    Travel,
    Education,
    Other,
    Custom(String),
}

impl Category {
    /// The known categories, in form order
    pub const KNOWN: [Category; 9] = [
        Category::FoodAndDining,
        Category::Transportation,
        Category::Shopping,
        Category::Entertainment,
        Category::BillsAndUtilities,
        Category::Healthcare,
        Category::Travel,
        Category::Education,
        Category::Other,
    ];

    /// Display label, which is also the stored value
    pub fn label(&self) -> &str {
        match self {
            Category::FoodAndDining => "Food & Dining",
            Category::Transportation => "Transportation",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::BillsAndUtilities => "Bills & Utilities",
            Category::Healthcare => "Healthcare",
            Category::Travel => "Travel",
            Category::Education => "Education",
            Category::Other => "Other",
            Category::Custom(label) => label,
        }
    }

    /// Parse a label. Known labels match case-insensitively; anything else
    /// becomes `Custom` with surrounding whitespace trimmed.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        Self::KNOWN
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed))
            .cloned()
            .unwrap_or_else(|| Category::Custom(trimmed.to_string()))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Custom(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Category::from_label(&label))
    }
}

/// A single recorded spending event owned by a user
///
/// Field names match the columns of the hosted `expenses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Build a stored record from a creation payload.
    ///
    /// Backends call this when they assign the id and timestamps.
    pub fn from_insert(id: impl Into<String>, insert: ExpenseInsert, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_id: insert.user_id,
            title: insert.expense.title,
            amount: insert.expense.amount,
            category: insert.expense.category,
            description: insert.expense.description,
            date: insert.expense.date,
            created_at: now,
            updated_at: now,
        }
    }

    /// (year, month) of the expense date
    pub fn month_key(&self) -> (i32, u32) {
        (self.date.year(), self.date.month())
    }
}

/// Validated creation payload for an expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// Row sent to the backend: the payload plus the owner stamped at insert time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseInsert {
    #[serde(flatten)]
    pub expense: NewExpense,
    pub user_id: String,
}

/// Deserialize an amount that can be a JSON number or a numeric string.
///
/// The table column is `numeric`, which the REST layer returns as a number,
/// while rust_decimal serializes as a string.
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        JsonValue::String(s) => s
            .parse::<Decimal>()
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}
