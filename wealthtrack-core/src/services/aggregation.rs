//! Aggregation views - read-only projections of the expense list
//!
//! Everything here is a pure function of a list of expenses. [`LiveViews`]
//! follows a store subscription and rebuilds the projections only when the
//! store's revision moves.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::{Category, Expense};
use crate::services::expense_store::StoreSnapshot;

/// Number of trailing month groups kept by the trend
pub const TREND_MONTHS: usize = 6;

/// Spending for one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// "YYYY-MM"
    pub month: String,
    /// Short display label, e.g. "Jan 2024"
    pub label: String,
    pub amount: Decimal,
    pub count: usize,
}

/// One slice of the category breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: Category,
    pub amount: Decimal,
    /// Whole-number percentage of the grand total
    pub percent: Decimal,
}

/// Header figures of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub expense_count: usize,
    /// Spending dated in the current month
    pub month_total: Decimal,
    pub month_count: usize,
    /// `month_total / expense_count`, zero without expenses
    pub average_per_expense: Decimal,
    /// `month_total / month_count`, zero when the month has no expenses
    pub month_average: Decimal,
}

impl DashboardSummary {
    pub fn compute(expenses: &[Expense], today: NaiveDate) -> Self {
        let this_month = (today.year(), today.month());
        let (month_total, month_count) = expenses
            .iter()
            .filter(|e| e.month_key() == this_month)
            .fold((Decimal::ZERO, 0usize), |(sum, n), e| (sum + e.amount, n + 1));

        let average = |count: usize| {
            if count == 0 {
                Decimal::ZERO
            } else {
                (month_total / Decimal::from(count)).round_dp(2)
            }
        };

        Self {
            expense_count: expenses.len(),
            month_total,
            month_count,
            average_per_expense: average(expenses.len()),
            month_average: average(month_count),
        }
    }
}

/// Sum of amounts per category. Categories without expenses are absent.
pub fn category_totals(expenses: &[Expense]) -> BTreeMap<Category, Decimal> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.clone()).or_insert(Decimal::ZERO) += expense.amount;
    }
    totals
}

/// Category totals as shares of the grand total, largest first
pub fn category_breakdown(totals: &BTreeMap<Category, Decimal>) -> Vec<CategoryShare> {
    let grand_total: Decimal = totals.values().copied().sum();
    let mut shares: Vec<CategoryShare> = totals
        .iter()
        .map(|(category, amount)| CategoryShare {
            category: category.clone(),
            amount: *amount,
            percent: if grand_total.is_zero() {
                Decimal::ZERO
            } else {
                (*amount * Decimal::ONE_HUNDRED / grand_total).round_dp(0)
            },
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.category.cmp(&b.category)));
    shares
}

/// Totals and counts per (year, month), oldest first, trimmed to the last
/// [`TREND_MONTHS`] groups present. Months without expenses are not filled in.
pub fn monthly_trend(expenses: &[Expense]) -> Vec<MonthlyTotal> {
    let mut groups: BTreeMap<(i32, u32), (Decimal, usize)> = BTreeMap::new();
    for expense in expenses {
        let entry = groups.entry(expense.month_key()).or_insert((Decimal::ZERO, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    let skip = groups.len().saturating_sub(TREND_MONTHS);
    groups
        .into_iter()
        .skip(skip)
        .map(|((year, month), (amount, count))| MonthlyTotal {
            month: format!("{:04}-{:02}", year, month),
            label: month_label(year, month),
            amount,
            count,
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{:04}-{:02}", year, month))
}

/// Render an amount as US dollars: `$1,234.50`
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", sign, grouped, cents)
}

/// All projections of one store snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationViews {
    /// Store revision these views were computed from
    pub revision: u64,
    pub category_totals: BTreeMap<Category, Decimal>,
    pub monthly_trend: Vec<MonthlyTotal>,
    pub summary: DashboardSummary,
}

impl AggregationViews {
    pub fn compute(snapshot: &StoreSnapshot, today: NaiveDate) -> Self {
        let expenses = snapshot.expenses.as_slice();
        Self {
            revision: snapshot.revision,
            category_totals: category_totals(expenses),
            monthly_trend: monthly_trend(expenses),
            summary: DashboardSummary::compute(expenses, today),
        }
    }

    pub fn category_breakdown(&self) -> Vec<CategoryShare> {
        category_breakdown(&self.category_totals)
    }
}

/// Views kept in step with an expense store
pub struct LiveViews {
    rx: watch::Receiver<StoreSnapshot>,
    today: NaiveDate,
    views: AggregationViews,
}

impl LiveViews {
    pub fn new(mut rx: watch::Receiver<StoreSnapshot>, today: NaiveDate) -> Self {
        let views = AggregationViews::compute(&rx.borrow_and_update(), today);
        Self { rx, today, views }
    }

    /// Recompute if the store revision changed since the last call.
    /// Returns whether a recomputation happened.
    pub fn refresh(&mut self) -> bool {
        let snapshot = self.rx.borrow_and_update();
        if snapshot.revision == self.views.revision {
            return false;
        }
        self.views = AggregationViews::compute(&snapshot, self.today);
        true
    }

    /// Current views, refreshed first
    pub fn views(&mut self) -> &AggregationViews {
        self.refresh();
        &self.views
    }

    /// Wait for the next list change and return the recomputed views.
    /// Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<&AggregationViews> {
        loop {
            self.rx.changed().await.ok()?;
            if self.refresh() {
                return Some(&self.views);
            }
        }
    }
}
