//! Summary command - dashboard cards, category breakdown, monthly trend

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wealthtrack_core::services::aggregation::format_amount;
use wealthtrack_core::LoggingService;

use super::{get_context, require_user};
use crate::output;

const BAR_WIDTH: usize = 30;

/// Proportional text bar
fn bar(amount: Decimal, max: Decimal) -> String {
    if max <= Decimal::ZERO {
        return String::new();
    }
    let width = (amount / max * Decimal::from(BAR_WIDTH))
        .round()
        .to_usize()
        .unwrap_or(0);
    "█".repeat(width)
}

pub async fn run(logger: &Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger).await?;
    require_user(&ctx)?;
    ctx.store.fetch_all().await?;

    let views = ctx.views(Local::now().date_naive());
    let breakdown = views.category_breakdown();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "summary": views.summary,
                "category_totals": views.category_totals,
                "category_breakdown": breakdown,
                "monthly_trend": views.monthly_trend,
            }))?
        );
        return Ok(());
    }

    let summary = &views.summary;
    println!("{}", "Dashboard".bold());
    println!("  Total Expenses:       {}", summary.expense_count);
    println!("  This Month:           {}", format_amount(summary.month_total).bold());
    println!(
        "  Average per Expense:  {}",
        format_amount(summary.average_per_expense)
    );
    println!();

    println!("{}", "Expenses by Category".bold());
    if breakdown.is_empty() {
        println!("  No expense data available");
    } else {
        let max = breakdown.iter().map(|s| s.amount).max().unwrap_or_default();
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Amount", "Share", ""]);
        for share in &breakdown {
            table.add_row(vec![
                share.category.to_string(),
                format_amount(share.amount),
                format!("{}%", share.percent),
                bar(share.amount, max).cyan().to_string(),
            ]);
        }
        println!("{}", table);
    }
    println!();

    println!("{}", "Monthly Trend".bold());
    if views.monthly_trend.is_empty() {
        println!("  No expense data available");
    } else {
        let max = views
            .monthly_trend
            .iter()
            .map(|m| m.amount)
            .max()
            .unwrap_or_default();
        let mut table = output::create_table();
        table.set_header(vec!["Month", "Amount", "Count", ""]);
        for month in &views.monthly_trend {
            table.add_row(vec![
                month.label.clone(),
                format_amount(month.amount),
                month.count.to_string(),
                bar(month.amount, max).blue().to_string(),
            ]);
        }
        println!("{}", table);
    }

    Ok(())
}
