//! Expense commands - list, add, remove, categories

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};
use rust_decimal::Decimal;
use wealthtrack_core::config::Config;
use wealthtrack_core::services::aggregation::format_amount;
use wealthtrack_core::services::{AcceptedCategories, ExpenseDraft};
use wealthtrack_core::{Expense, LoggingService, OperationResult};

use super::{get_context, get_data_dir, require_user};
use crate::output;

pub async fn list(logger: &Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger).await?;
    require_user(&ctx)?;
    ctx.store.fetch_all().await?;
    let expenses = ctx.store.expenses();

    if json {
        println!("{}", serde_json::to_string_pretty(expenses.as_slice())?);
        return Ok(());
    }

    if expenses.is_empty() {
        println!("No expenses yet. Add your first expense with 'wt add'.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Title", "Category", "Amount", "Description", "ID"]);
    for expense in expenses.iter() {
        table.add_row(vec![
            expense.date.format("%Y-%m-%d").to_string(),
            expense.title.clone(),
            expense.category.to_string(),
            format_amount(expense.amount),
            expense.description.clone().unwrap_or_default(),
            expense.id.clone(),
        ]);
    }
    println!("{}", table);

    let total: Decimal = expenses.iter().map(|e| e.amount).sum();
    println!(
        "{} expenses, {} total",
        expenses.len(),
        format_amount(total).bold()
    );
    Ok(())
}

#[derive(Debug, Default)]
pub struct AddArgs {
    pub title: Option<String>,
    pub amount: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub json: bool,
}

pub async fn add(logger: &Option<Arc<LoggingService>>, args: AddArgs) -> Result<()> {
    let ctx = get_context(logger).await?;
    require_user(&ctx)?;
    let mut form = ctx.form();
    let interactive = !args.json;

    let title = match args.title {
        Some(title) => title,
        None if interactive => Input::<String>::new()
            .with_prompt("Title")
            .allow_empty(true)
            .interact_text()?,
        None => String::new(),
    };
    let amount = match args.amount {
        Some(amount) => amount,
        None if interactive => Input::<String>::new()
            .with_prompt("Amount")
            .allow_empty(true)
            .interact_text()?,
        None => String::new(),
    };
    let category = match args.category {
        Some(category) => category,
        None if interactive => {
            let labels: Vec<String> = form.accepted().iter().map(|c| c.to_string()).collect();
            let index = Select::new()
                .with_prompt("Category")
                .items(&labels)
                .default(0)
                .interact()?;
            labels[index].clone()
        }
        None => String::new(),
    };

    form.draft = ExpenseDraft {
        title,
        amount,
        category,
        description: args.description.unwrap_or_default(),
        date: args.date.unwrap_or_default(),
    };

    let result = form.submit(&ctx.store).await;

    if args.json {
        let result: OperationResult<Expense> = result.into();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let stored = result?;
    output::success(&format!(
        "Added {} ({}) on {}",
        stored.title,
        format_amount(stored.amount),
        stored.date
    ));
    Ok(())
}

pub async fn remove(logger: &Option<Arc<LoggingService>>, id: &str, force: bool) -> Result<()> {
    let ctx = get_context(logger).await?;
    require_user(&ctx)?;
    ctx.store.fetch_all().await?;

    let existing = ctx.store.expenses().iter().find(|e| e.id == id).cloned();
    let Some(expense) = existing else {
        output::warning(&format!("No expense with id {}", id));
        return Ok(());
    };

    if !force {
        let prompt = format!(
            "Delete '{}' ({}, {})?",
            expense.title,
            format_amount(expense.amount),
            expense.date
        );
        if !Confirm::new().with_prompt(prompt).default(false).interact()? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    ctx.store.remove(id).await?;
    output::success(&format!("Deleted '{}'", expense.title));
    Ok(())
}

/// Accepted categories; needs only the settings, not a backend
pub fn categories() -> Result<()> {
    let config = Config::load(&get_data_dir()?)?;
    for category in AcceptedCategories::with_extras(&config.extra_categories).iter() {
        if category.is_known() {
            println!("{}", category);
        } else {
            println!("{} {}", category, "(custom)".dimmed());
        }
    }
    Ok(())
}
