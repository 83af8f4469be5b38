//! Coin balance and transaction ledger handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use mbsi_core::{CoinTransaction, Portal};

use crate::cli::{CoinsArgs, CoinsCommand, GlobalOpts, MarkReadArgs, OutputFormat, TransactionsArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(portal: &Portal, args: CoinsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CoinsCommand::Balance => handle_balance(portal, global).await,
        CoinsCommand::Transactions(args) => handle_transactions(portal, args, global).await,
        CoinsCommand::MarkRead(args) => handle_mark_read(portal, args, global).await,
    }
}

async fn handle_balance(portal: &Portal, global: &GlobalOpts) -> Result<(), CliError> {
    super::require_session(portal).await?;
    let balance = portal.coin_balance().await?;

    let rendered = output::render_single(
        &global.output,
        &balance,
        |b| format!("Coin balance: {}", b.coin_balance),
        |b| b.coin_balance.to_string(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

#[derive(Serialize, Tabled)]
struct TransactionRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Amount")]
    amount: i64,
    #[tabled(rename = "Read")]
    read: String,
}

fn to_row(tx: &CoinTransaction) -> TransactionRow {
    TransactionRow {
        id: tx.id.clone(),
        date: tx.date.map_or_else(|| "-".into(), format_date),
        description: tx.description.clone().unwrap_or_else(|| "-".into()),
        amount: tx.amount,
        read: if tx.read.unwrap_or(false) { "yes" } else { "no" }.into(),
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

async fn handle_transactions(
    portal: &Portal,
    args: TransactionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    super::require_session(portal).await?;
    let limit = args.limit.unwrap_or_else(default_page_size);
    let page = portal.transactions(args.page, limit).await?;

    let rendered = match global.output {
        OutputFormat::Table => {
            let table = output::render_list(
                &OutputFormat::Table,
                &page.transactions,
                to_row,
                |tx| tx.id.clone(),
            );
            match page.pagination {
                Some(p) if p.total_pages > 1 => {
                    format!("{table}\nPage {} of {}", p.page, p.total_pages)
                }
                _ => table,
            }
        }
        ref format => output::render_list(format, &page.transactions, to_row, |tx| tx.id.clone()),
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

async fn handle_mark_read(
    portal: &Portal,
    args: MarkReadArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    super::require_session(portal).await?;
    let limit = args.limit.unwrap_or_else(default_page_size);
    portal
        .mark_transaction_read(&args.id, args.page, limit)
        .await?;

    output::print_output(&format!("Marked {} as read", args.id), global.quiet);
    Ok(())
}

fn default_page_size() -> u32 {
    mbsi_config::load_config_or_default().defaults.page_size
}
