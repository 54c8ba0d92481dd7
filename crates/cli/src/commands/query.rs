//! `query` command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use store::{NewReading, Page, ReadingFilter, SqliteStore, StoredReading};
use tracing::info;

use crate::cli::{PageArgs, QueryAction, QueryArgs, RowArgs, SummaryArgs};

/// Execute the `query` command
pub async fn run_query(args: &QueryArgs) -> Result<()> {
    if !args.database.exists() {
        anyhow::bail!("Database not found: {}", args.database.display());
    }
    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("Failed to open database {}", args.database.display()))?;

    info!(database = %args.database.display(), action = ?args.action, "Running query");

    match &args.action {
        QueryAction::List { sensor_id, page } => {
            let filter = ReadingFilter {
                sensor_id: *sensor_id,
                ..Default::default()
            };
            let rows = store.list(filter, page_from(page)?).await?;
            print_rows(&rows, args.json)
        }
        QueryAction::Summary { filter, page } => {
            let rows = store.list(filter_from(None, filter), page_from(page)?).await?;
            print_rows(&rows, args.json)
        }
        QueryAction::Count { sensor_id, filter } => {
            let count = store.count(filter_from(*sensor_id, filter)).await?;
            if args.json {
                print_json(&serde_json::json!({ "count": count }))
            } else {
                println!("{count}");
                Ok(())
            }
        }
        QueryAction::Get { id } => {
            let row = store.get(*id).await?;
            print_row(&row, args.json)
        }
        QueryAction::Create { row } => {
            let created = store.create(new_reading(row)).await?;
            info!(id = created.id, "Reading created");
            print_row(&created, args.json)
        }
        QueryAction::Update { id, row } => {
            let updated = store.update(*id, new_reading(row)).await?;
            info!(id = updated.id, "Reading updated");
            print_row(&updated, args.json)
        }
        QueryAction::Delete { id } => {
            let deleted = store.delete(*id).await?;
            info!(id = deleted.id, "Reading deleted");
            print_row(&deleted, args.json)
        }
    }
}

fn page_from(args: &PageArgs) -> Result<Page> {
    Ok(Page::new(args.skip, args.limit)?)
}

fn filter_from(sensor_id: Option<i64>, args: &SummaryArgs) -> ReadingFilter {
    ReadingFilter {
        sensor_id,
        sensor_type: args.sensor_type.clone(),
        unit: args.unit.clone(),
        start_time: args.start_time,
        end_time: args.end_time,
    }
}

fn new_reading(args: &RowArgs) -> NewReading {
    NewReading {
        sensor_id: args.sensor_id,
        timestamp: args.timestamp.unwrap_or_else(Utc::now),
        value: args.value,
        lat: args.lat,
        lng: args.lng,
        unit: args.unit.clone(),
        sensor_type: args.sensor_type.clone(),
        description: args.description.clone(),
    }
}

fn print_rows(rows: &[StoredReading], json: bool) -> Result<()> {
    if json {
        return print_json(&rows);
    }
    for row in rows {
        print_line(row);
    }
    Ok(())
}

fn print_row(row: &StoredReading, json: bool) -> Result<()> {
    if json {
        return print_json(row);
    }
    print_line(row);
    Ok(())
}

fn print_line(row: &StoredReading) {
    println!(
        "{:>6}  sensor={:<4} {}  {} {}  ({}, {:.4}, {:.4})",
        row.id,
        row.sensor_id,
        row.timestamp.to_rfc3339(),
        row.value,
        row.unit,
        row.sensor_type,
        row.lat,
        row.lng
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize query result")?;
    println!("{json}");
    Ok(())
}
