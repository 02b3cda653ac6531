//! Reporting stream state and sync results.

use console::style;

use crate::error::Result;
use crate::fs::tree::StreamHandle;
use crate::stream::engine::{Advance, Reconciliation};
use crate::stream::info::StreamRecord;
use crate::stream::item::{format_date, Cursor, Item};
use crate::stream::queue::QueueEntry;
use crate::sync::report::{StreamStatus, SyncReport};

/// One-line description of an item.
pub fn describe_item(item: &Item) -> String {
    let mut line = format!("{} {}", format_date(item.date), item.name);
    if let Some(progress) = item.progress.as_deref().filter(|p| !p.is_empty()) {
        line.push_str(&format!(" [{}]", progress));
    }
    line
}

/// One-line description of a cursor.
pub fn describe_cursor(cursor: &Cursor) -> String {
    match cursor {
        Cursor::NotStarted => "not started".to_string(),
        Cursor::At(item) => describe_item(item),
        Cursor::Exhausted(mark) => match mark.date {
            Some(date) => format!("caught up (last: {} {})", format_date(date), mark.name),
            None if mark.name.is_empty() => "caught up".to_string(),
            None => format!("caught up (last: {})", mark.name),
        },
    }
}

/// Print one row of the stream listing.
pub fn print_stream_row(name: &str, record: &Result<StreamRecord>, next_up: bool) {
    let marker = if next_up {
        style("*").green().bold().to_string()
    } else {
        " ".to_string()
    };

    match record {
        Ok(record) => println!(
            "  {} {:<24} {:<10} {}",
            marker,
            name,
            style(record.kind()).dim(),
            describe_cursor(record.cursor())
        ),
        Err(e) => println!("  {} {:<24} {}", marker, name, style(e).red()),
    }
}

/// Print everything known about a stream.
pub fn print_stream_details(stream: &StreamHandle, record: &StreamRecord, pending: &[QueueEntry]) {
    println!();
    println!(
        "{}",
        style(format!("{}/{}", stream.category, stream.name)).bold()
    );
    println!("  Type:     {}", record.kind());
    println!("  Feed:     {}", record.feed_url().unwrap_or("-"));
    println!("  Current:  {}", describe_cursor(record.cursor()));
    if let Some(item) = record.cursor().current() {
        println!("  Locator:  {}", item.locator.as_str());
    }
    println!("  Pending:  {}", pending.len());
}

/// Print the items after the current one.
pub fn print_pending(pending: &[QueueEntry]) {
    if pending.is_empty() {
        println!("  (nothing pending)");
        return;
    }
    for (index, entry) in pending.iter().enumerate() {
        println!(
            "  {:>4}. {} {}",
            index + 1,
            format_date(entry.date),
            entry.name
        );
    }
}

/// Print the result of completing an item.
pub fn print_advance(advance: &Advance) {
    if let Some(previous) = &advance.previous {
        println!("  Completed: {}", describe_item(previous));
    }
    match &advance.current {
        Some(current) => println!("  Now:       {}", style(describe_item(current)).green()),
        None => println!("  Now:       {}", style("caught up").dim()),
    }
}

/// Print the result of reconciling a stream.
pub fn print_reconciliation(name: &str, reconciliation: &Reconciliation) {
    match reconciliation {
        Reconciliation::InSync => println!("  {:<24} {}", name, style("in sync").dim()),
        Reconciliation::CurrentMissing { missing, current } => println!(
            "  {:<24} {} missing, now {}",
            name,
            style(describe_item(missing)).yellow(),
            current
                .as_ref()
                .map(describe_item)
                .unwrap_or_else(|| "caught up".to_string())
        ),
        Reconciliation::Resumed { current } => println!(
            "  {:<24} resumed at {}",
            name,
            style(describe_item(current)).green()
        ),
    }
}

/// Print per-stream results and totals of a sync pass.
pub fn print_sync_report(report: &SyncReport) {
    println!();
    for outcome in &report.outcomes {
        let label = format!("{}/{}", outcome.category, outcome.stream);
        match &outcome.status {
            StreamStatus::Merged(merge) => {
                println!(
                    "  {:<32} {} new{}",
                    label,
                    style(merge.added).green(),
                    if merge.discarded > 0 {
                        format!(", {} over limit", merge.discarded)
                    } else {
                        String::new()
                    }
                );
                for anomaly in &merge.anomalies {
                    println!("    {} {}", style("!").yellow(), anomaly);
                }
                for failure in &merge.failures {
                    println!("    {} {}", style("x").red(), failure);
                }
            }
            StreamStatus::NoFeed => {}
            StreamStatus::Failed(e) => println!("  {:<32} {}", label, style(e).red()),
        }
    }

    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Sync Statistics:").bold());
    println!("  Streams synced:  {}", report.streams_synced);
    println!("  Without feed:    {}", report.streams_skipped);
    if report.streams_failed > 0 {
        println!("  Streams failed:  {}", style(report.streams_failed).red());
    }
    println!("  Items added:     {}", report.items_added);
    if report.items_discarded > 0 {
        println!("  Over limit:      {}", report.items_discarded);
    }
    if report.download_failures > 0 {
        println!("  Failed downloads: {}", style(report.download_failures).red());
    }
    if report.anomalies > 0 {
        println!("  Anomalies:       {}", style(report.anomalies).yellow());
    }
    if report.streams_resumed > 0 {
        println!("  Streams resumed: {}", report.streams_resumed);
    }
    println!("{}", style("═".repeat(50)).dim());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::item::{parse_date, Locator, Mark};

    #[test]
    fn test_describe_cursor() {
        let mut item = Item::new(
            parse_date("2021-03-01").unwrap(),
            "Pilot",
            Locator::Url("https://e".into()),
        );
        assert_eq!(describe_cursor(&Cursor::NotStarted), "not started");
        assert_eq!(describe_cursor(&Cursor::At(item.clone())), "2021-03-01 Pilot");

        item.progress = Some("12:30".into());
        assert_eq!(describe_item(&item), "2021-03-01 Pilot [12:30]");

        let mark = Mark {
            date: None,
            name: "Old book".into(),
            locator: String::new(),
        };
        assert_eq!(
            describe_cursor(&Cursor::Exhausted(mark)),
            "caught up (last: Old book)"
        );
    }
}
