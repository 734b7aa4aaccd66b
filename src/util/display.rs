/// Terminal rendering of a screening run

use colored::Colorize;

use crate::core::types::{ReportEntry, ScanSummary, ScreenReport};

const RULE_WIDTH: usize = 70;

/// Abbreviates large quote volumes, e.g. `12.34M`
pub fn format_volume(volume: f64) -> String {
    let abs = volume.abs();
    if abs >= 1_000_000_000.0 {
        format!("{:.2}B", volume / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.2}K", volume / 1_000.0)
    } else {
        format!("{:.2}", volume)
    }
}

pub fn format_ratio(volume_ratio: f64) -> String {
    format!("{:.2}x", volume_ratio)
}

pub fn format_change(price_change_pct: f64) -> String {
    format!("{:+.2}%", price_change_pct)
}

/// One uncolored table row
pub fn format_report_row(rank: usize, entry: &ReportEntry) -> String {
    let (price, volume) = match &entry.ticker {
        Some(ticker) => (format!("{}", ticker.price), format_volume(ticker.quote_volume)),
        None => ("-".to_string(), "-".to_string()),
    };

    format!(
        "{:>3}  {:<16} {:>10} {:>10} {:>16} {:>12}",
        rank,
        entry.result.symbol,
        format_ratio(entry.result.volume_ratio),
        format_change(entry.result.price_change_pct),
        price,
        volume
    )
}

fn print_header() {
    println!(
        "{}",
        format!(
            "{:>3}  {:<16} {:>10} {:>10} {:>16} {:>12}",
            "#", "SYMBOL", "VOL RATIO", "CHANGE", "PRICE", "24H VOLUME"
        )
        .bold()
    );
    println!("{}", "-".repeat(RULE_WIDTH));
}

fn print_summary(summary: &ScanSummary) {
    println!("{}", "-".repeat(RULE_WIDTH));
    println!(
        "   Exchange: {}   Watchlist: {}   Scored: {}   Degraded: {}",
        summary.exchange.bold(),
        summary.watchlist_len,
        summary.scored,
        if summary.degraded > 0 {
            summary.degraded.to_string().yellow()
        } else {
            summary.degraded.to_string().normal()
        }
    );
    println!(
        "   Metadata entries: {}   Tradable pairs: {}   Took: {:.1}s",
        summary.metadata_entries,
        summary.tradable_pairs,
        summary.duration_ms as f64 / 1000.0
    );
}

pub fn print_report(report: &ScreenReport) {
    println!("\n{} {}", "📊", "VOLUME SPIKE CANDIDATES".bold());
    println!("   Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("{}", "=".repeat(RULE_WIDTH));

    if report.entries.is_empty() {
        println!("   {}", "No candidates found matching the criteria".dimmed());
    } else {
        print_header();
        for (i, entry) in report.entries.iter().enumerate() {
            let row = format_report_row(i + 1, entry);
            if i == 0 {
                println!("{}", row.green().bold());
            } else {
                println!("{}", row.green());
            }
        }
    }

    print_summary(&report.summary);
    println!("{}", "=".repeat(RULE_WIDTH));
}
