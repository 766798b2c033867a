use chrono::Datelike;
use sales_performance_reports::report::format::format_number;
use sales_performance_reports::*;
use std::error::Error;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    println!("📊 Sales Performance Report Demo\n");

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: sales_report_demo <workbook.xlsx> [config.json]")?;
    let config = match std::env::args().nth(2) {
        Some(config_path) => ReportConfig::from_json_file(config_path)?,
        None => ReportConfig::default(),
    };

    let bytes = std::fs::read(&path)?;
    let outcome = load_workbook_or_empty(&bytes, &config);
    if let Some(err) = &outcome.error {
        println!("❌ Could not load {}: {}", path, err);
        return Ok(());
    }
    let workbook = outcome.workbook;

    println!(
        "📋 Loaded {} transactions, {} targets, {} YTD rows ({} unreadable dates)",
        workbook.transactions.len(),
        workbook.targets.len(),
        workbook.ytd.len(),
        workbook.invalid_dates
    );

    let Some(span) = workbook.date_span() else {
        println!("⚠️  No dated transactions, nothing to report");
        return Ok(());
    };

    // Report on the month of the latest transaction.
    let as_of = span.end();
    let month = month_range(as_of)?;
    let tracking = build_tracking_report(&workbook, &config, month, as_of)?;

    println!("\n📅 Period: {} (as of {})", month, as_of);
    for tile in tracking.kpis.tiles(config.kpi_tile_limit) {
        println!("  {:<20} {:>14}", tile.label, tile.value);
    }

    println!("\n💡 Findings:");
    for finding in &tracking.insights {
        println!("  - {}", finding);
    }

    match year_over_year(&workbook.transactions, &[GroupDimension::Branch], month) {
        Ok(comparison) => {
            println!("\n🔁 Year over year by branch:");
            for row in &comparison.rows {
                println!(
                    "  {:<20} {:>14} -> {:>14}",
                    row.label(),
                    format_number(row.period1_total),
                    format_number(row.period2_total)
                );
            }
        }
        Err(e) => println!("⚠️  Year over year skipped: {}", e),
    }

    let total_target = workbook.targets.series(TargetKind::Ka).total();
    let allocation = allocate_from_tables(
        &workbook.transactions,
        &workbook.ytd,
        GroupDimension::Salesman,
        total_target,
        3,
        as_of,
    );

    let daily = sum_by_date(&filter_by_range(&workbook.transactions, &month));
    let trend = fit_daily(&daily);

    let mut tables = tracking.tables();
    match &allocation {
        Ok(table) => tables.push(ReportTable::from(table)),
        Err(e) => println!("⚠️  Allocation skipped: {}", e),
    }
    match &trend {
        Ok(line) => {
            println!("\n📈 Daily trend slope: {:.2} per selling day", line.slope);
            tables.push(ReportTable::from_trend("Daily Trend", &daily, line));
        }
        Err(e) => println!("ℹ️  Trend skipped: {}", e),
    }

    let stem = format!("sales_report_{}_{:02}", as_of.year(), as_of.month());
    let xlsx = report::write_workbook(&tables)?;
    std::fs::write(format!("{}.xlsx", stem), &xlsx)?;

    let deck = tracking.export_deck(&config, &[])?;
    std::fs::write(format!("{}.pptx", stem), &deck.bytes)?;

    println!(
        "\n✅ Wrote {}.xlsx ({} sheets) and {}.pptx ({} slides)",
        stem,
        tables.len(),
        stem,
        deck.slide_count
    );

    Ok(())
}
