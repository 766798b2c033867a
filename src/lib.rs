//! # Sales Performance Reports
//!
//! A library for turning an uploaded sales workbook (transactions, targets and
//! an optional year-to-date snapshot) into aggregations, period comparisons,
//! target allocations, trend lines and exportable spreadsheet or slide-deck
//! reports.
//!
//! ## Core Concepts
//!
//! - **Transactions**: billed sales rows with salesman, customer, branch and billing code
//! - **Targets**: per-salesman KA and Talabat targets
//! - **Aggregated series**: group key to total, always zero-filled before arithmetic
//! - **Working days**: calendar days excluding one weekday (Friday by default)
//! - **Reports**: `ReportTable`s rendered to xlsx or pptx bytes
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_performance_reports::*;
//! use chrono::NaiveDate;
//!
//! let config = ReportConfig::default();
//! let bytes = std::fs::read("sales.xlsx")?;
//! let workbook = load_workbook(&bytes, &config)?;
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! )?;
//! let as_of = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//!
//! let report = build_tracking_report(&workbook, &config, range, as_of)?;
//! let xlsx = report.export_xlsx()?;
//! let deck = report.export_deck(&config, &[])?;
//! ```

pub mod allocator;
pub mod cache;
pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod ingestion;
pub mod report;
pub mod schema;
pub mod tracking;
pub mod utils;

pub use allocator::{allocate, allocate_from_tables, AllocationRow, AllocationTable};
pub use cache::WorkbookCache;
pub use comparator::{compare, year_over_year, ComparisonReport, ComparisonRow};
pub use config::{BillingCodes, ColumnNames, ReportConfig, SheetNames};
pub use engine::*;
pub use error::{Result, SalesReportError, SchemaError};
pub use forecast::{fit, fit_daily, TrendLine};
pub use ingestion::{load_workbook, load_workbook_or_empty, LoadOutcome};
pub use report::{ChartSource, Deck, DeckBuilder, PngChart, ReportTable};
pub use schema::*;
pub use tracking::{build_performance, insights, KpiTile, Kpis, SalesmanPerformance};
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// The tracking view for one period: per-salesman achievement, headline
/// KPIs, the billing-type pivot and short findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingReport {
    pub range: DateRange,
    pub as_of: NaiveDate,
    pub performance: Vec<SalesmanPerformance>,
    pub kpis: Kpis,
    pub pivot: BillingTypePivot,
    pub insights: Vec<String>,
}

impl TrackingReport {
    pub fn tables(&self) -> Vec<ReportTable> {
        vec![
            ReportTable::from_performance("Salesman Performance", &self.performance),
            ReportTable::from(&self.pivot),
        ]
    }

    pub fn export_xlsx(&self) -> Result<Vec<u8>> {
        report::write_workbook(&self.tables())
    }

    pub fn export_deck(&self, config: &ReportConfig, charts: &[&dyn ChartSource]) -> Result<Deck> {
        let tables = self.tables();
        let mut builder = DeckBuilder::new(config.deck_title.clone())
            .subtitle(self.range.to_string())
            .kpis(self.kpis.tiles(config.kpi_tile_limit));
        for table in &tables {
            builder = builder.table(table);
        }
        for chart in charts {
            builder = builder.chart(*chart);
        }
        builder.build()
    }
}

pub struct SalesReportProcessor;

impl SalesReportProcessor {
    pub fn tracking(
        workbook: &SalesWorkbook,
        config: &ReportConfig,
        range: DateRange,
        as_of: NaiveDate,
    ) -> Result<TrackingReport> {
        config.validate()?;

        info!("Building tracking report for {}", range);
        let rows = filter_by_range(&workbook.transactions, &range);
        debug!(
            "{} of {} transactions fall in {}",
            rows.len(),
            workbook.transactions.len(),
            range
        );

        let performance = build_performance(&rows, &workbook.targets, config);
        let kpis = Kpis::compute(&workbook.transactions, &workbook.targets, &range, as_of, config);
        let pivot = pivot_by_billing_type(&rows, &config.billing);
        let insights = insights(&performance);

        Ok(TrackingReport {
            range,
            as_of,
            performance,
            kpis,
            pivot,
            insights,
        })
    }
}

pub fn build_tracking_report(
    workbook: &SalesWorkbook,
    config: &ReportConfig,
    range: DateRange,
    as_of: NaiveDate,
) -> Result<TrackingReport> {
    SalesReportProcessor::tracking(workbook, config, range, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(day: u32, salesman: &str, value: f64, code: &str) -> Transaction {
        Transaction {
            billing_date: NaiveDate::from_ymd_opt(2024, 3, day),
            salesman: salesman.to_string(),
            net_value: value,
            billing_type: code.to_string(),
            customer: "Talabat Downtown".to_string(),
            branch: "Central".to_string(),
        }
    }

    fn workbook() -> SalesWorkbook {
        SalesWorkbook {
            transactions: vec![
                tx(3, "Dana", 400.0, "ZFR"),
                tx(4, "Dana", -50.0, "ZRE"),
                tx(5, "Eli", 250.0, "ZFR"),
                tx(28, "Eli", 90.0, "ZFR"),
            ],
            targets: TargetTable::new(vec![
                Target {
                    key: "Dana".to_string(),
                    ka_target: 500.0,
                    talabat_target: 300.0,
                },
                Target {
                    key: "Eli".to_string(),
                    ka_target: 200.0,
                    talabat_target: 100.0,
                },
            ]),
            ytd: Vec::new(),
            invalid_dates: 0,
        }
    }

    fn first_half() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_tracking_report_uses_range() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let report =
            build_tracking_report(&workbook(), &ReportConfig::default(), first_half(), as_of).unwrap();

        let dana = report.performance.iter().find(|p| p.salesman == "Dana").unwrap();
        assert_eq!(dana.actual, 350.0);
        assert_eq!(dana.gap, 150.0);

        let eli = report.performance.iter().find(|p| p.salesman == "Eli").unwrap();
        assert_eq!(eli.actual, 250.0);
        assert_eq!(eli.gap, 0.0);

        assert_eq!(report.kpis.total_sales, 600.0);
        assert_eq!(report.pivot.total.return_total, -50.0);
        assert!(!report.insights.is_empty());
    }

    #[test]
    fn test_tracking_report_exports() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let config = ReportConfig::default();
        let report = build_tracking_report(&workbook(), &config, first_half(), as_of).unwrap();

        let tables = report.tables();
        assert_eq!(tables.len(), 2);
        assert!(tables.iter().all(|t| t.has_total_row()));

        assert!(!report.export_xlsx().unwrap().is_empty());
        let deck = report.export_deck(&config, &[]).unwrap();
        assert_eq!(deck.slide_count, 4);
        assert!(deck.placeholders.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReportConfig {
            kpi_tile_limit: 0,
            ..ReportConfig::default()
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let result = build_tracking_report(&workbook(), &config, first_half(), as_of);
        assert!(matches!(result, Err(SalesReportError::Config(_))));
    }
}
