use crate::allocator::{AllocationRow, AllocationTable};
use crate::comparator::ComparisonReport;
use crate::engine::{percent_of, BillingTypePivot, PivotRow};
use crate::forecast::TrendLine;
use crate::report::format::{format_number, format_percent};
use crate::schema::AggregatedSeries;
use crate::tracking::SalesmanPerformance;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Number(f64),
    /// Already scaled to 0-100.
    Percent(f64),
    Text(String),
}

impl Cell {
    pub fn display(&self) -> String {
        match self {
            Cell::Number(v) => format_number(*v),
            Cell::Percent(v) => format_percent(*v),
            Cell::Text(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) | Cell::Percent(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub cells: Vec<Cell>,
    pub is_total: bool,
}

/// A titled table ready for export. The index (row label) column is kept
/// separate from the data columns so writers can place it leftmost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub index_header: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, index_header: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            title: title.into(),
            index_header: index_header.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: impl Into<String>, cells: Vec<Cell>) {
        self.rows.push(TableRow {
            label: label.into(),
            cells,
            is_total: false,
        });
    }

    pub fn push_total(&mut self, cells: Vec<Cell>) {
        self.rows.push(TableRow {
            label: "Total".to_string(),
            cells,
            is_total: true,
        });
    }

    pub fn has_total_row(&self) -> bool {
        self.rows.last().is_some_and(|r| r.is_total)
    }

    pub fn row(&self, label: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// Single-column table from a keyed series, with a total row.
    pub fn from_series(
        title: impl Into<String>,
        index_header: impl Into<String>,
        value_header: impl Into<String>,
        series: &AggregatedSeries,
    ) -> Self {
        let mut table = Self::new(title, index_header, vec![value_header.into()]);
        for (key, value) in series.iter() {
            table.push_row(key.clone(), vec![Cell::Number(value)]);
        }
        table.push_total(vec![Cell::Number(series.total())]);
        table
    }

    /// Daily actuals next to their fitted trend values.
    pub fn from_trend(
        title: impl Into<String>,
        daily: &BTreeMap<NaiveDate, f64>,
        trend: &TrendLine,
    ) -> Self {
        let mut table = Self::new(
            title,
            "Date",
            vec!["Sales".to_string(), "Trend".to_string()],
        );
        for (date, fitted) in &trend.fitted {
            let actual = daily.get(date).copied().unwrap_or(0.0);
            table.push_row(
                date.format("%Y-%m-%d").to_string(),
                vec![Cell::Number(actual), Cell::Number(*fitted)],
            );
        }
        table
    }

    pub fn from_performance(title: impl Into<String>, performance: &[SalesmanPerformance]) -> Self {
        let columns = [
            "KA Target",
            "Actual",
            "Gap",
            "Achievement %",
            "Talabat Target",
            "Talabat Actual",
            "Talabat Gap",
        ];
        let mut table = Self::new(title, "Salesman", columns.iter().map(|c| c.to_string()).collect());

        let mut sums = [0.0f64; 6];
        for p in performance {
            let values = [
                p.ka_target,
                p.actual,
                p.gap,
                p.talabat_target,
                p.talabat_actual,
                p.talabat_gap,
            ];
            for (sum, v) in sums.iter_mut().zip(values) {
                *sum += v;
            }
            table.push_row(
                p.salesman.clone(),
                vec![
                    Cell::Number(p.ka_target),
                    Cell::Number(p.actual),
                    Cell::Number(p.gap),
                    Cell::Percent(p.achievement_pct),
                    Cell::Number(p.talabat_target),
                    Cell::Number(p.talabat_actual),
                    Cell::Number(p.talabat_gap),
                ],
            );
        }

        let [target, actual, gap, t_target, t_actual, t_gap] = sums;
        table.push_total(vec![
            Cell::Number(target),
            Cell::Number(actual),
            Cell::Number(gap),
            Cell::Percent(percent_of(actual, target)),
            Cell::Number(t_target),
            Cell::Number(t_actual),
            Cell::Number(t_gap),
        ]);
        table
    }
}

impl From<&ComparisonReport> for ReportTable {
    fn from(report: &ComparisonReport) -> Self {
        let index_header = report
            .dimensions
            .iter()
            .map(|d| d.label())
            .collect::<Vec<_>>()
            .join(" / ");
        let columns = vec![
            format!("Period 1 ({})", report.range1),
            format!("Period 2 ({})", report.range2),
            "Difference".to_string(),
            "% Difference".to_string(),
        ];
        let mut table = ReportTable::new("Period Comparison", index_header, columns);

        let cells = |p1: f64, p2: f64, diff: f64, pct: f64| {
            vec![
                Cell::Number(p1),
                Cell::Number(p2),
                Cell::Number(diff),
                Cell::Percent(pct),
            ]
        };
        for row in &report.rows {
            table.push_row(
                row.label(),
                cells(
                    row.period1_total,
                    row.period2_total,
                    row.difference,
                    row.percent_difference,
                ),
            );
        }
        let totals = report.totals();
        table.push_total(cells(
            totals.period1_total,
            totals.period2_total,
            totals.difference,
            totals.percent_difference,
        ));
        table
    }
}

impl From<&AllocationTable> for ReportTable {
    fn from(allocation: &AllocationTable) -> Self {
        let columns = [
            "Historical Total",
            "Historical Average",
            "Auto Target",
            "Current Month",
            "Balance",
        ];
        let mut table = ReportTable::new(
            "Target Allocation",
            "Group",
            columns.iter().map(|c| c.to_string()).collect(),
        );
        let cells = |r: &AllocationRow| {
            vec![
                Cell::Number(r.historical_total),
                Cell::Number(r.historical_average),
                Cell::Number(r.auto_allocated),
                Cell::Number(r.current_month_actual),
                Cell::Number(r.balance),
            ]
        };
        for row in &allocation.rows {
            table.push_row(row.key.clone(), cells(row));
        }
        table.push_total(cells(&allocation.total));
        table
    }
}

impl From<&BillingTypePivot> for ReportTable {
    fn from(pivot: &BillingTypePivot) -> Self {
        let mut columns = pivot.codes.clone();
        columns.extend(
            ["Total Sales", "Returns", "Return %", "Cancellations"]
                .iter()
                .map(|c| c.to_string()),
        );
        let mut table = ReportTable::new("Sales by Billing Type", "Salesman", columns);

        let cells = |r: &PivotRow| {
            let mut cells: Vec<Cell> = r.by_code.iter().map(|v| Cell::Number(*v)).collect();
            cells.push(Cell::Number(r.total_sales));
            cells.push(Cell::Number(r.return_total));
            cells.push(Cell::Percent(r.return_pct));
            cells.push(Cell::Number(r.cancel_total));
            cells
        };
        for row in &pivot.rows {
            table.push_row(row.salesman.clone(), cells(row));
        }
        table.push_total(cells(&pivot.total));
        table
    }
}
