use crate::engine::{filter_by_range, percent_of, sum_by_composite};
use crate::error::{Result, SalesReportError};
use crate::schema::{DateRange, GroupDimension, Transaction};
use crate::utils::shift_back_one_year;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// One value per grouping dimension.
    pub key: Vec<String>,
    pub period1_total: f64,
    pub period2_total: f64,
    pub difference: f64,
    /// `difference / period1_total * 100`, or 0 when period 1 is exactly 0.
    pub percent_difference: f64,
}

impl ComparisonRow {
    fn new(key: Vec<String>, period1_total: f64, period2_total: f64) -> Self {
        let difference = period2_total - period1_total;
        Self {
            key,
            period1_total,
            period2_total,
            difference,
            percent_difference: percent_of(difference, period1_total),
        }
    }

    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub dimensions: Vec<GroupDimension>,
    pub range1: DateRange,
    pub range2: DateRange,
    /// Sorted by period-2 total, highest first.
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonReport {
    pub fn row(&self, key: &[&str]) -> Option<&ComparisonRow> {
        self.rows
            .iter()
            .find(|r| r.key.iter().map(String::as_str).eq(key.iter().copied()))
    }

    /// Column sums, with the percentage recomputed from the summed totals.
    pub fn totals(&self) -> ComparisonRow {
        let p1 = self.rows.iter().map(|r| r.period1_total).sum();
        let p2 = self.rows.iter().map(|r| r.period2_total).sum();
        ComparisonRow::new(vec!["Total".to_string()], p1, p2)
    }
}

pub fn compare(
    table: &[Transaction],
    dimensions: &[GroupDimension],
    range1: DateRange,
    range2: DateRange,
) -> Result<ComparisonReport> {
    if dimensions.is_empty() || dimensions.len() > 3 {
        return Err(SalesReportError::Config(format!(
            "Comparison needs between 1 and 3 grouping dimensions, got {}",
            dimensions.len()
        )));
    }
    let distinct: BTreeSet<&GroupDimension> = dimensions.iter().collect();
    if distinct.len() != dimensions.len() {
        return Err(SalesReportError::Config(
            "Grouping dimensions must not repeat".to_string(),
        ));
    }

    let period1 = sum_by_composite(&filter_by_range(table, &range1), dimensions);
    let period2 = sum_by_composite(&filter_by_range(table, &range2), dimensions);

    let keys: BTreeSet<&Vec<String>> = period1.keys().chain(period2.keys()).collect();

    let mut rows: Vec<ComparisonRow> = keys
        .into_iter()
        .map(|key| {
            let p1 = period1.get(key).copied().unwrap_or(0.0);
            let p2 = period2.get(key).copied().unwrap_or(0.0);
            ComparisonRow::new(key.clone(), p1, p2)
        })
        .collect();

    // Stable: equal period-2 totals keep key order.
    rows.sort_by(|a, b| b.period2_total.total_cmp(&a.period2_total));

    debug!(
        "Compared {} vs {} over {} group(s)",
        range1,
        range2,
        rows.len()
    );

    Ok(ComparisonReport {
        dimensions: dimensions.to_vec(),
        range1,
        range2,
        rows,
    })
}

/// Compares `range` against the same dates one year earlier.
pub fn year_over_year(
    table: &[Transaction],
    dimensions: &[GroupDimension],
    range: DateRange,
) -> Result<ComparisonReport> {
    let previous = shift_back_one_year(&range)?;
    compare(table, dimensions, previous, range)
}
