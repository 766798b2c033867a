use crate::engine::{filter_by_range, sum_by_group};
use crate::error::{Result, SalesReportError};
use crate::schema::{AggregatedSeries, GroupDimension, Transaction};
use crate::utils::{lookback_window, month_to_date};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub key: String,
    pub historical_total: f64,
    pub historical_average: f64,
    pub auto_allocated: f64,
    pub current_month_actual: f64,
    /// `auto_allocated - current_month_actual`
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationTable {
    pub total_target: f64,
    pub lookback_months: f64,
    pub rows: Vec<AllocationRow>,
    /// Column-wise sum of `rows`, labelled "Total".
    pub total: AllocationRow,
}

impl AllocationTable {
    pub fn row(&self, key: &str) -> Option<&AllocationRow> {
        self.rows.iter().find(|r| r.key == key)
    }
}

/// Share of `total_target` for each key, proportional to its weight.
/// All shares are zero when the weights sum to zero.
pub fn proportional_shares(weights: &AggregatedSeries, total_target: f64) -> AggregatedSeries {
    let sum = weights.total();
    weights
        .iter()
        .map(|(key, w)| {
            let share = if sum > 0.0 { w / sum * total_target } else { 0.0 };
            (key.clone(), share)
        })
        .collect()
}

pub fn allocate(
    total_target: f64,
    historical: &AggregatedSeries,
    current_month: &AggregatedSeries,
    lookback_months: f64,
) -> Result<AllocationTable> {
    if total_target.is_nan() || total_target <= 0.0 {
        return Err(SalesReportError::InvalidTarget(total_target));
    }
    if lookback_months.is_nan() || lookback_months <= 0.0 {
        return Err(SalesReportError::InvalidTarget(lookback_months));
    }
    if historical.is_empty() {
        return Err(SalesReportError::EmptyWindow);
    }

    let (historical, current_month) = AggregatedSeries::align(historical, current_month);
    let allocated = proportional_shares(&historical, total_target);

    let rows: Vec<AllocationRow> = historical
        .iter()
        .map(|(key, hist)| {
            let auto_allocated = allocated.value_or_zero(key);
            let actual = current_month.value_or_zero(key);
            AllocationRow {
                key: key.clone(),
                historical_total: hist,
                historical_average: hist / lookback_months,
                auto_allocated,
                current_month_actual: actual,
                balance: auto_allocated - actual,
            }
        })
        .collect();

    let total = rows.iter().fold(
        AllocationRow {
            key: "Total".to_string(),
            historical_total: 0.0,
            historical_average: 0.0,
            auto_allocated: 0.0,
            current_month_actual: 0.0,
            balance: 0.0,
        },
        |mut acc, r| {
            acc.historical_total += r.historical_total;
            acc.historical_average += r.historical_average;
            acc.auto_allocated += r.auto_allocated;
            acc.current_month_actual += r.current_month_actual;
            acc.balance += r.balance;
            acc
        },
    );

    debug!(
        "Allocated {:.2} across {} group(s) from a historical total of {:.2}",
        total_target,
        rows.len(),
        total.historical_total
    );

    Ok(AllocationTable {
        total_target,
        lookback_months,
        rows,
        total,
    })
}

/// Builds the historical and month-to-date series from transaction tables and
/// allocates `total_target` across `dimension`.
///
/// History comes from `ytd` when it has rows, otherwise from `sales`. The
/// window is the `lookback_months` full months before `reference`'s month.
pub fn allocate_from_tables(
    sales: &[Transaction],
    ytd: &[Transaction],
    dimension: GroupDimension,
    total_target: f64,
    lookback_months: u32,
    reference: NaiveDate,
) -> Result<AllocationTable> {
    let window = lookback_window(reference, lookback_months)?;
    let history_source = if ytd.is_empty() { sales } else { ytd };

    let history_rows = filter_by_range(history_source, &window);
    if history_rows.is_empty() {
        return Err(SalesReportError::EmptyWindow);
    }
    let historical = sum_by_group(&history_rows, dimension);
    let current = sum_by_group(&filter_by_range(sales, &month_to_date(reference)?), dimension);

    info!(
        "Allocating {:.2} by {} using lookback {}",
        total_target,
        dimension.label(),
        window
    );

    allocate(total_target, &historical, &current, lookback_months as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_scenario() {
        let historical = AggregatedSeries::from([("A", 300.0), ("B", 100.0)]);
        let current = AggregatedSeries::from([("A", 250.0)]);

        let table = allocate(800.0, &historical, &current, 2.0).unwrap();
        let a = table.row("A").unwrap();
        let b = table.row("B").unwrap();

        assert_eq!(a.historical_average, 150.0);
        assert_eq!(b.historical_average, 50.0);
        assert!((a.auto_allocated - 600.0).abs() < 1e-9);
        assert!((b.auto_allocated - 200.0).abs() < 1e-9);
        assert!((a.balance - 350.0).abs() < 1e-9);
        assert!((b.balance - 200.0).abs() < 1e-9);

        assert_eq!(table.total.key, "Total");
        assert!((table.total.auto_allocated - 800.0).abs() < 1e-9);
        assert_eq!(table.total.historical_total, 400.0);
        assert_eq!(table.total.current_month_actual, 250.0);
    }

    #[test]
    fn test_allocations_sum_to_target() {
        let historical =
            AggregatedSeries::from([("A", 13.7), ("B", 991.2), ("C", 0.3), ("D", 42.0)]);
        let table = allocate(12_345.67, &historical, &AggregatedSeries::new(), 3.0).unwrap();
        let sum: f64 = table.rows.iter().map(|r| r.auto_allocated).sum();
        assert!((sum - 12_345.67).abs() < 1e-6);
    }

    #[test]
    fn test_zero_history_allocates_zero() {
        let historical = AggregatedSeries::from([("A", 0.0), ("B", 0.0)]);
        let current = AggregatedSeries::from([("B", 10.0)]);
        let table = allocate(500.0, &historical, &current, 1.0).unwrap();
        assert!(table.rows.iter().all(|r| r.auto_allocated == 0.0));
        assert_eq!(table.row("B").unwrap().balance, -10.0);
    }

    #[test]
    fn test_current_only_key_is_included() {
        let historical = AggregatedSeries::from([("A", 100.0)]);
        let current = AggregatedSeries::from([("New", 20.0)]);
        let table = allocate(100.0, &historical, &current, 1.0).unwrap();
        let new = table.row("New").unwrap();
        assert_eq!(new.auto_allocated, 0.0);
        assert_eq!(new.balance, -20.0);
    }

    #[test]
    fn test_preconditions() {
        let historical = AggregatedSeries::from([("A", 100.0)]);
        assert!(matches!(
            allocate(0.0, &historical, &AggregatedSeries::new(), 1.0),
            Err(SalesReportError::InvalidTarget(_))
        ));
        assert!(matches!(
            allocate(-5.0, &historical, &AggregatedSeries::new(), 1.0),
            Err(SalesReportError::InvalidTarget(_))
        ));
        assert!(matches!(
            allocate(100.0, &AggregatedSeries::new(), &AggregatedSeries::new(), 1.0),
            Err(SalesReportError::EmptyWindow)
        ));
    }

    #[test]
    fn test_allocate_from_tables_prefers_ytd() {
        let row = |date: (i32, u32, u32), who: &str, value: f64| Transaction {
            billing_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            salesman: who.to_string(),
            net_value: value,
            billing_type: "ZFR".to_string(),
            customer: "Shop".to_string(),
            branch: "North".to_string(),
        };
        let sales = vec![row((2024, 3, 5), "A", 40.0), row((2024, 2, 10), "B", 1_000.0)];
        let ytd = vec![row((2024, 1, 15), "A", 300.0), row((2024, 2, 15), "B", 100.0)];
        let reference = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let table =
            allocate_from_tables(&sales, &ytd, GroupDimension::Salesman, 800.0, 2, reference)
                .unwrap();
        assert!((table.row("A").unwrap().auto_allocated - 600.0).abs() < 1e-9);
        assert_eq!(table.row("A").unwrap().current_month_actual, 40.0);

        let empty = allocate_from_tables(&sales, &[], GroupDimension::Salesman, 800.0, 1, reference);
        assert!(empty.is_ok());
        let later = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let none = allocate_from_tables(&sales, &[], GroupDimension::Salesman, 800.0, 1, later);
        assert!(matches!(none, Err(SalesReportError::EmptyWindow)));
    }
}
