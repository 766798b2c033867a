use crate::config::BillingCodes;
use crate::schema::{AggregatedSeries, DateRange, GroupDimension, Transaction, TransactionTable};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Row selection for [`filter_transactions`]. A `None` field places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub salesmen: Option<BTreeSet<String>>,
    pub billing_types: Option<BTreeSet<String>>,
    pub customers: Option<BTreeSet<String>>,
    pub branches: Option<BTreeSet<String>>,
    pub range: Option<DateRange>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_salesmen<I, S>(mut self, salesmen: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.salesmen = Some(salesmen.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_billing_types<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.billing_types = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_customers<I, S>(mut self, customers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.customers = Some(customers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = Some(branches.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        let member = |set: &Option<BTreeSet<String>>, value: &str| {
            set.as_ref().map_or(true, |s| s.contains(value))
        };

        if !member(&self.salesmen, &tx.salesman)
            || !member(&self.billing_types, &tx.billing_type)
            || !member(&self.customers, &tx.customer)
            || !member(&self.branches, &tx.branch)
        {
            return false;
        }

        match (&self.range, tx.billing_date) {
            (None, _) => true,
            (Some(range), Some(date)) => range.contains(date),
            (Some(_), None) => false,
        }
    }
}

pub fn filter_transactions(table: &[Transaction], filter: &TransactionFilter) -> TransactionTable {
    let filtered: TransactionTable = table.iter().filter(|tx| filter.matches(tx)).cloned().collect();
    debug!("Filter kept {} of {} rows", filtered.len(), table.len());
    filtered
}

/// Rows dated within `range`.
pub fn filter_by_range(table: &[Transaction], range: &DateRange) -> TransactionTable {
    filter_transactions(table, &TransactionFilter::new().with_range(*range))
}

/// Rows whose customer name contains `pattern`, ignoring case.
pub fn talabat_transactions(table: &[Transaction], pattern: &str) -> TransactionTable {
    let needle = pattern.to_lowercase();
    table
        .iter()
        .filter(|tx| tx.customer.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Net value summed per distinct value of `dimension`.
pub fn sum_by_group(table: &[Transaction], dimension: GroupDimension) -> AggregatedSeries {
    let mut series = AggregatedSeries::new();
    for tx in table {
        series.add(tx.field(dimension), tx.net_value);
    }
    series
}

/// Net value summed per composite key over `dimensions`, in key order.
pub fn sum_by_composite(
    table: &[Transaction],
    dimensions: &[GroupDimension],
) -> BTreeMap<Vec<String>, f64> {
    let mut totals: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for tx in table {
        let key: Vec<String> = dimensions.iter().map(|d| tx.field(*d).to_string()).collect();
        *totals.entry(key).or_insert(0.0) += tx.net_value;
    }
    totals
}

/// Daily net value totals; rows without a date are skipped.
pub fn sum_by_date(table: &[Transaction]) -> BTreeMap<NaiveDate, f64> {
    let mut daily = BTreeMap::new();
    for tx in table {
        if let Some(date) = tx.billing_date {
            *daily.entry(date).or_insert(0.0) += tx.net_value;
        }
    }
    daily
}

/// `max(target - actual, 0)` per key, over the union of both indices.
pub fn compute_gap_series(target: &AggregatedSeries, actual: &AggregatedSeries) -> AggregatedSeries {
    let (target, actual) = AggregatedSeries::align(target, actual);
    target
        .iter()
        .map(|(key, t)| (key.clone(), (t - actual.value_or_zero(key)).max(0.0)))
        .collect()
}

pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    pub salesman: String,
    /// One value per required code, in [`BillingTypePivot::codes`] order.
    pub by_code: Vec<f64>,
    pub total_sales: f64,
    pub return_total: f64,
    pub return_pct: f64,
    pub cancel_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingTypePivot {
    pub codes: Vec<String>,
    pub rows: Vec<PivotRow>,
    pub total: PivotRow,
}

impl BillingTypePivot {
    pub fn row(&self, salesman: &str) -> Option<&PivotRow> {
        self.rows.iter().find(|r| r.salesman == salesman)
    }

    pub fn code_value(&self, row: &PivotRow, code: &str) -> f64 {
        self.codes
            .iter()
            .position(|c| c == code)
            .map_or(0.0, |idx| row.by_code[idx])
    }
}

fn derive_pivot_row(salesman: String, by_code: Vec<f64>, codes: &BillingCodes) -> PivotRow {
    let value_of = |code: &str| {
        codes
            .required
            .iter()
            .position(|c| c == code)
            .map_or(0.0, |idx| by_code[idx])
    };

    let total_sales: f64 = by_code.iter().sum();
    let return_total: f64 = codes.returns.iter().map(|c| value_of(c.as_str())).sum();
    let cancel_total: f64 = codes.cancels.iter().map(|c| value_of(c.as_str())).sum();

    PivotRow {
        salesman,
        total_sales,
        return_total,
        return_pct: percent_of(return_total, total_sales),
        cancel_total,
        by_code,
    }
}

/// One row per salesman with a column per required billing code, plus a
/// "Total" row recomputed from the summed columns.
pub fn pivot_by_billing_type(table: &[Transaction], codes: &BillingCodes) -> BillingTypePivot {
    let code_index: BTreeMap<&str, usize> = codes
        .required
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.as_str(), idx))
        .collect();

    let mut per_salesman: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut ignored = 0usize;
    for tx in table {
        let values = per_salesman
            .entry(tx.salesman.clone())
            .or_insert_with(|| vec![0.0; codes.required.len()]);
        match code_index.get(tx.billing_type.as_str()) {
            Some(&idx) => values[idx] += tx.net_value,
            None => ignored += 1,
        }
    }
    if ignored > 0 {
        debug!("Pivot ignored {} rows with billing codes outside the required set", ignored);
    }

    let mut column_sums = vec![0.0; codes.required.len()];
    let rows: Vec<PivotRow> = per_salesman
        .into_iter()
        .map(|(salesman, by_code)| {
            for (sum, v) in column_sums.iter_mut().zip(&by_code) {
                *sum += v;
            }
            derive_pivot_row(salesman, by_code, codes)
        })
        .collect();

    BillingTypePivot {
        codes: codes.required.clone(),
        rows,
        total: derive_pivot_row("Total".to_string(), column_sums, codes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: (i32, u32, u32), salesman: &str, value: f64, code: &str, customer: &str) -> Transaction {
        Transaction {
            billing_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            salesman: salesman.to_string(),
            net_value: value,
            billing_type: code.to_string(),
            customer: customer.to_string(),
            branch: "Main".to_string(),
        }
    }

    fn sample() -> TransactionTable {
        vec![
            tx((2024, 1, 1), "Alice", 100.0, "ZFR", "Talabat Mart"),
            tx((2024, 1, 2), "Alice", 50.0, "YKRE", "Corner Shop"),
            tx((2024, 1, 3), "Bob", 80.0, "ZFR", "Corner Shop"),
            tx((2024, 2, 1), "Bob", 20.0, "ZCAN", "talabat express"),
        ]
    }

    #[test]
    fn test_sum_by_group_and_gap_scenario() {
        let actual = sum_by_group(&sample()[..2], GroupDimension::Salesman);
        assert_eq!(actual.get("Alice"), Some(150.0));

        let target = AggregatedSeries::from([("Alice", 200.0)]);
        let gap = compute_gap_series(&target, &actual);
        assert_eq!(gap.get("Alice"), Some(50.0));
    }

    #[test]
    fn test_gap_is_never_negative_and_covers_union() {
        let target = AggregatedSeries::from([("Alice", 100.0), ("Bob", 10.0)]);
        let actual = AggregatedSeries::from([("Bob", 40.0), ("Cara", 5.0)]);
        let gap = compute_gap_series(&target, &actual);

        assert_eq!(gap.len(), 3);
        assert_eq!(gap.get("Alice"), Some(100.0));
        assert_eq!(gap.get("Bob"), Some(0.0));
        assert_eq!(gap.get("Cara"), Some(0.0));
        assert!(gap.iter().all(|(_, v)| v >= 0.0));
    }

    #[test]
    fn test_filter_by_sets_and_inclusive_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap();
        let filtered = filter_transactions(&sample(), &TransactionFilter::new().with_range(range));
        assert_eq!(filtered.len(), 2);

        let filter = TransactionFilter::new()
            .with_salesmen(["Bob"])
            .with_billing_types(["ZFR", "ZCAN"]);
        assert_eq!(filter_transactions(&sample(), &filter).len(), 2);

        let filter = TransactionFilter::new().with_customers(Vec::<String>::new());
        assert!(filter_transactions(&sample(), &filter).is_empty());
    }

    #[test]
    fn test_null_dates_excluded_only_when_range_set() {
        let mut table = sample();
        table[0].billing_date = None;

        assert_eq!(filter_transactions(&table, &TransactionFilter::new()).len(), 4);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(filter_by_range(&table, &range).len(), 3);
    }

    #[test]
    fn test_filter_json_with_inverted_range_rejected() {
        let inverted = r#"{"salesmen":["Alice"],"billing_types":null,"customers":null,"branches":null,
            "range":{"start":"2024-02-01","end":"2024-01-01"}}"#;
        assert!(serde_json::from_str::<TransactionFilter>(inverted).is_err());

        let valid = r#"{"salesmen":["Alice"],"billing_types":null,"customers":null,"branches":null,
            "range":{"start":"2024-01-01","end":"2024-01-02"}}"#;
        let filter: TransactionFilter = serde_json::from_str(valid).unwrap();
        assert_eq!(filter_transactions(&sample(), &filter).len(), 2);
    }

    #[test]
    fn test_talabat_match_is_case_insensitive() {
        let rows = talabat_transactions(&sample(), "TALABAT");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_sum_by_date() {
        let daily = sum_by_date(&sample());
        assert_eq!(daily.len(), 4);
        assert_eq!(daily[&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()], 100.0);
    }

    #[test]
    fn test_pivot_by_billing_type() {
        let codes = BillingCodes::default();
        let mut table = sample();
        table.push(tx((2024, 1, 5), "Alice", 10.0, "ZRE", "Corner Shop"));
        table.push(tx((2024, 1, 6), "Alice", 999.0, "UNKNOWN", "Corner Shop"));

        let pivot = pivot_by_billing_type(&table, &codes);
        assert_eq!(pivot.codes.len(), codes.required.len());

        let alice = pivot.row("Alice").unwrap();
        assert_eq!(alice.total_sales, 160.0);
        assert_eq!(alice.return_total, 60.0);
        assert!((alice.return_pct - 37.5).abs() < 1e-9);
        assert_eq!(alice.cancel_total, 0.0);
        assert_eq!(pivot.code_value(alice, "YKS1"), 0.0);

        let bob = pivot.row("Bob").unwrap();
        assert_eq!(bob.total_sales, 100.0);
        assert_eq!(bob.cancel_total, 20.0);
        assert_eq!(bob.return_pct, 0.0);

        // Total row recomputes the percentage from summed columns
        assert_eq!(pivot.total.total_sales, 260.0);
        assert_eq!(pivot.total.return_total, 60.0);
        assert!((pivot.total.return_pct - 60.0 / 260.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pivot_zero_sales_has_zero_return_pct() {
        let pivot = pivot_by_billing_type(&[], &BillingCodes::default());
        assert!(pivot.rows.is_empty());
        assert_eq!(pivot.total.return_pct, 0.0);
        assert!(pivot.total.by_code.iter().all(|v| *v == 0.0));
    }
}
