use crate::error::{Result, SalesReportError};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One billing event from the transactions sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "Billing date. Null when the source cell could not be parsed as a date.")]
    pub billing_date: Option<NaiveDate>,
    pub salesman: String,
    pub net_value: f64,
    #[schemars(description = "Billing type code such as ZFR or YKRE.")]
    pub billing_type: String,
    #[schemars(description = "Customer name ('PY Name').")]
    pub customer: String,
    #[schemars(description = "Branch name ('SP Name').")]
    pub branch: String,
}

impl Transaction {
    pub fn field(&self, dimension: GroupDimension) -> &str {
        match dimension {
            GroupDimension::Salesman => &self.salesman,
            GroupDimension::Customer => &self.customer,
            GroupDimension::Branch => &self.branch,
            GroupDimension::BillingType => &self.billing_type,
        }
    }
}

pub type TransactionTable = Vec<Transaction>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    pub key: String,
    pub ka_target: f64,
    pub talabat_target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum TargetKind {
    Ka,
    Talabat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetTable {
    pub rows: Vec<Target>,
}

impl TargetTable {
    pub fn new(rows: Vec<Target>) -> Self {
        Self { rows }
    }

    pub fn get(&self, key: &str) -> Option<&Target> {
        self.rows.iter().find(|t| t.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Targets of one kind keyed by group key. Duplicate keys are summed.
    pub fn series(&self, kind: TargetKind) -> AggregatedSeries {
        let mut series = AggregatedSeries::new();
        for target in &self.rows {
            let value = match kind {
                TargetKind::Ka => target.ka_target,
                TargetKind::Talabat => target.talabat_target,
            };
            series.add(&target.key, value);
        }
        series
    }
}

/// Everything read from one uploaded workbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesWorkbook {
    pub transactions: TransactionTable,
    pub targets: TargetTable,
    pub ytd: TransactionTable,
    /// Rows across all transaction-shaped sheets whose billing date was unreadable.
    pub invalid_dates: usize,
}

impl SalesWorkbook {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.targets.is_empty() && self.ytd.is_empty()
    }

    /// Billing date span of the transactions table, ignoring null dates.
    pub fn date_span(&self) -> Option<DateRange> {
        let mut dates = self.transactions.iter().filter_map(|t| t.billing_date);
        let first = dates.next()?;
        let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange { start, end })
    }
}

/// Column a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum GroupDimension {
    Salesman,
    Customer,
    Branch,
    BillingType,
}

impl GroupDimension {
    pub fn label(&self) -> &'static str {
        match self {
            GroupDimension::Salesman => "Salesman",
            GroupDimension::Customer => "Customer",
            GroupDimension::Branch => "Branch",
            GroupDimension::BillingType => "Billing Type",
        }
    }
}

/// Inclusive calendar date range with `start <= end`. Deserialization goes
/// through [`DateRange::new`], so an inverted range is rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize, JsonSchema)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = SalesReportError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SalesReportError::Range { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Group key to numeric total. A missing key means zero activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    values: BTreeMap<String, f64>,
}

impl AggregatedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, value: f64) {
        *self.values.entry(key.to_string()).or_insert(0.0) += value;
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Value for `key`, zero when absent.
    pub fn value_or_zero(&self, key: &str) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn union_keys(&self, other: &AggregatedSeries) -> BTreeSet<String> {
        self.values
            .keys()
            .chain(other.values.keys())
            .cloned()
            .collect()
    }

    /// Restricts the series to `keys`, zero-filling the ones it lacks.
    pub fn reindex<'a, I>(&self, keys: I) -> AggregatedSeries
    where
        I: IntoIterator<Item = &'a String>,
    {
        let values = keys
            .into_iter()
            .map(|k| (k.clone(), self.value_or_zero(k)))
            .collect();
        AggregatedSeries { values }
    }

    /// Both series reindexed onto the union of their keys.
    pub fn align(a: &AggregatedSeries, b: &AggregatedSeries) -> (AggregatedSeries, AggregatedSeries) {
        let keys = a.union_keys(b);
        (a.reindex(&keys), b.reindex(&keys))
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.values
    }
}

impl FromIterator<(String, f64)> for AggregatedSeries {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut series = AggregatedSeries::new();
        for (key, value) in iter {
            series.add(&key, value);
        }
        series
    }
}

impl<const N: usize> From<[(&str, f64); N]> for AggregatedSeries {
    fn from(pairs: [(&str, f64); N]) -> Self {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}
