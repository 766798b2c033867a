//! Salesman target tracking: per-salesman achievement, headline KPIs for a
//! period, and short textual findings.

use crate::config::ReportConfig;
use crate::engine::{
    compute_gap_series, filter_by_range, percent_of, pivot_by_billing_type, sum_by_group,
    talabat_transactions,
};
use crate::report::format::{format_number, format_percent};
use crate::schema::{DateRange, GroupDimension, TargetKind, TargetTable, Transaction};
use crate::utils::count_working_days;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesmanPerformance {
    pub salesman: String,
    pub ka_target: f64,
    pub actual: f64,
    pub gap: f64,
    pub achievement_pct: f64,
    pub talabat_target: f64,
    pub talabat_actual: f64,
    pub talabat_gap: f64,
}

/// Target vs actual for every salesman that has either a target or sales.
pub fn build_performance(
    table: &[Transaction],
    targets: &TargetTable,
    config: &ReportConfig,
) -> Vec<SalesmanPerformance> {
    let ka_target = targets.series(TargetKind::Ka);
    let talabat_target = targets.series(TargetKind::Talabat);

    let actual = sum_by_group(table, GroupDimension::Salesman);
    let talabat_actual = sum_by_group(
        &talabat_transactions(table, &config.talabat_customer_match),
        GroupDimension::Salesman,
    );

    let gap = compute_gap_series(&ka_target, &actual);
    let talabat_gap = compute_gap_series(&talabat_target, &talabat_actual);

    gap.keys()
        .map(|name| {
            let target = ka_target.value_or_zero(name);
            let sold = actual.value_or_zero(name);
            SalesmanPerformance {
                salesman: name.clone(),
                ka_target: target,
                actual: sold,
                gap: gap.value_or_zero(name),
                achievement_pct: percent_of(sold, target),
                talabat_target: talabat_target.value_or_zero(name),
                talabat_actual: talabat_actual.value_or_zero(name),
                talabat_gap: talabat_gap.value_or_zero(name),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_sales: f64,
    pub total_target: f64,
    pub achievement_pct: f64,
    pub gap: f64,
    pub talabat_sales: f64,
    pub working_days_total: u32,
    pub working_days_elapsed: u32,
    pub working_days_remaining: u32,
    pub current_daily_average: f64,
    pub required_daily_rate: f64,
    pub returns_total: f64,
    pub cancels_total: f64,
    pub active_customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTile {
    pub label: String,
    pub value: String,
}

impl Kpis {
    /// Headline figures for `range`, measured as of `as_of` (clamped into the range).
    pub fn compute(
        table: &[Transaction],
        targets: &TargetTable,
        range: &DateRange,
        as_of: NaiveDate,
        config: &ReportConfig,
    ) -> Self {
        let rows = filter_by_range(table, range);
        let as_of = as_of.max(range.start()).min(range.end());
        let excluded = config.excluded_weekday;

        let total_sales: f64 = rows.iter().map(|t| t.net_value).sum();
        let total_target = targets.series(TargetKind::Ka).total();
        let talabat_sales: f64 = talabat_transactions(&rows, &config.talabat_customer_match)
            .iter()
            .map(|t| t.net_value)
            .sum();

        let working_days_total = count_working_days(range.start(), range.end(), excluded);
        let working_days_elapsed = count_working_days(range.start(), as_of, excluded);
        let working_days_remaining = working_days_total.saturating_sub(working_days_elapsed);

        let gap = (total_target - total_sales).max(0.0);
        let pivot = pivot_by_billing_type(&rows, &config.billing);

        let active_customers = rows
            .iter()
            .filter(|t| !t.customer.is_empty())
            .map(|t| t.customer.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let kpis = Kpis {
            total_sales,
            total_target,
            achievement_pct: percent_of(total_sales, total_target),
            gap,
            talabat_sales,
            working_days_total,
            working_days_elapsed,
            working_days_remaining,
            current_daily_average: per_day(total_sales, working_days_elapsed),
            required_daily_rate: per_day(gap, working_days_remaining),
            returns_total: pivot.total.return_total,
            cancels_total: pivot.total.cancel_total,
            active_customers,
        };
        debug!("KPIs for {}: {:?}", range, kpis);
        kpis
    }

    pub fn tiles(&self, limit: usize) -> Vec<KpiTile> {
        let tile = |label: &str, value: String| KpiTile {
            label: label.to_string(),
            value,
        };
        let all = vec![
            tile("Total Sales", format_number(self.total_sales)),
            tile("Target", format_number(self.total_target)),
            tile("Achievement", format_percent(self.achievement_pct)),
            tile("Gap", format_number(self.gap)),
            tile("Talabat Sales", format_number(self.talabat_sales)),
            tile(
                "Working Days Left",
                format!("{} / {}", self.working_days_remaining, self.working_days_total),
            ),
            tile("Daily Average", format_number(self.current_daily_average)),
            tile("Required Daily", format_number(self.required_daily_rate)),
            tile(
                "Returns / Cancels",
                format!(
                    "{} / {}",
                    format_number(self.returns_total),
                    format_number(self.cancels_total)
                ),
            ),
            tile("Active Customers", self.active_customers.to_string()),
        ];
        all.into_iter().take(limit.min(10)).collect()
    }
}

fn per_day(amount: f64, days: u32) -> f64 {
    if days == 0 {
        0.0
    } else {
        amount / days as f64
    }
}

/// Short findings about a performance table, most important first.
pub fn insights(performance: &[SalesmanPerformance]) -> Vec<String> {
    let mut findings = Vec::new();
    let with_target: Vec<&SalesmanPerformance> =
        performance.iter().filter(|p| p.ka_target > 0.0).collect();

    if let Some(top) = performance
        .iter()
        .max_by(|a, b| a.actual.total_cmp(&b.actual))
        .filter(|p| p.actual > 0.0)
    {
        findings.push(format!(
            "{} leads with sales of {}",
            top.salesman,
            format_number(top.actual)
        ));
    }

    if let Some(lowest) = with_target
        .iter()
        .min_by(|a, b| a.achievement_pct.total_cmp(&b.achievement_pct))
    {
        findings.push(format!(
            "{} has the lowest achievement at {}",
            lowest.salesman,
            format_percent(lowest.achievement_pct)
        ));
    }

    if !with_target.is_empty() {
        let on_target = with_target.iter().filter(|p| p.gap == 0.0).count();
        findings.push(format!(
            "{} of {} salesmen have reached their target",
            on_target,
            with_target.len()
        ));
    }

    let talabat_gap: f64 = performance.iter().map(|p| p.talabat_gap).sum();
    if talabat_gap > 0.0 {
        findings.push(format!(
            "Talabat sales are {} short of target",
            format_number(talabat_gap)
        ));
    }

    findings
}
