use crate::error::{Result, SalesReportError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Least-squares line `value = slope * index + intercept` over the 0-based
/// position of each point. Dates are labels only; gaps between them do not
/// affect the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    /// Fitted value at each input point, same order and length as the input.
    pub fitted: Vec<(NaiveDate, f64)>,
}

impl TrendLine {
    pub fn value_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }

    /// Extends the line `steps` positions past the last fitted point.
    pub fn project(&self, steps: usize) -> Vec<f64> {
        let n = self.fitted.len();
        (n..n + steps).map(|i| self.value_at(i)).collect()
    }
}

pub fn fit(points: &[(NaiveDate, f64)]) -> Result<TrendLine> {
    if points.len() < 2 {
        return Err(SalesReportError::InsufficientData {
            required: 2,
            actual: points.len(),
        });
    }

    let n = points.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = points.iter().map(|(_, v)| v).sum::<f64>() / n;

    let (cov, var) = points
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (i, (_, y))| {
            let dx = i as f64 - mean_x;
            (cov + dx * (y - mean_y), var + dx * dx)
        });

    let slope = cov / var;
    let intercept = mean_y - slope * mean_x;

    let fitted = points
        .iter()
        .enumerate()
        .map(|(i, (date, _))| (*date, slope * i as f64 + intercept))
        .collect();

    Ok(TrendLine {
        slope,
        intercept,
        fitted,
    })
}

pub fn fit_daily(daily: &BTreeMap<NaiveDate, f64>) -> Result<TrendLine> {
    let points: Vec<(NaiveDate, f64)> = daily.iter().map(|(d, v)| (*d, *v)).collect();
    fit(&points)
}
