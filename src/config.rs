use crate::error::{Result, SalesReportError};
use chrono::Weekday;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SheetNames {
    #[schemars(description = "Sheet holding one row per billing event. Required.")]
    pub transactions: String,

    #[schemars(description = "Sheet holding one row per salesman with KA and Talabat targets. Required.")]
    pub targets: String,

    #[schemars(description = "Optional year-to-date sheet, same shape as the transactions sheet.")]
    pub ytd: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            transactions: "sales data".to_string(),
            targets: "Target".to_string(),
            ytd: "YTD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ColumnNames {
    pub billing_date: String,
    pub salesman: String,
    pub net_value: String,
    pub billing_type: String,
    #[schemars(description = "Customer name column, 'PY Name' in the source export.")]
    pub customer: String,
    #[schemars(description = "Branch column, 'SP Name' in the source export.")]
    pub branch: String,
    pub target_key: String,
    pub ka_target: String,
    pub talabat_target: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            billing_date: "Billing Date".to_string(),
            salesman: "Salesman".to_string(),
            net_value: "Net Value".to_string(),
            billing_type: "Billing Type".to_string(),
            customer: "PY Name".to_string(),
            branch: "SP Name".to_string(),
            target_key: "Salesman".to_string(),
            ka_target: "KA Target".to_string(),
            talabat_target: "Talabat Target".to_string(),
        }
    }
}

impl ColumnNames {
    pub fn transaction_columns(&self) -> [&str; 6] {
        [
            &self.billing_date,
            &self.salesman,
            &self.net_value,
            &self.billing_type,
            &self.customer,
            &self.branch,
        ]
    }

    pub fn target_columns(&self) -> [&str; 3] {
        [&self.target_key, &self.ka_target, &self.talabat_target]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BillingCodes {
    #[schemars(
        description = "Billing type codes that always appear as pivot columns, even with no matching rows."
    )]
    pub required: Vec<String>,

    #[schemars(description = "The two codes summed into the return total.")]
    pub returns: [String; 2],

    #[schemars(description = "The three codes summed into the cancel total.")]
    pub cancels: [String; 3],
}

impl Default for BillingCodes {
    fn default() -> Self {
        Self {
            required: ["ZFR", "YKF2", "YKRE", "YKS1", "YKS2", "ZCAN", "ZRE"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            returns: ["YKRE".to_string(), "ZRE".to_string()],
            cancels: ["YKS1".to_string(), "YKS2".to_string(), "ZCAN".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    pub sheets: SheetNames,

    pub columns: ColumnNames,

    pub billing: BillingCodes,

    #[schemars(
        with = "String",
        description = "Weekday that never counts as a working day (e.g. \"Fri\")."
    )]
    pub excluded_weekday: Weekday,

    #[schemars(
        description = "Case-insensitive substring of the customer name identifying Talabat sales."
    )]
    pub talabat_customer_match: String,

    #[schemars(description = "Maximum number of KPI tiles on the deck's KPI slide.")]
    pub kpi_tile_limit: usize,

    pub deck_title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sheets: SheetNames::default(),
            columns: ColumnNames::default(),
            billing: BillingCodes::default(),
            excluded_weekday: Weekday::Fri,
            talabat_customer_match: "talabat".to_string(),
            kpi_tile_limit: 10,
            deck_title: "Sales Performance Report".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let sheets = [&self.sheets.transactions, &self.sheets.targets, &self.sheets.ytd];
        if sheets.iter().any(|s| s.trim().is_empty()) {
            return Err(SalesReportError::Config(
                "Sheet names must not be empty".to_string(),
            ));
        }

        let columns = self
            .columns
            .transaction_columns()
            .into_iter()
            .chain(self.columns.target_columns());
        for column in columns {
            if column.trim().is_empty() {
                return Err(SalesReportError::Config(
                    "Column names must not be empty".to_string(),
                ));
            }
        }

        for code in self.billing.returns.iter().chain(self.billing.cancels.iter()) {
            if !self.billing.required.contains(code) {
                return Err(SalesReportError::Config(format!(
                    "Billing code '{}' is used for returns/cancels but is not in the required set",
                    code
                )));
            }
        }

        if self.kpi_tile_limit == 0 || self.kpi_tile_limit > 10 {
            return Err(SalesReportError::Config(format!(
                "KPI tile limit {} must be between 1 and 10",
                self.kpi_tile_limit
            )));
        }

        Ok(())
    }

    /// Stable textual identity used to key cached loads.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }
}
