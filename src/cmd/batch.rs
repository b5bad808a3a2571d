//! Batch command - evaluate many scenarios and emit one result row each

use crate::cmd::read_scenarios;
use crate::tax::{calculate, QsbsReport, StateTax};
use crate::utils::write_csv;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BatchCommand {
    /// CSV or JSON file of scenarios. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Output full reports as JSON instead of CSV rows
    #[arg(long)]
    json: bool,
}

/// Flat CSV output row
#[derive(Debug, Serialize)]
struct ResultRecord {
    id: String,
    stock_type: String,
    state_code: String,
    holding_status: String,
    start_date: String,
    qualification_date: String,
    is_qualified: bool,
    days_remaining: u32,
    sale_date: String,
    sale_date_before_qualification: bool,
    gain: String,
    exclusion_percent: String,
    max_exclusion_cap: String,
    actual_exclusion: String,
    taxable_gain: String,
    federal_tax_without_qsbs: String,
    federal_tax_with_qsbs: String,
    federal_savings: String,
    state_conformity: String,
    state_tax_without_qsbs: String,
    state_tax_with_qsbs: String,
    state_savings: String,
    total_savings: String,
    total_tax_owed: String,
    warnings: usize,
}

impl ResultRecord {
    fn new(row: usize, id: Option<&str>, report: &QsbsReport) -> Self {
        let (state_conformity, state_without, state_with, state_savings) = match &report.state_tax {
            StateTax::Computed(state) => (
                serde_plain_name(&state.conformity),
                money(state.tax_without_qsbs),
                money(state.tax_with_qsbs),
                money(state.savings),
            ),
            StateTax::UnknownState { .. } => (
                "unknown-state".to_string(),
                String::new(),
                String::new(),
                String::new(),
            ),
        };
        let holding = &report.holding_period;
        let exclusion = &report.exclusion;
        let federal = &report.federal_tax;

        ResultRecord {
            id: id.map_or_else(|| row.to_string(), str::to_string),
            stock_type: report.scenario.stock_type.to_string(),
            state_code: report.scenario.state_code.trim().to_uppercase(),
            holding_status: serde_plain_name(&holding.status),
            start_date: optional_date(holding.start_date),
            qualification_date: optional_date(holding.qualification_date),
            is_qualified: holding.is_qualified,
            days_remaining: holding.days_remaining,
            sale_date: report.sale_date.format("%Y-%m-%d").to_string(),
            sale_date_before_qualification: holding.sale_date_before_qualification,
            gain: money(exclusion.gain),
            exclusion_percent: exclusion.exclusion_percent.normalize().to_string(),
            max_exclusion_cap: money(exclusion.max_exclusion_cap),
            actual_exclusion: money(exclusion.actual_exclusion),
            taxable_gain: money(exclusion.taxable_gain),
            federal_tax_without_qsbs: money(federal.tax_without_qsbs),
            federal_tax_with_qsbs: money(federal.tax_with_qsbs),
            federal_savings: money(federal.savings),
            state_conformity,
            state_tax_without_qsbs: state_without,
            state_tax_with_qsbs: state_with,
            state_savings,
            total_savings: money(report.total_savings),
            total_tax_owed: money(report.total_tax_owed),
            warnings: report.warnings.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    as_of: NaiveDate,
    reports: Vec<BatchReport<'a>>,
}

#[derive(Debug, Serialize)]
struct BatchReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(flatten)]
    report: &'a QsbsReport,
}

impl BatchCommand {
    pub fn exec(&self, today: NaiveDate) -> anyhow::Result<()> {
        let scenarios = read_scenarios(&self.file)?;
        let reports: Vec<_> = scenarios
            .iter()
            .map(|labelled| calculate(&labelled.scenario, today))
            .collect();
        log::info!("Calculated {} scenario(s)", reports.len());

        if self.json {
            let output = BatchOutput {
                as_of: today,
                reports: scenarios
                    .iter()
                    .zip(&reports)
                    .map(|(labelled, report)| BatchReport {
                        id: labelled.id.as_deref(),
                        report,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        let records = scenarios
            .iter()
            .zip(&reports)
            .enumerate()
            .map(|(i, (labelled, report))| ResultRecord::new(i + 1, labelled.id.as_deref(), report));
        write_csv(records, io::stdout())
    }
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn optional_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Wire name of a unit enum variant, e.g. `no-income-tax`
fn serde_plain_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{DateField, Scenario, StockType};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn result_record_flattens_report() {
        let scenario = Scenario::new(StockType::CommonStock, dec!(1000), dec!(101000), "tx")
            .with_date(DateField::PurchaseDate, date(2008, 1, 1))
            .with_sale_date(date(2025, 1, 1));
        let report = calculate(&scenario, date(2026, 10, 19));
        let record = ResultRecord::new(1, None, &report);

        assert_eq!(record.id, "1");
        assert_eq!(record.state_code, "TX");
        assert_eq!(record.holding_status, "qualified");
        assert_eq!(record.start_date, "2008-01-01");
        assert_eq!(record.gain, "100000.00");
        assert_eq!(record.exclusion_percent, "0.5");
        assert_eq!(record.taxable_gain, "50000.00");
        assert_eq!(record.federal_savings, "11900.00");
        assert_eq!(record.state_conformity, "no-income-tax");
        assert_eq!(record.state_tax_with_qsbs, "0.00");
    }

    #[test]
    fn unknown_state_leaves_state_columns_blank() {
        let scenario = Scenario::new(StockType::Inheritance, dec!(0), dec!(10), "QQ");
        let report = calculate(&scenario, date(2026, 10, 19));
        let record = ResultRecord::new(7, Some("estate"), &report);
        assert_eq!(record.id, "estate");
        assert_eq!(record.state_conformity, "unknown-state");
        assert_eq!(record.state_savings, "");
        assert_eq!(record.start_date, "");
        assert_eq!(record.holding_status, "immediately-qualified");
    }
}
