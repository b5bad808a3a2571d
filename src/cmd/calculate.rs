//! Calculate command - holding period, exclusion and tax savings for a scenario

use crate::cmd::read_scenarios;
use crate::money::{format_rate, format_usd};
use crate::scenario::{AcquisitionMethod, DateField, Election83b, LabelledScenario, Scenario, StockType};
use crate::share;
use crate::tax::exclusion::{LONG_TERM_CAPITAL_GAINS_RATE, NET_INVESTMENT_INCOME_TAX_RATE};
use crate::tax::{calculate, HoldingStatus, QsbsReport, StateTax};
use crate::utils::display_date;
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CalculateCommand {
    /// JSON or CSV file with one or more scenarios ("-" for stdin)
    #[arg(short, long, conflicts_with_all = ["token", "stock_type"])]
    file: Option<PathBuf>,

    /// Share token produced by `qsbs share encode`
    #[arg(long, conflicts_with = "stock_type")]
    token: Option<String>,

    /// How the stock was acquired (e.g. iso, rsu, common-stock, gift)
    #[arg(short = 't', long)]
    stock_type: Option<StockType>,

    /// Acquisition method (purchased, exercised, received-for-services, ...)
    #[arg(short, long)]
    method: Option<AcquisitionMethod>,

    /// 83(b) election status for restricted stock: filed, not-filed or unknown
    #[arg(long = "election-83b", default_value = "unknown")]
    election: Election83b,

    #[arg(long)]
    grant_date: Option<NaiveDate>,

    #[arg(long)]
    exercise_date: Option<NaiveDate>,

    #[arg(long)]
    vesting_date: Option<NaiveDate>,

    #[arg(long)]
    purchase_date: Option<NaiveDate>,

    #[arg(long)]
    conversion_date: Option<NaiveDate>,

    /// Donor's acquisition date, for gifted stock
    #[arg(long)]
    donor_date: Option<NaiveDate>,

    /// Planned sale date (defaults to one year from today)
    #[arg(long)]
    sale_date: Option<NaiveDate>,

    /// Amount paid or included in income, in USD
    #[arg(short = 'b', long, default_value = "0")]
    cost_basis: Decimal,

    /// Expected sale proceeds, in USD
    #[arg(short = 'v', long)]
    sale_value: Option<Decimal>,

    /// Two-letter state code, or DC
    #[arg(short, long)]
    state: Option<String>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl CalculateCommand {
    pub fn exec(&self, today: NaiveDate) -> anyhow::Result<()> {
        let scenarios = self.scenarios()?;
        log::info!("Calculating {} scenario(s) as of {}", scenarios.len(), today);

        let reports: Vec<_> = scenarios
            .iter()
            .map(|labelled| (labelled.id.clone(), calculate(&labelled.scenario, today)))
            .collect();

        if self.json {
            print_json(&reports)
        } else {
            for (i, (id, report)) in reports.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_report(id.as_deref(), report);
            }
            Ok(())
        }
    }

    fn scenarios(&self) -> anyhow::Result<Vec<LabelledScenario>> {
        if let Some(ref path) = self.file {
            return read_scenarios(path);
        }
        let scenario = match self.token {
            Some(ref token) => share::decode(token)?,
            None => self.scenario_from_flags()?,
        };
        scenario.validate()?;
        Ok(vec![LabelledScenario { id: None, scenario }])
    }

    fn scenario_from_flags(&self) -> anyhow::Result<Scenario> {
        let Some(stock_type) = self.stock_type else {
            anyhow::bail!("Provide a scenario with --file, --token or --stock-type.");
        };
        let Some(sale_value) = self.sale_value else {
            anyhow::bail!("--sale-value is required when describing a scenario with flags.");
        };
        let Some(ref state) = self.state else {
            anyhow::bail!("--state is required when describing a scenario with flags.");
        };

        let mut scenario = Scenario::new(stock_type, self.cost_basis, sale_value, state.clone())
            .with_election(self.election);
        scenario.acquisition_method = self.method;
        scenario.sale_date = self.sale_date;
        for (field, date) in [
            (DateField::GrantDate, self.grant_date),
            (DateField::ExerciseDate, self.exercise_date),
            (DateField::VestingDate, self.vesting_date),
            (DateField::PurchaseDate, self.purchase_date),
            (DateField::ConversionDate, self.conversion_date),
            (DateField::DonorAcquisitionDate, self.donor_date),
        ] {
            scenario.set_date(field, date);
        }
        Ok(scenario)
    }
}

#[derive(Debug, Serialize)]
struct LabelledReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(flatten)]
    report: &'a QsbsReport,
}

fn print_json(reports: &[(Option<String>, QsbsReport)]) -> anyhow::Result<()> {
    let labelled: Vec<_> = reports
        .iter()
        .map(|(id, report)| LabelledReport {
            id: id.as_deref(),
            report,
        })
        .collect();
    match labelled.as_slice() {
        [single] => println!("{}", serde_json::to_string_pretty(single)?),
        many => println!("{}", serde_json::to_string_pretty(many)?),
    }
    Ok(())
}

fn print_report(id: Option<&str>, report: &QsbsReport) {
    let scenario = &report.scenario;
    let holding = &report.holding_period;
    let exclusion = &report.exclusion;
    let federal = &report.federal_tax;

    println!();
    match id {
        Some(id) => println!("QSBS ESTIMATE: {} (as of {})", id, display_date(report.today)),
        None => println!("QSBS ESTIMATE (as of {})", display_date(report.today)),
    }
    println!();
    println!("  Stock type:            {}", scenario.stock_type.display());
    if scenario.stock_type == StockType::RestrictedStock {
        println!("  83(b) election:        {}", scenario.election_83b.as_str());
    }
    println!("  Cost basis:            {}", format_usd(scenario.cost_basis));
    println!("  Expected sale value:   {}", format_usd(scenario.expected_sale_value));
    println!("  Sale date:             {}", display_date(report.sale_date));
    println!();

    println!("HOLDING PERIOD");
    println!("  Status:                {}", holding.status.display());
    if let Some(start) = holding.start_date {
        println!("  Clock started:         {}", display_date(start));
    }
    if let Some(qualification) = holding.qualification_date {
        println!("  Qualifies on:          {}", display_date(qualification));
    }
    if holding.status == HoldingStatus::Counting {
        println!("  Days remaining:        {}", holding.days_remaining);
    }
    if holding.qualification_date.is_some() {
        let answer = if holding.sale_date_before_qualification {
            "No"
        } else {
            "Yes"
        };
        println!("  Qualified at sale:     {}", answer);
    }
    println!("  {}", holding.explanation);
    println!();

    println!("FEDERAL EXCLUSION");
    println!("  Gain:                  {}", format_usd(exclusion.gain));
    match exclusion.tier {
        Some(_) => println!(
            "  Exclusion:             {}",
            format_rate(exclusion.exclusion_percent)
        ),
        None => println!("  Exclusion:             n/a"),
    }
    println!("  Exclusion cap:         {}", format_usd(exclusion.max_exclusion_cap));
    println!("  Excluded gain:         {}", format_usd(exclusion.actual_exclusion));
    println!("  Taxable gain:          {}", format_usd(exclusion.taxable_gain));
    println!();

    println!(
        "FEDERAL TAX ({}: {} capital gains + {} NIIT)",
        format_rate(federal.rate),
        format_rate(LONG_TERM_CAPITAL_GAINS_RATE),
        format_rate(NET_INVESTMENT_INCOME_TAX_RATE)
    );
    println!("  Without QSBS:          {}", format_usd(federal.tax_without_qsbs));
    println!("  With QSBS:             {}", format_usd(federal.tax_with_qsbs));
    println!("  Savings:               {}", format_usd(federal.savings));
    println!();

    match &report.state_tax {
        StateTax::Computed(state) => {
            println!(
                "STATE TAX ({}, {}, {})",
                state.name,
                state.conformity.display().to_lowercase(),
                format_rate(state.top_rate)
            );
            println!("  Without QSBS:          {}", format_usd(state.tax_without_qsbs));
            println!("  With QSBS:             {}", format_usd(state.tax_with_qsbs));
            println!("  Savings:               {}", format_usd(state.savings));
        }
        StateTax::UnknownState { code } => {
            println!("STATE TAX");
            println!("  Unknown state '{}': select a valid state.", code);
        }
    }
    println!();

    println!("TOTAL");
    println!("  Tax savings:           {}", format_usd(report.total_savings));
    println!("  Tax owed with QSBS:    {}", format_usd(report.total_tax_owed));

    if !report.warnings.is_empty() {
        println!();
        println!("\u{26A0} {} warning(s):", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {}", warning.message());
        }
    }

    println!();
    println!("{}", federal.disclaimer);
}
