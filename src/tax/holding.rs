use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scenario::{DateField, Election83b, Scenario, StockType};
use crate::utils::{display_date, more_than_years_after};

/// Stock must be held for more than this many years.
pub const HOLDING_PERIOD_YEARS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum HoldingStatus {
    /// Clock is running; qualification date is in the future
    Counting,
    /// Held for more than five years as of today
    Qualified,
    /// Inherited stock, treated as already satisfying the holding period
    ImmediatelyQualified,
    /// Not enough information to find the start date
    Indeterminate,
}

impl HoldingStatus {
    pub fn display(&self) -> &'static str {
        match self {
            HoldingStatus::Counting => "Holding period in progress",
            HoldingStatus::Qualified => "Qualified",
            HoldingStatus::ImmediatelyQualified => "Qualified (inherited)",
            HoldingStatus::Indeterminate => "Cannot be determined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HoldingPeriodResult {
    pub status: HoldingStatus,
    #[schemars(with = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[schemars(with = "Option<String>")]
    pub qualification_date: Option<NaiveDate>,
    pub is_qualified: bool,
    pub days_remaining: u32,
    /// Planned sale falls before the qualification date (independent of today)
    pub sale_date_before_qualification: bool,
    pub explanation: String,
}

/// Where the clock starts for a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStart {
    Date { field: DateField, date: NaiveDate },
    /// Inherited: holding period already met
    Immediate,
    /// The date this stock type needs is missing
    Missing(DateField),
    /// Restricted stock without a known 83(b) status
    UnknownElection,
}

/// Date fields that can start the clock for a stock type
pub fn relevant_date_fields(stock_type: StockType) -> &'static [DateField] {
    match stock_type {
        StockType::CommonStock => &[DateField::PurchaseDate],
        StockType::IncentiveStockOption | StockType::NonqualifiedStockOption => {
            &[DateField::ExerciseDate]
        }
        StockType::RestrictedStock => &[DateField::GrantDate, DateField::VestingDate],
        StockType::RestrictedStockUnit => &[DateField::VestingDate],
        StockType::ConvertedSafeOrNote => &[DateField::ConversionDate],
        StockType::Gift => &[DateField::DonorAcquisitionDate],
        StockType::Inheritance => &[],
    }
}

pub fn clock_start(scenario: &Scenario) -> ClockStart {
    let field = match scenario.stock_type {
        StockType::CommonStock => DateField::PurchaseDate,
        StockType::IncentiveStockOption | StockType::NonqualifiedStockOption => {
            DateField::ExerciseDate
        }
        StockType::RestrictedStock => match scenario.election_83b {
            Election83b::Filed => DateField::GrantDate,
            Election83b::NotFiled => DateField::VestingDate,
            Election83b::Unknown => return ClockStart::UnknownElection,
        },
        StockType::RestrictedStockUnit => DateField::VestingDate,
        StockType::ConvertedSafeOrNote => DateField::ConversionDate,
        StockType::Gift => DateField::DonorAcquisitionDate,
        StockType::Inheritance => return ClockStart::Immediate,
    };
    match scenario.date(field) {
        Some(date) => ClockStart::Date { field, date },
        None => ClockStart::Missing(field),
    }
}

/// Work out when the five-year clock started and where it stands as of `today`.
pub fn resolve_holding_period(scenario: &Scenario, today: NaiveDate) -> HoldingPeriodResult {
    let start = clock_start(scenario);
    let (start_date, field) = match start {
        ClockStart::Date { field, date } => (date, field),
        ClockStart::Immediate => {
            return HoldingPeriodResult {
                status: HoldingStatus::ImmediatelyQualified,
                start_date: None,
                qualification_date: None,
                is_qualified: true,
                days_remaining: 0,
                sale_date_before_qualification: false,
                explanation: "Inherited stock is treated as held for more than five years, \
                              so the holding period requirement is already met."
                    .to_string(),
            };
        }
        ClockStart::Missing(_) | ClockStart::UnknownElection => {
            return HoldingPeriodResult {
                status: HoldingStatus::Indeterminate,
                start_date: None,
                qualification_date: None,
                is_qualified: false,
                days_remaining: 0,
                sale_date_before_qualification: false,
                explanation: indeterminate_explanation(scenario.stock_type, start),
            };
        }
    };

    let qualification_date = more_than_years_after(start_date, HOLDING_PERIOD_YEARS);
    let is_qualified = today >= qualification_date;
    let days_remaining = u32::try_from((qualification_date - today).num_days().max(0))
        .unwrap_or(u32::MAX);
    let sale_date = scenario.effective_sale_date(today);

    let status_text = if is_qualified {
        format!(
            "Held for more than five years; qualified since {}.",
            display_date(qualification_date)
        )
    } else {
        format!(
            "Qualifies on {} ({} days remaining).",
            display_date(qualification_date),
            days_remaining
        )
    };

    HoldingPeriodResult {
        status: if is_qualified {
            HoldingStatus::Qualified
        } else {
            HoldingStatus::Counting
        },
        start_date: Some(start_date),
        qualification_date: Some(qualification_date),
        is_qualified,
        days_remaining,
        sale_date_before_qualification: sale_date < qualification_date,
        explanation: format!(
            "{} {}",
            start_explanation(scenario.stock_type, field, start_date),
            status_text
        ),
    }
}

fn start_explanation(stock_type: StockType, field: DateField, date: NaiveDate) -> String {
    let date = display_date(date);
    match (stock_type, field) {
        (StockType::IncentiveStockOption | StockType::NonqualifiedStockOption, _) => format!(
            "Shares acquired by exercising an option start their holding period on the \
             exercise date ({}); the grant date does not count.",
            date
        ),
        (StockType::RestrictedStock, DateField::GrantDate) => format!(
            "An 83(b) election was filed, so the holding period started at grant ({}).",
            date
        ),
        (StockType::RestrictedStock, _) => format!(
            "Without an 83(b) election the holding period starts when the shares vest ({}).",
            date
        ),
        (StockType::RestrictedStockUnit, _) => format!(
            "RSU shares are issued at vesting and cannot use an 83(b) election, so the \
             holding period started on the vesting date ({}).",
            date
        ),
        (StockType::ConvertedSafeOrNote, _) => format!(
            "Stock received when a SAFE or convertible note converts starts its holding \
             period on the conversion date ({}).",
            date
        ),
        (StockType::Gift, _) => format!(
            "Gifted stock keeps the donor's holding period, which started when the donor \
             acquired it ({}).",
            date
        ),
        (StockType::CommonStock | StockType::Inheritance, _) => {
            format!("The holding period started on the {} ({}).", field.label(), date)
        }
    }
}

fn indeterminate_explanation(stock_type: StockType, start: ClockStart) -> String {
    match start {
        ClockStart::UnknownElection => "Whether an 83(b) election was filed is unknown. \
             The holding period starts at grant if an election was filed and at vesting \
             otherwise, so it cannot be determined yet."
            .to_string(),
        ClockStart::Missing(field) => format!(
            "The {} is needed to determine the holding period for {}; the calculation \
             could not be completed.",
            field.label(),
            stock_type.display().to_lowercase()
        ),
        ClockStart::Date { .. } | ClockStart::Immediate => String::new(),
    }
}
