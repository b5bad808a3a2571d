use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::states::{lookup_state, Conformity, StateConformityEntry};
use crate::scenario::{Scenario, StockType};

/// Floor of the per-issuer exclusion cap
pub const EXCLUSION_CAP_FLOOR: Decimal = dec!(10000000);
/// The cap is the greater of the floor or this multiple of cost basis
pub const EXCLUSION_CAP_BASIS_MULTIPLE: Decimal = dec!(10);

pub const LONG_TERM_CAPITAL_GAINS_RATE: Decimal = dec!(0.20);
pub const NET_INVESTMENT_INCOME_TAX_RATE: Decimal = dec!(0.038);
/// Top long-term capital gains rate plus NIIT
pub const FEDERAL_EFFECTIVE_RATE: Decimal = dec!(0.238);

pub const DISCLAIMER: &str = "Estimates use the top federal long-term capital gains rate \
    (20%) plus the 3.8% net investment income tax and each state's top marginal rate. \
    They are not tax advice; actual liability depends on your full return.";

/// Share of the gain excluded, fixed by when the stock was acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionTier {
    /// Acquired before 18 February 2009
    Half,
    /// Acquired 18 February 2009 through 27 September 2010
    ThreeQuarters,
    /// Acquired after 27 September 2010
    Full,
}

impl ExclusionTier {
    pub fn for_acquisition_date(acquired: NaiveDate) -> Self {
        let ymd = (acquired.year(), acquired.month(), acquired.day());
        if ymd < (2009, 2, 18) {
            ExclusionTier::Half
        } else if ymd <= (2010, 9, 27) {
            ExclusionTier::ThreeQuarters
        } else {
            ExclusionTier::Full
        }
    }

    pub fn percent(&self) -> Decimal {
        match self {
            ExclusionTier::Half => dec!(0.5),
            ExclusionTier::ThreeQuarters => dec!(0.75),
            ExclusionTier::Full => dec!(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExclusionResult {
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub gain: Decimal,
    /// Absent when there is no acquisition date to choose a tier from
    pub tier: Option<ExclusionTier>,
    /// Date the tier was chosen from
    #[schemars(with = "Option<String>")]
    pub tier_date: Option<NaiveDate>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub exclusion_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub max_exclusion_cap: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub actual_exclusion: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub taxable_gain: Decimal,
    pub is_fully_excluded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FederalTaxResult {
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub tax_without_qsbs: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub tax_with_qsbs: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub savings: Decimal,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateTaxResult {
    pub code: String,
    pub name: String,
    pub conformity: Conformity,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub top_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub tax_without_qsbs: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub tax_with_qsbs: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub savings: Decimal,
}

/// State side of the estimate. An unknown code is reported, never guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StateTax {
    Computed(StateTaxResult),
    UnknownState { code: String },
}

impl StateTax {
    pub fn savings(&self) -> Decimal {
        match self {
            StateTax::Computed(result) => result.savings,
            StateTax::UnknownState { .. } => Decimal::ZERO,
        }
    }

    pub fn tax_with_qsbs(&self) -> Decimal {
        match self {
            StateTax::Computed(result) => result.tax_with_qsbs,
            StateTax::UnknownState { .. } => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExclusionAndTax {
    pub exclusion: ExclusionResult,
    pub federal_tax: FederalTaxResult,
    pub state_tax: StateTax,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub total_savings: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub total_tax_owed: Decimal,
}

/// Greater of $10M or ten times basis. Saturates at `Decimal::MAX`.
pub fn max_exclusion_cap(cost_basis: Decimal) -> Decimal {
    let multiple = cost_basis
        .checked_mul(EXCLUSION_CAP_BASIS_MULTIPLE)
        .unwrap_or(Decimal::MAX);
    EXCLUSION_CAP_FLOOR.max(multiple)
}

pub fn compute_exclusion(
    cost_basis: Decimal,
    expected_sale_value: Decimal,
    tier_date: Option<NaiveDate>,
) -> ExclusionResult {
    let gain = (expected_sale_value - cost_basis).max(Decimal::ZERO);
    let tier = tier_date.map(ExclusionTier::for_acquisition_date);
    let exclusion_percent = tier.map_or(Decimal::ZERO, |t| t.percent());
    let cap = max_exclusion_cap(cost_basis);
    let actual_exclusion = (gain * exclusion_percent).min(cap);
    let taxable_gain = (gain - actual_exclusion).max(Decimal::ZERO);

    ExclusionResult {
        gain,
        tier,
        tier_date,
        exclusion_percent,
        max_exclusion_cap: cap,
        actual_exclusion,
        taxable_gain,
        is_fully_excluded: taxable_gain.is_zero(),
    }
}

pub fn compute_federal_tax(exclusion: &ExclusionResult) -> FederalTaxResult {
    let tax_without_qsbs = (exclusion.gain * FEDERAL_EFFECTIVE_RATE).round_dp(2);
    let tax_with_qsbs = (exclusion.taxable_gain * FEDERAL_EFFECTIVE_RATE).round_dp(2);
    FederalTaxResult {
        rate: FEDERAL_EFFECTIVE_RATE,
        tax_without_qsbs,
        tax_with_qsbs,
        savings: tax_without_qsbs - tax_with_qsbs,
        disclaimer: DISCLAIMER.to_string(),
    }
}

pub fn compute_state_tax(state: &StateConformityEntry, exclusion: &ExclusionResult) -> StateTaxResult {
    let rate = state.top_rate;
    let full_gain_tax = (exclusion.gain * rate).round_dp(2);
    let (tax_without_qsbs, tax_with_qsbs) = match state.conformity {
        Conformity::NoIncomeTax => (Decimal::ZERO, Decimal::ZERO),
        // the federal exclusion does not reduce state tax
        Conformity::NonConforming => (full_gain_tax, full_gain_tax),
        Conformity::Full => (full_gain_tax, (exclusion.taxable_gain * rate).round_dp(2)),
    };

    StateTaxResult {
        code: state.code.to_string(),
        name: state.name.to_string(),
        conformity: state.conformity,
        top_rate: rate,
        tax_without_qsbs,
        tax_with_qsbs,
        savings: tax_without_qsbs - tax_with_qsbs,
    }
}

/// Exclusion, federal and state tax for a scenario whose holding period
/// started on `start_date`.
///
/// The exclusion tier follows the acquisition date. Inherited stock has none,
/// so `today` stands in; any other scenario without a start date gets no
/// exclusion at all.
pub fn compute_exclusion_and_tax(
    scenario: &Scenario,
    start_date: Option<NaiveDate>,
    today: NaiveDate,
) -> ExclusionAndTax {
    let tier_date = start_date.or(match scenario.stock_type {
        StockType::Inheritance => Some(today),
        _ => None,
    });

    let exclusion = compute_exclusion(scenario.cost_basis, scenario.expected_sale_value, tier_date);
    let federal_tax = compute_federal_tax(&exclusion);
    let state_tax = match lookup_state(&scenario.state_code) {
        Some(state) => StateTax::Computed(compute_state_tax(state, &exclusion)),
        None => StateTax::UnknownState {
            code: scenario.state_code.trim().to_string(),
        },
    };

    ExclusionAndTax {
        total_savings: federal_tax.savings + state_tax.savings(),
        total_tax_owed: federal_tax.tax_with_qsbs + state_tax.tax_with_qsbs(),
        exclusion,
        federal_tax,
        state_tax,
    }
}
