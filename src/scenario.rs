use chrono::NaiveDate;
use qsbs_derive::CsvColumns;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::utils::default_sale_date;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("unknown stock type: {0}")]
    UnknownStockType(String),
    #[error("unknown acquisition method: {0}")]
    UnknownAcquisitionMethod(String),
    #[error("invalid 83(b) election status: {0} (expected filed, not-filed or unknown)")]
    InvalidElection(String),
    #[error("{field} must not be negative: {value}")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("invalid state code: '{0}' (expected a two-letter code)")]
    InvalidStateCode(String),
    #[error("csv row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// How the holder came to own the stock. Decides which date starts the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StockType {
    CommonStock,
    IncentiveStockOption,
    NonqualifiedStockOption,
    RestrictedStock,
    RestrictedStockUnit,
    ConvertedSafeOrNote,
    Gift,
    Inheritance,
}

impl StockType {
    pub const ALL: [StockType; 8] = [
        StockType::CommonStock,
        StockType::IncentiveStockOption,
        StockType::NonqualifiedStockOption,
        StockType::RestrictedStock,
        StockType::RestrictedStockUnit,
        StockType::ConvertedSafeOrNote,
        StockType::Gift,
        StockType::Inheritance,
    ];

    /// Wire name, as used in JSON and CSV
    pub fn as_str(&self) -> &'static str {
        match self {
            StockType::CommonStock => "common-stock",
            StockType::IncentiveStockOption => "incentive-stock-option",
            StockType::NonqualifiedStockOption => "nonqualified-stock-option",
            StockType::RestrictedStock => "restricted-stock",
            StockType::RestrictedStockUnit => "restricted-stock-unit",
            StockType::ConvertedSafeOrNote => "converted-safe-or-note",
            StockType::Gift => "gift",
            StockType::Inheritance => "inheritance",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            StockType::CommonStock => "Common stock",
            StockType::IncentiveStockOption => "Incentive stock option (ISO)",
            StockType::NonqualifiedStockOption => "Nonqualified stock option (NSO)",
            StockType::RestrictedStock => "Restricted stock (RSA)",
            StockType::RestrictedStockUnit => "Restricted stock unit (RSU)",
            StockType::ConvertedSafeOrNote => "Converted SAFE or convertible note",
            StockType::Gift => "Gift",
            StockType::Inheritance => "Inheritance",
        }
    }

    /// Acquisition methods that describe this kind of stock
    pub fn expected_methods(&self) -> &'static [AcquisitionMethod] {
        use AcquisitionMethod::*;
        match self {
            StockType::CommonStock => &[Purchased, ReceivedForServices],
            StockType::IncentiveStockOption | StockType::NonqualifiedStockOption => &[Exercised],
            StockType::RestrictedStock | StockType::RestrictedStockUnit => {
                &[ReceivedForServices, Purchased]
            }
            StockType::ConvertedSafeOrNote => &[Converted],
            StockType::Gift => &[Gifted],
            StockType::Inheritance => &[Inherited],
        }
    }
}

impl fmt::Display for StockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockType {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        let stock_type = match normalized.as_str() {
            "iso" => StockType::IncentiveStockOption,
            "nso" | "nqso" => StockType::NonqualifiedStockOption,
            "rsa" => StockType::RestrictedStock,
            "rsu" => StockType::RestrictedStockUnit,
            "safe" | "convertible-note" => StockType::ConvertedSafeOrNote,
            other => StockType::ALL
                .into_iter()
                .find(|t| t.as_str() == other)
                .ok_or_else(|| ScenarioError::UnknownStockType(s.to_string()))?,
        };
        Ok(stock_type)
    }
}

/// Descriptive only; never drives the holding period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionMethod {
    Purchased,
    Exercised,
    ReceivedForServices,
    Converted,
    Gifted,
    Inherited,
}

impl AcquisitionMethod {
    pub const ALL: [AcquisitionMethod; 6] = [
        AcquisitionMethod::Purchased,
        AcquisitionMethod::Exercised,
        AcquisitionMethod::ReceivedForServices,
        AcquisitionMethod::Converted,
        AcquisitionMethod::Gifted,
        AcquisitionMethod::Inherited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionMethod::Purchased => "purchased",
            AcquisitionMethod::Exercised => "exercised",
            AcquisitionMethod::ReceivedForServices => "received-for-services",
            AcquisitionMethod::Converted => "converted",
            AcquisitionMethod::Gifted => "gifted",
            AcquisitionMethod::Inherited => "inherited",
        }
    }
}

impl fmt::Display for AcquisitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcquisitionMethod {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        AcquisitionMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ScenarioError::UnknownAcquisitionMethod(s.to_string()))
    }
}

/// Whether an 83(b) election was filed for restricted stock.
///
/// Accepts `true`/`false` as well as the kebab-case names on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Election83b {
    Filed,
    NotFiled,
    #[default]
    Unknown,
}

impl Election83b {
    pub fn as_str(&self) -> &'static str {
        match self {
            Election83b::Filed => "filed",
            Election83b::NotFiled => "not-filed",
            Election83b::Unknown => "unknown",
        }
    }
}

impl From<bool> for Election83b {
    fn from(filed: bool) -> Self {
        if filed {
            Election83b::Filed
        } else {
            Election83b::NotFiled
        }
    }
}

impl FromStr for Election83b {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "filed" | "true" | "yes" => Ok(Election83b::Filed),
            "not-filed" | "false" | "no" => Ok(Election83b::NotFiled),
            "unknown" | "" => Ok(Election83b::Unknown),
            _ => Err(ScenarioError::InvalidElection(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Election83b {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(filed) => Ok(filed.into()),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// The dated fields a scenario may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    GrantDate,
    ExerciseDate,
    VestingDate,
    PurchaseDate,
    ConversionDate,
    DonorAcquisitionDate,
}

impl DateField {
    pub const ALL: [DateField; 6] = [
        DateField::GrantDate,
        DateField::ExerciseDate,
        DateField::VestingDate,
        DateField::PurchaseDate,
        DateField::ConversionDate,
        DateField::DonorAcquisitionDate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DateField::GrantDate => "grant date",
            DateField::ExerciseDate => "exercise date",
            DateField::VestingDate => "vesting date",
            DateField::PurchaseDate => "purchase date",
            DateField::ConversionDate => "conversion date",
            DateField::DonorAcquisitionDate => "donor's acquisition date",
        }
    }
}

/// A single stock position to evaluate.
///
/// Amounts are in US dollars. Only the date fields relevant to `stock_type`
/// are consulted; the rest are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    pub stock_type: StockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_method: Option<AcquisitionMethod>,
    /// 83(b) election status (restricted stock only)
    #[serde(default)]
    pub election_83b: Election83b,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vesting_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_date: Option<NaiveDate>,
    /// Date the donor acquired gifted stock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_acquisition_date: Option<NaiveDate>,
    /// Planned or actual sale date; one year from today when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<NaiveDate>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub cost_basis: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub expected_sale_value: Decimal,
    pub state_code: String,
}

impl Scenario {
    pub fn new(
        stock_type: StockType,
        cost_basis: Decimal,
        expected_sale_value: Decimal,
        state_code: impl Into<String>,
    ) -> Self {
        Scenario {
            stock_type,
            acquisition_method: None,
            election_83b: Election83b::Unknown,
            grant_date: None,
            exercise_date: None,
            vesting_date: None,
            purchase_date: None,
            conversion_date: None,
            donor_acquisition_date: None,
            sale_date: None,
            cost_basis,
            expected_sale_value,
            state_code: state_code.into(),
        }
    }

    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::GrantDate => self.grant_date,
            DateField::ExerciseDate => self.exercise_date,
            DateField::VestingDate => self.vesting_date,
            DateField::PurchaseDate => self.purchase_date,
            DateField::ConversionDate => self.conversion_date,
            DateField::DonorAcquisitionDate => self.donor_acquisition_date,
        }
    }

    pub fn set_date(&mut self, field: DateField, date: Option<NaiveDate>) {
        let slot = match field {
            DateField::GrantDate => &mut self.grant_date,
            DateField::ExerciseDate => &mut self.exercise_date,
            DateField::VestingDate => &mut self.vesting_date,
            DateField::PurchaseDate => &mut self.purchase_date,
            DateField::ConversionDate => &mut self.conversion_date,
            DateField::DonorAcquisitionDate => &mut self.donor_acquisition_date,
        };
        *slot = date;
    }

    #[cfg(test)]
    pub fn with_date(mut self, field: DateField, date: NaiveDate) -> Self {
        self.set_date(field, Some(date));
        self
    }

    #[cfg(test)]
    pub fn with_sale_date(mut self, date: NaiveDate) -> Self {
        self.sale_date = Some(date);
        self
    }

    pub fn with_election(mut self, election: Election83b) -> Self {
        self.election_83b = election;
        self
    }

    pub fn effective_sale_date(&self, today: NaiveDate) -> NaiveDate {
        self.sale_date.unwrap_or_else(|| default_sale_date(today))
    }

    /// Input boundary checks. The calculator itself assumes these hold.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.cost_basis.is_sign_negative() && !self.cost_basis.is_zero() {
            return Err(ScenarioError::NegativeAmount {
                field: "cost_basis",
                value: self.cost_basis,
            });
        }
        if self.expected_sale_value.is_sign_negative() && !self.expected_sale_value.is_zero() {
            return Err(ScenarioError::NegativeAmount {
                field: "expected_sale_value",
                value: self.expected_sale_value,
            });
        }
        let code = self.state_code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ScenarioError::InvalidStateCode(self.state_code.clone()));
        }
        Ok(())
    }
}

/// Column description produced by `#[derive(CsvColumns)]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumn {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// One CSV row of batch input
#[derive(Debug, Clone, Serialize, Deserialize, CsvColumns)]
pub struct ScenarioRecord {
    /// Free-form label echoed in the output
    #[serde(default)]
    pub id: Option<String>,
    /// common-stock, incentive-stock-option, nonqualified-stock-option, restricted-stock, restricted-stock-unit, converted-safe-or-note, gift, inheritance
    pub stock_type: StockType,
    /// purchased, exercised, received-for-services, converted, gifted, inherited
    #[serde(default)]
    pub acquisition_method: Option<AcquisitionMethod>,
    /// filed, not-filed or unknown (true/false accepted)
    #[serde(rename = "election_83b", default)]
    pub election: Option<Election83b>,
    /// Grant date (YYYY-MM-DD)
    #[serde(default)]
    pub grant_date: Option<NaiveDate>,
    /// Option exercise date (YYYY-MM-DD)
    #[serde(default)]
    pub exercise_date: Option<NaiveDate>,
    /// Vesting date (YYYY-MM-DD)
    #[serde(default)]
    pub vesting_date: Option<NaiveDate>,
    /// Purchase date (YYYY-MM-DD)
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    /// SAFE or note conversion date (YYYY-MM-DD)
    #[serde(default)]
    pub conversion_date: Option<NaiveDate>,
    /// Donor's acquisition date for gifted stock (YYYY-MM-DD)
    #[serde(default)]
    pub donor_acquisition_date: Option<NaiveDate>,
    /// Sale date (YYYY-MM-DD); one year from today if empty
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    /// Amount paid or included in income, in USD
    pub cost_basis: Decimal,
    /// Expected sale proceeds, in USD
    pub expected_sale_value: Decimal,
    /// Two-letter state code (or DC)
    pub state_code: String,
}

impl ScenarioRecord {
    pub fn into_parts(self) -> (Option<String>, Scenario) {
        let scenario = Scenario {
            stock_type: self.stock_type,
            acquisition_method: self.acquisition_method,
            election_83b: self.election.unwrap_or_default(),
            grant_date: self.grant_date,
            exercise_date: self.exercise_date,
            vesting_date: self.vesting_date,
            purchase_date: self.purchase_date,
            conversion_date: self.conversion_date,
            donor_acquisition_date: self.donor_acquisition_date,
            sale_date: self.sale_date,
            cost_basis: self.cost_basis,
            expected_sale_value: self.expected_sale_value,
            state_code: self.state_code,
        };
        (self.id, scenario)
    }
}

/// A scenario read from input, with an optional label for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledScenario {
    pub id: Option<String>,
    pub scenario: Scenario,
}

/// JSON input: a single scenario or a `{ "scenarios": [...] }` document
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScenarioInput {
    Many { scenarios: Vec<Scenario> },
    One(Scenario),
}

pub fn read_scenarios_json<R: Read>(reader: R) -> Result<Vec<LabelledScenario>, ScenarioError> {
    let input: ScenarioInput = serde_json::from_reader(reader)?;
    let scenarios = match input {
        ScenarioInput::Many { scenarios } => scenarios,
        ScenarioInput::One(scenario) => vec![scenario],
    };
    let scenarios = scenarios
        .into_iter()
        .map(|scenario| LabelledScenario { id: None, scenario })
        .collect::<Vec<_>>();
    log::info!("Read {} scenario(s) from json", scenarios.len());
    Ok(scenarios)
}

pub fn read_scenarios_csv<R: Read>(reader: R) -> Result<Vec<LabelledScenario>, ScenarioError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut scenarios = Vec::new();
    for (index, result) in rdr.deserialize::<ScenarioRecord>().enumerate() {
        // header is row 1
        let record = result.map_err(|source| ScenarioError::Csv {
            row: index + 2,
            source,
        })?;
        let (id, scenario) = record.into_parts();
        scenarios.push(LabelledScenario { id, scenario });
    }
    log::info!("Read {} csv records", scenarios.len());
    Ok(scenarios)
}
