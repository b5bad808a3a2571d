use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scenario::{AcquisitionMethod, DateField, StockType};
use crate::utils::display_date;

/// Things worth telling the user that do not stop the calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Warning {
    /// A date was supplied that does not affect this stock type's holding period.
    IgnoredDate {
        field: DateField,
        #[schemars(with = "String")]
        date: NaiveDate,
    },
    /// The acquisition method does not describe the stock type.
    InconsistentAcquisitionMethod {
        stock_type: StockType,
        method: AcquisitionMethod,
    },
    /// No acquisition date to pick an exclusion percentage, so none was applied.
    NoAcquisitionDate,
    /// State code is not in the conformity table; state tax was not estimated.
    UnknownState { code: String },
    /// The planned sale happens before the holding period completes.
    SaleBeforeQualification {
        #[schemars(with = "String")]
        sale_date: NaiveDate,
        #[schemars(with = "String")]
        qualification_date: NaiveDate,
    },
    /// No sale date was given, so one year from today was assumed.
    AssumedSaleDate {
        #[schemars(with = "String")]
        sale_date: NaiveDate,
    },
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Warning::IgnoredDate { field, date } => format!(
                "The {} ({}) does not affect the holding period for this stock type.",
                field.label(),
                display_date(*date)
            ),
            Warning::InconsistentAcquisitionMethod { stock_type, method } => format!(
                "Acquisition method '{}' is unusual for {}.",
                method,
                stock_type.display().to_lowercase()
            ),
            Warning::NoAcquisitionDate => {
                "No acquisition date is known, so no exclusion was applied.".to_string()
            }
            Warning::UnknownState { code } => {
                format!("'{}' is not a recognised state code; select a valid state.", code)
            }
            Warning::SaleBeforeQualification {
                sale_date,
                qualification_date,
            } => format!(
                "Selling on {} is before the holding period completes on {}.",
                display_date(*sale_date),
                display_date(*qualification_date)
            ),
            Warning::AssumedSaleDate { sale_date } => format!(
                "No sale date given; assuming {}.",
                display_date(*sale_date)
            ),
        }
    }
}
