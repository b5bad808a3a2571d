pub mod exclusion;
pub mod holding;
pub mod states;
pub mod warnings;

pub use exclusion::{
    compute_exclusion_and_tax, ExclusionAndTax, ExclusionResult, FederalTaxResult, StateTax,
};
pub use holding::{resolve_holding_period, HoldingPeriodResult, HoldingStatus};
pub use states::{all_states, lookup_state, Conformity, StateConformityEntry};
pub use warnings::Warning;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;

/// Everything computed for one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QsbsReport {
    pub scenario: Scenario,
    /// Date the calculation was evaluated as of
    #[schemars(with = "String")]
    pub today: NaiveDate,
    /// Sale date used, after defaulting
    #[schemars(with = "String")]
    pub sale_date: NaiveDate,
    pub holding_period: HoldingPeriodResult,
    pub exclusion: ExclusionResult,
    pub federal_tax: FederalTaxResult,
    pub state_tax: StateTax,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub total_savings: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schemars(with = "f64")]
    pub total_tax_owed: Decimal,
    pub warnings: Vec<Warning>,
}

/// Resolve the holding period and feed its start date into the tax calculation.
pub fn calculate(scenario: &Scenario, today: NaiveDate) -> QsbsReport {
    let holding_period = resolve_holding_period(scenario, today);
    let ExclusionAndTax {
        exclusion,
        federal_tax,
        state_tax,
        total_savings,
        total_tax_owed,
    } = compute_exclusion_and_tax(scenario, holding_period.start_date, today);

    let mut warnings = scenario_warnings(scenario);
    let sale_date = scenario.effective_sale_date(today);
    if scenario.sale_date.is_none() {
        warnings.push(Warning::AssumedSaleDate { sale_date });
    }
    if let (true, Some(qualification_date)) = (
        holding_period.sale_date_before_qualification,
        holding_period.qualification_date,
    ) {
        warnings.push(Warning::SaleBeforeQualification {
            sale_date,
            qualification_date,
        });
    }
    if exclusion.tier.is_none() {
        warnings.push(Warning::NoAcquisitionDate);
    }
    if let StateTax::UnknownState { code } = &state_tax {
        warnings.push(Warning::UnknownState { code: code.clone() });
    }

    QsbsReport {
        scenario: scenario.clone(),
        today,
        sale_date,
        holding_period,
        exclusion,
        federal_tax,
        state_tax,
        total_savings,
        total_tax_owed,
        warnings,
    }
}

/// Input-shape warnings: ignored dates and an unusual acquisition method
pub fn scenario_warnings(scenario: &Scenario) -> Vec<Warning> {
    let relevant = holding::relevant_date_fields(scenario.stock_type);
    let mut warnings: Vec<Warning> = crate::scenario::DateField::ALL
        .into_iter()
        .filter(|field| !relevant.contains(field))
        .filter_map(|field| {
            scenario
                .date(field)
                .map(|date| Warning::IgnoredDate { field, date })
        })
        .collect();

    if let Some(method) = scenario.acquisition_method {
        if !scenario.stock_type.expected_methods().contains(&method) {
            warnings.push(Warning::InconsistentAcquisitionMethod {
                stock_type: scenario.stock_type,
                method,
            });
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::exclusion::ExclusionTier;
    use crate::scenario::{AcquisitionMethod, DateField, Election83b, StockType};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn iso_in_california() -> Scenario {
        let mut scenario = Scenario::new(
            StockType::IncentiveStockOption,
            dec!(10000),
            dec!(2010000),
            "CA",
        )
        .with_date(DateField::ExerciseDate, date(2019, 6, 1))
        .with_sale_date(date(2025, 1, 1));
        scenario.acquisition_method = Some(AcquisitionMethod::Exercised);
        scenario
    }

    #[test]
    fn iso_exercised_in_california_end_to_end() {
        let report = calculate(&iso_in_california(), date(2026, 10, 19));

        assert_eq!(report.holding_period.qualification_date, Some(date(2024, 6, 2)));
        assert!(report.holding_period.is_qualified);
        assert!(!report.holding_period.sale_date_before_qualification);

        assert_eq!(report.exclusion.gain, dec!(2000000));
        assert_eq!(report.exclusion.tier, Some(ExclusionTier::Full));
        assert_eq!(report.exclusion.max_exclusion_cap, dec!(10000000));
        assert_eq!(report.exclusion.actual_exclusion, dec!(2000000));
        assert!(report.exclusion.is_fully_excluded);

        assert_eq!(report.federal_tax.tax_without_qsbs, dec!(476000));
        assert_eq!(report.federal_tax.tax_with_qsbs, Decimal::ZERO);
        assert_eq!(report.federal_tax.savings, dec!(476000));

        match &report.state_tax {
            StateTax::Computed(state) => {
                assert_eq!(state.tax_without_qsbs, dec!(266000));
                assert_eq!(state.tax_with_qsbs, dec!(266000));
                assert_eq!(state.savings, Decimal::ZERO);
            }
            other => panic!("expected computed state tax, got {:?}", other),
        }

        assert_eq!(report.total_savings, dec!(476000));
        assert_eq!(report.total_tax_owed, dec!(266000));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn qualified_as_of_any_day_after_qualification() {
        for today in [date(2024, 6, 2), date(2024, 6, 3), date(2030, 1, 1)] {
            assert!(calculate(&iso_in_california(), today).holding_period.is_qualified);
        }
        assert!(!calculate(&iso_in_california(), date(2024, 6, 1)).holding_period.is_qualified);
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = calculate(&iso_in_california(), date(2026, 10, 19));
        let json = serde_json::to_string(&report).unwrap();
        let back: QsbsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn report_amounts_serialize_as_numbers() {
        let report = calculate(&iso_in_california(), date(2026, 10, 19));
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["total_savings"].is_number());
        assert_eq!(json["total_savings"].as_f64(), Some(476000.0));
        assert_eq!(json["total_tax_owed"].as_f64(), Some(266000.0));
        assert_eq!(json["exclusion"]["gain"].as_f64(), Some(2000000.0));
        assert_eq!(json["exclusion"]["exclusion_percent"].as_f64(), Some(1.0));
        assert_eq!(json["federal_tax"]["rate"].as_f64(), Some(0.238));
        assert_eq!(json["state_tax"]["top_rate"].as_f64(), Some(0.133));
        assert_eq!(json["scenario"]["cost_basis"].as_f64(), Some(10000.0));
    }

    #[test]
    fn warnings_for_ignored_dates_and_method() {
        let mut scenario = iso_in_california().with_date(DateField::GrantDate, date(2015, 1, 1));
        scenario.acquisition_method = Some(AcquisitionMethod::Gifted);
        let warnings = scenario_warnings(&scenario);
        assert_eq!(
            warnings,
            vec![
                Warning::IgnoredDate {
                    field: DateField::GrantDate,
                    date: date(2015, 1, 1)
                },
                Warning::InconsistentAcquisitionMethod {
                    stock_type: StockType::IncentiveStockOption,
                    method: AcquisitionMethod::Gifted,
                },
            ]
        );
    }

    #[test]
    fn restricted_stock_dates_are_both_relevant() {
        let scenario = Scenario::new(StockType::RestrictedStock, dec!(1), dec!(2), "NY")
            .with_election(Election83b::Filed)
            .with_date(DateField::GrantDate, date(2015, 1, 1))
            .with_date(DateField::VestingDate, date(2019, 1, 1));
        assert!(scenario_warnings(&scenario).is_empty());
    }

    #[test]
    fn indeterminate_and_unknown_state_are_warned() {
        let scenario = Scenario::new(StockType::RestrictedStock, dec!(1), dec!(2), "XX")
            .with_date(DateField::GrantDate, date(2015, 1, 1));
        let report = calculate(&scenario, date(2026, 10, 19));
        assert_eq!(report.holding_period.status, HoldingStatus::Indeterminate);
        assert!(report.warnings.contains(&Warning::NoAcquisitionDate));
        assert!(report.warnings.contains(&Warning::UnknownState {
            code: "XX".to_string()
        }));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::AssumedSaleDate { .. })));
    }

    #[test]
    fn huge_cost_basis_does_not_overflow() {
        let huge = Decimal::from_i128_with_scale(10i128.pow(28), 0);
        let scenario = Scenario::new(StockType::CommonStock, huge, huge, "CA")
            .with_date(DateField::PurchaseDate, date(2015, 1, 1))
            .with_sale_date(date(2025, 1, 1));
        assert!(scenario.validate().is_ok());

        let report = calculate(&scenario, date(2026, 10, 19));
        assert_eq!(report.exclusion.max_exclusion_cap, Decimal::MAX);
        assert_eq!(report.exclusion.gain, Decimal::ZERO);
        assert_eq!(report.total_tax_owed, Decimal::ZERO);
    }

    #[test]
    fn early_sale_is_warned() {
        let scenario = iso_in_california().with_sale_date(date(2024, 6, 1));
        let report = calculate(&scenario, date(2026, 10, 19));
        assert!(report.holding_period.is_qualified);
        assert!(report.holding_period.sale_date_before_qualification);
        assert!(report.warnings.contains(&Warning::SaleBeforeQualification {
            sale_date: date(2024, 6, 1),
            qualification_date: date(2024, 6, 2),
        }));
    }
}
