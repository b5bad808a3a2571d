use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether a state follows the federal QSBS exclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Conformity {
    /// State excludes the same gain as the federal return
    Full,
    /// State taxes the full gain regardless of the federal exclusion
    #[serde(rename = "none")]
    NonConforming,
    NoIncomeTax,
}

impl Conformity {
    pub fn display(&self) -> &'static str {
        match self {
            Conformity::Full => "Conforms",
            Conformity::NonConforming => "Does not conform",
            Conformity::NoIncomeTax => "No income tax",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateConformityEntry {
    pub code: &'static str,
    pub name: &'static str,
    pub conformity: Conformity,
    /// Top marginal income tax rate, as a fraction
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub top_rate: Decimal,
}

const fn entry(
    code: &'static str,
    name: &'static str,
    conformity: Conformity,
    top_rate: Decimal,
) -> StateConformityEntry {
    StateConformityEntry {
        code,
        name,
        conformity,
        top_rate,
    }
}

use Conformity::{Full, NoIncomeTax, NonConforming};

// Sorted by code for binary search.
static STATES: [StateConformityEntry; 51] = [
    entry("AK", "Alaska", NoIncomeTax, dec!(0)),
    entry("AL", "Alabama", NonConforming, dec!(0.05)),
    entry("AR", "Arkansas", Full, dec!(0.039)),
    entry("AZ", "Arizona", Full, dec!(0.025)),
    entry("CA", "California", NonConforming, dec!(0.133)),
    entry("CO", "Colorado", Full, dec!(0.044)),
    entry("CT", "Connecticut", Full, dec!(0.0699)),
    entry("DC", "District of Columbia", Full, dec!(0.1075)),
    entry("DE", "Delaware", Full, dec!(0.066)),
    entry("FL", "Florida", NoIncomeTax, dec!(0)),
    entry("GA", "Georgia", Full, dec!(0.0539)),
    entry("HI", "Hawaii", Full, dec!(0.11)),
    entry("IA", "Iowa", Full, dec!(0.038)),
    entry("ID", "Idaho", Full, dec!(0.053)),
    entry("IL", "Illinois", Full, dec!(0.0495)),
    entry("IN", "Indiana", Full, dec!(0.03)),
    entry("KS", "Kansas", Full, dec!(0.0558)),
    entry("KY", "Kentucky", Full, dec!(0.04)),
    entry("LA", "Louisiana", Full, dec!(0.03)),
    entry("MA", "Massachusetts", Full, dec!(0.09)),
    entry("MD", "Maryland", Full, dec!(0.0575)),
    entry("ME", "Maine", Full, dec!(0.0715)),
    entry("MI", "Michigan", Full, dec!(0.0425)),
    entry("MN", "Minnesota", Full, dec!(0.0985)),
    entry("MO", "Missouri", Full, dec!(0.047)),
    entry("MS", "Mississippi", NonConforming, dec!(0.044)),
    entry("MT", "Montana", Full, dec!(0.059)),
    entry("NC", "North Carolina", Full, dec!(0.0425)),
    entry("ND", "North Dakota", Full, dec!(0.025)),
    entry("NE", "Nebraska", Full, dec!(0.052)),
    entry("NH", "New Hampshire", NoIncomeTax, dec!(0)),
    entry("NJ", "New Jersey", Full, dec!(0.1075)),
    entry("NM", "New Mexico", Full, dec!(0.059)),
    entry("NV", "Nevada", NoIncomeTax, dec!(0)),
    entry("NY", "New York", Full, dec!(0.109)),
    entry("OH", "Ohio", Full, dec!(0.035)),
    entry("OK", "Oklahoma", Full, dec!(0.0475)),
    entry("OR", "Oregon", Full, dec!(0.099)),
    entry("PA", "Pennsylvania", NonConforming, dec!(0.0307)),
    entry("RI", "Rhode Island", Full, dec!(0.0599)),
    entry("SC", "South Carolina", Full, dec!(0.062)),
    entry("SD", "South Dakota", NoIncomeTax, dec!(0)),
    entry("TN", "Tennessee", NoIncomeTax, dec!(0)),
    entry("TX", "Texas", NoIncomeTax, dec!(0)),
    entry("UT", "Utah", Full, dec!(0.0455)),
    entry("VA", "Virginia", Full, dec!(0.0575)),
    entry("VT", "Vermont", Full, dec!(0.0875)),
    entry("WA", "Washington", NoIncomeTax, dec!(0)),
    entry("WI", "Wisconsin", Full, dec!(0.0765)),
    entry("WV", "West Virginia", Full, dec!(0.0482)),
    entry("WY", "Wyoming", NoIncomeTax, dec!(0)),
];

/// Look up a state (or DC) by its two-letter code, ignoring case and
/// surrounding whitespace. `None` means the code is not in the table.
pub fn lookup_state(code: &str) -> Option<&'static StateConformityEntry> {
    let code = code.trim().to_ascii_uppercase();
    STATES
        .binary_search_by(|entry| entry.code.cmp(code.as_str()))
        .ok()
        .map(|index| &STATES[index])
}

/// Every entry, ordered by code
pub fn all_states() -> &'static [StateConformityEntry] {
    &STATES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        assert!(STATES.windows(2).all(|w| w[0].code < w[1].code));
    }

    #[test]
    fn covers_fifty_states_and_dc() {
        assert_eq!(all_states().len(), 51);
        assert!(lookup_state("DC").is_some());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let ca = lookup_state(" ca ").unwrap();
        assert_eq!(ca.code, "CA");
        assert_eq!(ca.name, "California");
        assert_eq!(ca.conformity, Conformity::NonConforming);
        assert_eq!(ca.top_rate, dec!(0.133));
    }

    #[test]
    fn unknown_codes_are_not_found() {
        assert_eq!(lookup_state("XX"), None);
        assert_eq!(lookup_state("PR"), None);
        assert_eq!(lookup_state(""), None);
    }

    #[test]
    fn no_income_tax_states_have_zero_rate() {
        for state in all_states() {
            if state.conformity == Conformity::NoIncomeTax {
                assert!(state.top_rate.is_zero(), "{} has a rate", state.code);
            } else {
                assert!(state.top_rate > Decimal::ZERO, "{} has no rate", state.code);
            }
        }
    }

    #[test]
    fn non_conforming_states() {
        let codes: Vec<_> = all_states()
            .iter()
            .filter(|s| s.conformity == Conformity::NonConforming)
            .map(|s| s.code)
            .collect();
        assert_eq!(codes, vec!["AL", "CA", "MS", "PA"]);
    }

    #[test]
    fn conformity_serializes_as_kebab_case() {
        assert_eq!(serde_json::to_string(&Conformity::Full).unwrap(), "\"full\"");
        assert_eq!(
            serde_json::to_string(&Conformity::NonConforming).unwrap(),
            "\"none\""
        );
        assert_eq!(
            serde_json::to_string(&Conformity::NoIncomeTax).unwrap(),
            "\"no-income-tax\""
        );
    }
}
