//! Compact query-string tokens for sharing a scenario by URL.
//!
//! A token looks like `v=1&t=iso&xd=2019-06-01&b=10000&sv=2010000&st=CA&ck=1a2b3c4d`.
//! Only populated fields are written. The trailing `ck` is the first four bytes
//! of the SHA-256 of everything before it, hex encoded.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::str::FromStr;

use crate::scenario::{AcquisitionMethod, DateField, Election83b, Scenario, StockType};

pub const TOKEN_VERSION: &str = "1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ShareTokenError {
    #[error("share token is missing its checksum")]
    MissingChecksum,
    #[error("share token checksum mismatch (expected {expected}, found {found})")]
    ChecksumMismatch { expected: String, found: String },
    #[error("unsupported share token version: {0}")]
    UnsupportedVersion(String),
    #[error("malformed share token segment: '{0}'")]
    MalformedSegment(String),
    #[error("unknown share token key: {0}")]
    UnknownKey(String),
    #[error("duplicate share token key: {0}")]
    DuplicateKey(String),
    #[error("share token is missing '{0}'")]
    MissingField(&'static str),
    #[error("invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

fn stock_type_code(stock_type: StockType) -> &'static str {
    match stock_type {
        StockType::CommonStock => "cs",
        StockType::IncentiveStockOption => "iso",
        StockType::NonqualifiedStockOption => "nso",
        StockType::RestrictedStock => "rs",
        StockType::RestrictedStockUnit => "rsu",
        StockType::ConvertedSafeOrNote => "cv",
        StockType::Gift => "gf",
        StockType::Inheritance => "ih",
    }
}

fn method_code(method: AcquisitionMethod) -> &'static str {
    match method {
        AcquisitionMethod::Purchased => "p",
        AcquisitionMethod::Exercised => "x",
        AcquisitionMethod::ReceivedForServices => "s",
        AcquisitionMethod::Converted => "c",
        AcquisitionMethod::Gifted => "g",
        AcquisitionMethod::Inherited => "i",
    }
}

fn election_code(election: Election83b) -> &'static str {
    match election {
        Election83b::Filed => "y",
        Election83b::NotFiled => "n",
        Election83b::Unknown => "u",
    }
}

fn date_key(field: DateField) -> &'static str {
    match field {
        DateField::GrantDate => "gd",
        DateField::ExerciseDate => "xd",
        DateField::VestingDate => "vd",
        DateField::PurchaseDate => "pd",
        DateField::ConversionDate => "cd",
        DateField::DonorAcquisitionDate => "dd",
    }
}

fn checksum(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    hex::encode(&digest[..4])
}

/// Encode a scenario. Decoding the result gives back an equal scenario.
pub fn encode(scenario: &Scenario) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("v", TOKEN_VERSION.to_string()),
        ("t", stock_type_code(scenario.stock_type).to_string()),
    ];
    if let Some(method) = scenario.acquisition_method {
        pairs.push(("m", method_code(method).to_string()));
    }
    if scenario.election_83b != Election83b::Unknown {
        pairs.push(("e", election_code(scenario.election_83b).to_string()));
    }
    for field in DateField::ALL {
        if let Some(date) = scenario.date(field) {
            pairs.push((date_key(field), date.format("%Y-%m-%d").to_string()));
        }
    }
    if let Some(sale_date) = scenario.sale_date {
        pairs.push(("sd", sale_date.format("%Y-%m-%d").to_string()));
    }
    pairs.push(("b", scenario.cost_basis.normalize().to_string()));
    pairs.push(("sv", scenario.expected_sale_value.normalize().to_string()));
    pairs.push(("st", scenario.state_code.trim().to_string()));

    let body = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let ck = checksum(&body);
    format!("{}&ck={}", body, ck)
}

/// Decode a token, with or without a leading `?`.
pub fn decode(token: &str) -> Result<Scenario, ShareTokenError> {
    let token = token.trim().trim_start_matches('?');
    let (body, found) = token
        .rsplit_once("&ck=")
        .ok_or(ShareTokenError::MissingChecksum)?;
    let expected = checksum(body);
    if !expected.eq_ignore_ascii_case(found) {
        return Err(ShareTokenError::ChecksumMismatch {
            expected,
            found: found.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut version = None;
    let mut stock_type = None;
    let mut method = None;
    let mut election = Election83b::Unknown;
    let mut dates: Vec<(DateField, NaiveDate)> = Vec::new();
    let mut sale_date = None;
    let mut cost_basis = None;
    let mut sale_value = None;
    let mut state_code = None;

    for segment in body.split('&') {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| ShareTokenError::MalformedSegment(segment.to_string()))?;
        if !seen.insert(key) {
            return Err(ShareTokenError::DuplicateKey(key.to_string()));
        }
        match key {
            "v" => version = Some(value),
            "t" => {
                stock_type = Some(
                    StockType::ALL
                        .into_iter()
                        .find(|t| stock_type_code(*t) == value)
                        .ok_or_else(|| invalid(key, value))?,
                )
            }
            "m" => {
                method = Some(
                    AcquisitionMethod::ALL
                        .into_iter()
                        .find(|m| method_code(*m) == value)
                        .ok_or_else(|| invalid(key, value))?,
                )
            }
            "e" => {
                election = [Election83b::Filed, Election83b::NotFiled, Election83b::Unknown]
                    .into_iter()
                    .find(|e| election_code(*e) == value)
                    .ok_or_else(|| invalid(key, value))?
            }
            "sd" => sale_date = Some(parse_date(key, value)?),
            "b" => cost_basis = Some(parse_amount(key, value)?),
            "sv" => sale_value = Some(parse_amount(key, value)?),
            "st" => {
                if value.len() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(invalid(key, value));
                }
                state_code = Some(value.to_string())
            }
            _ => {
                let field = DateField::ALL
                    .into_iter()
                    .find(|f| date_key(*f) == key)
                    .ok_or_else(|| ShareTokenError::UnknownKey(key.to_string()))?;
                dates.push((field, parse_date(key, value)?));
            }
        }
    }

    match version {
        Some(TOKEN_VERSION) => {}
        Some(other) => return Err(ShareTokenError::UnsupportedVersion(other.to_string())),
        None => return Err(ShareTokenError::MissingField("v")),
    }

    let mut scenario = Scenario::new(
        stock_type.ok_or(ShareTokenError::MissingField("t"))?,
        cost_basis.ok_or(ShareTokenError::MissingField("b"))?,
        sale_value.ok_or(ShareTokenError::MissingField("sv"))?,
        state_code.ok_or(ShareTokenError::MissingField("st"))?,
    );
    scenario.acquisition_method = method;
    scenario.election_83b = election;
    scenario.sale_date = sale_date;
    for (field, date) in dates {
        scenario.set_date(field, Some(date));
    }
    Ok(scenario)
}

fn invalid(key: &str, value: &str) -> ShareTokenError {
    ShareTokenError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ShareTokenError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid(key, value))
}

fn parse_amount(key: &str, value: &str) -> Result<Decimal, ShareTokenError> {
    match Decimal::from_str(value) {
        Ok(amount) if !amount.is_sign_negative() => Ok(amount),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::calculate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn iso() -> Scenario {
        let mut scenario = Scenario::new(
            StockType::IncentiveStockOption,
            dec!(10000.00),
            dec!(2010000),
            "CA",
        )
        .with_date(DateField::ExerciseDate, date(2019, 6, 1))
        .with_date(DateField::GrantDate, date(2016, 6, 1))
        .with_sale_date(date(2025, 1, 1));
        scenario.acquisition_method = Some(AcquisitionMethod::Exercised);
        scenario
    }

    #[test]
    fn token_is_compact_query_string() {
        let token = encode(&iso());
        assert!(token.starts_with("v=1&t=iso&m=x&gd=2016-06-01&xd=2019-06-01&sd=2025-01-01"));
        assert!(token.contains("&b=10000&sv=2010000&st=CA&ck="));
        assert_eq!(token.rsplit_once("&ck=").unwrap().1.len(), 8);
    }

    #[test]
    fn decoded_scenario_gives_identical_results() {
        let today = date(2026, 10, 19);
        let original = iso();
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(calculate(&decoded, today), calculate(&original, today));
    }

    #[test]
    fn restricted_stock_election_survives() {
        let scenario = Scenario::new(StockType::RestrictedStock, dec!(0.01), dec!(5000000), "ny")
            .with_election(Election83b::NotFiled)
            .with_date(DateField::VestingDate, date(2020, 2, 29));
        let decoded = decode(&format!("?{}", encode(&scenario))).unwrap();
        assert_eq!(decoded, scenario);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = encode(&iso()).replace("sv=2010000", "sv=9010000");
        assert!(matches!(
            decode(&token),
            Err(ShareTokenError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn missing_checksum_is_rejected() {
        assert_eq!(
            decode("v=1&t=iso&b=1&sv=2&st=CA"),
            Err(ShareTokenError::MissingChecksum)
        );
    }

    #[test]
    fn structural_errors() {
        let signed = |body: &str| format!("{}&ck={}", body, checksum(body));

        assert_eq!(
            decode(&signed("v=2&t=iso&b=1&sv=2&st=CA")),
            Err(ShareTokenError::UnsupportedVersion("2".to_string()))
        );
        assert_eq!(
            decode(&signed("v=1&b=1&sv=2&st=CA")),
            Err(ShareTokenError::MissingField("t"))
        );
        assert_eq!(
            decode(&signed("v=1&t=iso&zz=1&b=1&sv=2&st=CA")),
            Err(ShareTokenError::UnknownKey("zz".to_string()))
        );
        assert_eq!(
            decode(&signed("v=1&t=iso&t=cs&b=1&sv=2&st=CA")),
            Err(ShareTokenError::DuplicateKey("t".to_string()))
        );
        assert_eq!(
            decode(&signed("v=1&t=iso&b=-1&sv=2&st=CA")),
            Err(ShareTokenError::InvalidValue {
                key: "b".to_string(),
                value: "-1".to_string()
            })
        );
        assert_eq!(
            decode(&signed("v=1&t=iso&xd=2019-13-01&b=1&sv=2&st=CA")),
            Err(ShareTokenError::InvalidValue {
                key: "xd".to_string(),
                value: "2019-13-01".to_string()
            })
        );
        assert_eq!(
            decode(&signed("v=1&t=iso&b&sv=2&st=CA")),
            Err(ShareTokenError::MalformedSegment("b".to_string()))
        );
    }
}
