use chrono::{Days, Months, NaiveDate};

/// Add whole calendar years. February 29 lands on February 28 in non-leap years.
pub fn add_years(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_add_months(Months::new(years * 12))
        .unwrap_or(NaiveDate::MAX)
}

/// First day on which stock held since `start` has been held for more than `years` years.
pub fn more_than_years_after(start: NaiveDate, years: u32) -> NaiveDate {
    add_years(start, years)
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX)
}

/// Sale date assumed when a scenario leaves it unset: one year from today.
pub fn default_sale_date(today: NaiveDate) -> NaiveDate {
    add_years(today, 1)
}

/// Long-form date for reports, e.g. "June 2, 2024"
pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn write_csv<I, R, W>(records: I, writer: W) -> anyhow::Result<()>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records.into_iter() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
