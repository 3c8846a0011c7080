use time::{Date, Month, OffsetDateTime};

use crate::error::{Result, ViewError};

/// Parse a FHIR `date` (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`). A `dateTime` is accepted
/// and truncated to its date. Missing month or day default to the first.
pub fn parse_fhir_date(value: &str) -> Result<Date> {
    let date_part = value.trim().split('T').next().unwrap_or_default();
    let mut parts = date_part.splitn(3, '-');

    let year = parse_component(parts.next(), 4, value)?
        .ok_or_else(|| invalid_date(value))?;
    let month = parse_component(parts.next(), 2, value)?.unwrap_or(1);
    let day = parse_component(parts.next(), 2, value)?.unwrap_or(1);

    let month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| invalid_date(value))?;
    let day = u8::try_from(day).map_err(|_| invalid_date(value))?;

    Date::from_calendar_date(year, month, day).map_err(|_| invalid_date(value))
}

fn parse_component(part: Option<&str>, width: usize, original: &str) -> Result<Option<i32>> {
    match part {
        None => Ok(None),
        Some(p) if p.len() == width && p.bytes().all(|b| b.is_ascii_digit()) => p
            .parse::<i32>()
            .map(Some)
            .map_err(|_| invalid_date(original)),
        Some(_) => Err(invalid_date(original)),
    }
}

fn invalid_date(value: &str) -> ViewError {
    ViewError::invalid_field("birth date", format!("'{value}' is not a FHIR date"))
}

/// Whole years elapsed between `birth` and `today`.
pub fn years_between(birth: Date, today: Date) -> i32 {
    let mut years = today.year() - birth.year();
    if (today.month() as u8, today.day()) < (birth.month() as u8, birth.day()) {
        years -= 1;
    }
    years
}

/// Display age on a given day: whole years, or `"N/A"` when the birth date is
/// absent or unreadable.
pub fn age_on(birth_date: Option<&str>, today: Date) -> String {
    match birth_date.map(parse_fhir_date) {
        Some(Ok(birth)) => years_between(birth, today).to_string(),
        Some(Err(e)) => {
            tracing::debug!(error = %e, "unreadable birth date");
            crate::NOT_AVAILABLE.to_string()
        }
        None => crate::NOT_AVAILABLE.to_string(),
    }
}

pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}
