use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::resource::ValidationErrorKind;

/// Date layout accepted in requests and rendered in responses.
pub const DISPLAY_DATE_LAYOUT: &str = "DD/MM/YYYY";

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
const DISPLAY_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

lazy_static! {
    // chrono accepts any digit count for %Y, so the shape is checked first
    static ref DISPLAY_DATE: Regex =
        Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("Expect a valid display date regex");
}

pub fn parse_display_date(raw: &str) -> Result<NaiveDate, ValidationErrorKind> {
    if !DISPLAY_DATE.is_match(raw) {
        return Err(ValidationErrorKind::Pattern(DISPLAY_DATE_LAYOUT.into()));
    }

    NaiveDate::parse_from_str(raw, DISPLAY_DATE_FORMAT)
        .map_err(|_| ValidationErrorKind::Pattern(DISPLAY_DATE_LAYOUT.into()))
}

pub fn format_display_date(date: &NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn format_display_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.format(DISPLAY_DATETIME_FORMAT).to_string()
}
