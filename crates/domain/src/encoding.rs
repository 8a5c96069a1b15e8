//! Shared numeric and date encoding helpers for the provider wire format.
//!
//! All monetary and rate fields go through [`quantize`], and all date fields
//! through the `wire_*` helpers, so payload builders cannot disagree on
//! rounding or formatting.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::constants::{WIRE_DATETIME_FORMAT, WIRE_DATE_FORMAT};
use crate::errors::{EtimsError, Result};

/// Quantize a monetary amount or rate to two decimal places.
///
/// Half-way cases round away from zero, matching the reference behaviour of
/// the provider's own receipt arithmetic.
pub fn quantize(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Encode a date as the provider's fixed `YYYYMMDD` format.
pub fn wire_date(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// Combine a posting date and time into the provider's `YYYYMMDDHHMMSS`
/// format. No timezone inference happens here; the document's own clock is
/// taken at face value.
pub fn wire_datetime(date: NaiveDate, time: NaiveTime) -> String {
    NaiveDateTime::new(date, time).format(WIRE_DATETIME_FORMAT).to_string()
}

/// Parse a provider `resultDt` (`YYYYMMDDHHMMSS`) back into a datetime.
pub fn parse_wire_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, WIRE_DATETIME_FORMAT)
        .map_err(|e| EtimsError::InvalidInput(format!("invalid wire datetime {value:?}: {e}")))
}

/// Check whether a string resembles a KRA PIN (one letter, nine digits, one
/// letter). Does not verify the PIN actually exists.
pub fn is_valid_kra_pin(pin: &str) -> bool {
    let bytes = pin.as_bytes();
    bytes.len() == 11
        && bytes[0].is_ascii_alphabetic()
        && bytes[10].is_ascii_alphabetic()
        && bytes[1..10].iter().all(u8::is_ascii_digit)
}

/// Derive the user id the provider expects from an ERP owner address
/// (`jane@example.com` -> `jane`).
pub fn user_id_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_rounds_to_two_places() {
        assert_eq!(quantize(1.006), 1.01);
        assert_eq!(quantize(159.999), 160.0);
        assert_eq!(quantize(0.1 + 0.2), 0.3);
        assert_eq!(quantize(-1.006), -1.01);
    }

    #[test]
    fn wire_date_formats_compact() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(wire_date(date), "20240307");
    }

    #[test]
    fn wire_datetime_combines_date_and_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let time = NaiveTime::from_hms_opt(14, 5, 9).unwrap();
        assert_eq!(wire_datetime(date, time), "20240307140509");
    }

    #[test]
    fn wire_datetime_round_trips() {
        let parsed = parse_wire_datetime("20240307140509").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-07 14:05:09");
        assert!(parse_wire_datetime("2024-03-07").is_err());
    }

    #[test]
    fn recognises_kra_pin_shape() {
        assert!(is_valid_kra_pin("A123456789B"));
        assert!(is_valid_kra_pin("p000111222z"));
        assert!(!is_valid_kra_pin("A12345678B"));
        assert!(!is_valid_kra_pin("0123456789B"));
        assert!(!is_valid_kra_pin("A12345678XB"));
    }

    #[test]
    fn user_id_strips_mail_domain() {
        assert_eq!(user_id_from_email("jane@example.com"), "jane");
        assert_eq!(user_id_from_email("Administrator"), "Administrator");
    }
}
