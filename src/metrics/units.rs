//! Conversions for the loosely formatted values Crafty reports.

use crate::error::{
    Error,
    Result,
};
use chrono::{
    DateTime,
    Local,
    NaiveDate,
    NaiveDateTime,
    TimeZone as _,
    Utc,
};

const BYTES_PER_MB: f64 = 1000.0 * 1000.0;

/// Digits after the decimal point beyond this are ignored.
const MAX_FRACTION_DIGITS: usize = 9;

const DECIMAL_PREFIXES: [(&str, &str); 8] = [
    ("k", "kilo"),
    ("m", "mega"),
    ("g", "giga"),
    ("t", "tera"),
    ("p", "peta"),
    ("e", "exa"),
    ("z", "zetta"),
    ("y", "yotta"),
];

const BINARY_PREFIXES: [(&str, &str); 8] = [
    ("ki", "kibi"),
    ("mi", "mebi"),
    ("gi", "gibi"),
    ("ti", "tebi"),
    ("pi", "pebi"),
    ("ei", "exbi"),
    ("zi", "zebi"),
    ("yi", "yobi"),
];

/// Parse a human readable size such as `"512 MB"`, `"1.5GiB"` or `"2048"` into bytes.
///
/// Units starting with `K`, `M`, `G`, ... are powers of 1000 unless the second letter is `i` (`KiB`, `MiB`, ...),
/// which makes them powers of 1024. A bare number is a byte count. The result is truncated to whole bytes.
pub fn parse_size(input: &str) -> Result<u64> {
    let error = || Error::parse("size", input);

    let trimmed = input.trim();
    let number_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(number_end);

    let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (integer.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(error());
    }
    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    let integer: u128 = if integer.is_empty() {
        0
    } else {
        integer.parse().map_err(|_| error())?
    };

    let multiplier = unit_multiplier(unit).ok_or_else(error)?;

    let whole = integer.checked_mul(multiplier).ok_or_else(error)?;
    let partial = if fraction.is_empty() {
        0
    } else {
        let digits: u128 = fraction.parse().map_err(|_| error())?;
        digits * multiplier / 10u128.pow(fraction.len() as u32)
    };

    whole
        .checked_add(partial)
        .and_then(|bytes| u64::try_from(bytes).ok())
        .ok_or_else(error)
}

fn unit_multiplier(unit: &str) -> Option<u128> {
    let unit = unit.trim().to_ascii_lowercase();
    let prefix = ["bytes", "byte", "b"]
        .iter()
        .find_map(|suffix| unit.strip_suffix(suffix))
        .unwrap_or(&unit);

    if prefix.is_empty() {
        return Some(1);
    }

    let power = |table: &[(&str, &str); 8]| {
        table
            .iter()
            .position(|(symbol, name)| prefix == *symbol || prefix == *name)
            .map(|index| index as u32 + 1)
    };

    if let Some(exponent) = power(&BINARY_PREFIXES) {
        return Some(1024u128.pow(exponent));
    }
    power(&DECIMAL_PREFIXES).map(|exponent| 1000u128.pow(exponent))
}

/// Human readable size in (decimal) megabytes.
pub fn size_to_mb(input: &str) -> Result<f64> {
    parse_size(input).map(|bytes| bytes as f64 / BYTES_PER_MB)
}

const OFFSET_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse an ISO-8601 like timestamp. Values without an offset are taken as local wall-clock time.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Some(timestamp) = DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, OFFSET_FORMAT))
        .ok()
    {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::parse("timestamp", input))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .ok_or_else(|| Error::parse("timestamp", input))
}

/// Seconds elapsed between `timestamp` and `now`, negative if `timestamp` lies in the future.
pub fn seconds_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - timestamp).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn decimal_units() {
        assert_eq!(parse_size("1 GB").unwrap(), 1_000_000_000);
        assert_eq!(parse_size("512MB").unwrap(), 512_000_000);
        assert_eq!(parse_size("1.2GB").unwrap(), 1_200_000_000);
        assert_eq!(parse_size("3 kilobytes").unwrap(), 3_000);
        assert_eq!(parse_size("2 k").unwrap(), 2_000);
        assert_eq!(size_to_mb("1 GB").unwrap(), 1000.0);
        assert_eq!(size_to_mb("250 MB").unwrap(), 250.0);
    }

    #[test]
    fn binary_units() {
        assert_eq!(parse_size("1 KiB").unwrap(), 1024);
        assert_eq!(parse_size("1.5 KiB").unwrap(), 1536);
        assert_eq!(parse_size("2 GiB").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1 mebibyte").unwrap(), 1024 * 1024);
    }

    #[test]
    fn plain_bytes() {
        assert_eq!(parse_size("2048").unwrap(), 2048);
        assert_eq!(parse_size("17 B").unwrap(), 17);
        assert_eq!(parse_size(" 5 bytes ").unwrap(), 5);
        assert_eq!(parse_size("0.5KB").unwrap(), 500);
        assert_eq!(parse_size(".5KB").unwrap(), 500);
    }

    #[test]
    fn fractional_bytes_are_truncated() {
        assert_eq!(parse_size("0.1 KiB").unwrap(), 102);
        assert_eq!(parse_size("1.5").unwrap(), 1);
    }

    #[test]
    fn invalid_sizes() {
        for input in ["", "GB", "-1 GB", "1.2.3 MB", "12 parsecs", "1 YB", "1e3", "."] {
            assert!(parse_size(input).is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn size_conversion_is_monotonic() {
        let inputs = [
            "0", "1", "999", "1 KB", "1 KiB", "1.5 KB", "1 MB", "1.01 MB", "1 MiB", "512 MB", "1 GB", "1 GiB",
            "1.2 GB", "1 TB",
        ];
        let sizes: Vec<u64> = inputs.iter().map(|input| parse_size(input).unwrap()).collect();
        assert!(sizes.windows(2).all(|pair| pair[0] <= pair[1]), "{sizes:?}");
    }

    #[test]
    fn timestamps_with_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T12:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01 10:00:00+00:00").unwrap(), expected);
    }

    #[test]
    fn naive_timestamps_are_local_time() {
        let expected = Local
            .with_ymd_and_hms(2024, 1, 15, 12, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_timestamp("2024-01-15 12:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-15T12:30:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-01-15 12:30:00.250000").unwrap(),
            expected + chrono::Duration::milliseconds(250)
        );

        let midnight = Local.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap().with_timezone(&Utc);
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), midnight);
    }

    #[test]
    fn invalid_timestamps() {
        for input in ["", "False", "yesterday", "2024-13-01 00:00:00", "15/01/2024"] {
            assert!(parse_timestamp(input).is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn elapsed_seconds() {
        let then = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let now = then + chrono::Duration::seconds(90);
        assert_eq!(seconds_since(then, now), 90.0);
        assert_eq!(seconds_since(now, then), -90.0);
    }
}
