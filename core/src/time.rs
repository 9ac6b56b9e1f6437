//! Time related utils.

use chrono::format::Item;
use chrono::format::Numeric;
use chrono::format::Pad;
use chrono::Utc;

/// DateTime is the alias for chrono::DateTime<Utc>.
pub type DateTime = chrono::DateTime<Utc>;

/// Create a new DateTime with current time.
pub fn now() -> DateTime {
    Utc::now()
}

/// DATE is the format of date: `20220313`
const DATE: &[Item<'static>] = &[
    Item::Numeric(Numeric::Year, Pad::Zero),
    Item::Numeric(Numeric::Month, Pad::Zero),
    Item::Numeric(Numeric::Day, Pad::Zero),
];

/// Format time into date: `20220313`
pub fn format_date(t: DateTime) -> String {
    t.format_with_items(DATE.iter()).to_string()
}

/// ISO8601 is the format of time: `20220313T072004Z`
const ISO8601: &[Item<'static>] = &[
    Item::Numeric(Numeric::Year, Pad::Zero),
    Item::Numeric(Numeric::Month, Pad::Zero),
    Item::Numeric(Numeric::Day, Pad::Zero),
    Item::Literal("T"),
    Item::Numeric(Numeric::Hour, Pad::Zero),
    Item::Numeric(Numeric::Minute, Pad::Zero),
    Item::Numeric(Numeric::Second, Pad::Zero),
    Item::Literal("Z"),
];

/// Format time into ISO8601: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format_with_items(ISO8601.iter()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(test_time()), "20220301")
    }

    #[test]
    fn test_format_iso8601() {
        assert_eq!(format_iso8601(test_time()), "20220301T081234Z")
    }
}
