use crate::records::Timestamp;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Formats a microsecond timestamp for display in `tz`.
///
/// Zero renders as `"-"`. The short form is `HH:MM:SS`; the long form is
/// `YYYY-MM-DD HH:MM:SS.<sub>` where `<sub>` is the millisecond field plus
/// `microseconds % 1000`, unpadded. That sub-second value mixes units and is
/// kept as the service's clients have always shown it.
pub fn format_timestamp<Tz>(microseconds: Timestamp, long_form: bool, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if microseconds == 0 {
        return "-".into();
    }

    let Some(instant) = DateTime::from_timestamp_millis(microseconds / 1000) else {
        return "-".into();
    };
    let local = instant.with_timezone(tz);
    let time_str = local.format("%H:%M:%S").to_string();

    if long_form {
        let subsec = i64::from(local.timestamp_subsec_millis()) + microseconds % 1000;
        format!("{} {}.{}", local.format("%Y-%m-%d"), time_str, subsec)
    } else {
        time_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn zero_renders_placeholder() {
        assert_eq!(format_timestamp(0, false, &Utc), "-");
        assert_eq!(format_timestamp(0, true, &Utc), "-");
    }

    #[test]
    fn short_form_is_clock_time() {
        assert_eq!(format_timestamp(3_723_000_000, false, &Utc), "01:02:03");
    }

    #[test]
    fn long_form_keeps_mixed_unit_subsecond() {
        // 250 ms field plus 456 us remainder prints as 706
        let micros = 3_723_250_456;
        assert_eq!(
            format_timestamp(micros, true, &Utc),
            "1970-01-01 01:02:03.706"
        );
    }

    #[test]
    fn out_of_range_renders_placeholder() {
        assert_eq!(format_timestamp(i64::MAX, true, &Utc), "-");
        assert_eq!(format_timestamp(i64::MIN, false, &Utc), "-");
    }

    #[test]
    fn respects_supplied_offset() {
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_timestamp(3_723_000_000, false, &east), "03:02:03");
    }
}
