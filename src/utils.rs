use crate::error::{Result, SalesReportError};
use crate::schema::DateRange;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        SalesReportError::Config(format!("Invalid month {}-{:02}", year, month))
    })
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let first = first_day_of_month(year, month)?;
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| SalesReportError::Config(format!("Month {}-{:02} is out of range", year, month)))
}

/// The calendar month containing `date`.
pub fn month_range(date: NaiveDate) -> Result<DateRange> {
    let start = first_day_of_month(date.year(), date.month())?;
    let end = last_day_of_month(date.year(), date.month())?;
    DateRange::new(start, end)
}

/// First day of `date`'s month through `date` itself.
pub fn month_to_date(date: NaiveDate) -> Result<DateRange> {
    let start = first_day_of_month(date.year(), date.month())?;
    DateRange::new(start, date)
}

/// Counts days in `[start, end]` whose weekday is not `excluded`.
/// An inverted range counts zero days.
pub fn count_working_days(start: NaiveDate, end: NaiveDate, excluded: Weekday) -> u32 {
    if end < start {
        return 0;
    }

    let total_days = (end - start).num_days() + 1;
    let full_weeks = total_days / 7;
    let mut count = full_weeks * 6;

    // Walk only the leftover partial week.
    let remainder = total_days % 7;
    let mut current = start + chrono::Duration::days(full_weeks * 7);
    for _ in 0..remainder {
        if current.weekday() != excluded {
            count += 1;
        }
        current = current.succ_opt().unwrap_or(current);
    }

    count as u32
}

/// The `months` full calendar months immediately before `reference`'s month.
///
/// For a reference date of 2024-05-17 and three months this is
/// 2024-02-01 through 2024-04-30.
pub fn lookback_window(reference: NaiveDate, months: u32) -> Result<DateRange> {
    if months == 0 {
        return Err(SalesReportError::InvalidTarget(0.0));
    }

    let current_month_start = first_day_of_month(reference.year(), reference.month())?;
    let start = current_month_start
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| SalesReportError::Config(format!("Lookback of {} months is out of range", months)))?;
    let end = current_month_start
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| SalesReportError::Config("Lookback end is out of range".to_string()))?;

    DateRange::new(start, end)
}

/// Same calendar dates one year earlier. Feb 29 maps to Feb 28.
pub fn shift_back_one_year(range: &DateRange) -> Result<DateRange> {
    let shift = |date: NaiveDate| {
        date.checked_sub_months(Months::new(12)).ok_or_else(|| {
            SalesReportError::Config(format!("Cannot shift {} back one year", date))
        })
    };
    DateRange::new(shift(range.start())?, shift(range.end())?)
}

/// Converts an Excel serial day number (1900 date system) to a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Serial 60 is the fictitious 1900-02-29, read as 1900-02-28. Later
    // serials count from 1899-12-30 to absorb it; earlier ones from 1899-12-31.
    let serial = serial.trunc() as u64;
    let epoch = if serial < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(serial))
}

/// Parses a textual date in the layouts seen in sales exports.
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Drop any time-of-day component.
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    const FORMATS: [&str; 6] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%m-%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2).unwrap(), d(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 2).unwrap(), d(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 12).unwrap(), d(2023, 12, 31));
        assert!(last_day_of_month(2023, 13).is_err());
    }

    #[test]
    fn test_working_days_single_day() {
        // 2024-01-05 is a Friday
        assert_eq!(count_working_days(d(2024, 1, 5), d(2024, 1, 5), Weekday::Fri), 0);
        assert_eq!(count_working_days(d(2024, 1, 4), d(2024, 1, 4), Weekday::Fri), 1);
    }

    #[test]
    fn test_working_days_inverted_range_is_zero() {
        assert_eq!(count_working_days(d(2024, 1, 10), d(2024, 1, 1), Weekday::Fri), 0);
    }

    #[test]
    fn test_working_days_full_month() {
        // January 2024 has 31 days, four of them Fridays (5, 12, 19, 26)
        assert_eq!(count_working_days(d(2024, 1, 1), d(2024, 1, 31), Weekday::Fri), 27);
        // and five Wednesdays (3, 10, 17, 24, 31)
        assert_eq!(count_working_days(d(2024, 1, 1), d(2024, 1, 31), Weekday::Wed), 26);
    }

    #[test]
    fn test_working_days_matches_day_by_day_count() {
        let start = d(2023, 11, 3);
        for len in 0..40 {
            let end = start + chrono::Duration::days(len);
            let expected = start
                .iter_days()
                .take_while(|day| *day <= end)
                .filter(|day| day.weekday() != Weekday::Fri)
                .count() as u32;
            assert_eq!(count_working_days(start, end, Weekday::Fri), expected);
        }
    }

    #[test]
    fn test_lookback_window() {
        let window = lookback_window(d(2024, 5, 17), 3).unwrap();
        assert_eq!(window.start(), d(2024, 2, 1));
        assert_eq!(window.end(), d(2024, 4, 30));

        let window = lookback_window(d(2024, 1, 2), 1).unwrap();
        assert_eq!(window.start(), d(2023, 12, 1));
        assert_eq!(window.end(), d(2023, 12, 31));
    }

    #[test]
    fn test_shift_back_one_year_clamps_leap_day() {
        let range = DateRange::new(d(2024, 2, 1), d(2024, 2, 29)).unwrap();
        let shifted = shift_back_one_year(&range).unwrap();
        assert_eq!(shifted.start(), d(2023, 2, 1));
        assert_eq!(shifted.end(), d(2023, 2, 28));
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45292.0), Some(d(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(45292.75), Some(d(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(-3.0), None);
        assert_eq!(excel_serial_to_date(1.0), Some(d(1900, 1, 1)));
        assert_eq!(excel_serial_to_date(59.0), Some(d(1900, 2, 28)));
        assert_eq!(excel_serial_to_date(60.0), Some(d(1900, 2, 28)));
        assert_eq!(excel_serial_to_date(61.0), Some(d(1900, 3, 1)));
    }

    #[test]
    fn test_parse_date_str_formats() {
        assert_eq!(parse_date_str("2024-01-15"), Some(d(2024, 1, 15)));
        assert_eq!(parse_date_str("2024-01-15 13:45:00"), Some(d(2024, 1, 15)));
        assert_eq!(parse_date_str("15/01/2024"), Some(d(2024, 1, 15)));
        assert_eq!(parse_date_str("not a date"), None);
        assert_eq!(parse_date_str(""), None);
    }
}
