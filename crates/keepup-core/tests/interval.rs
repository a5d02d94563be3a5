use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};
use keepup_core::{Interval, TimeOfDay, TimeOfDayError, find_current, find_next, next_occurrence};

fn tod(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn interval(start: &str, end: &str) -> Interval {
    Interval::new(tod(start), tod(end))
}

#[test]
fn parses_time_of_day() {
    assert_eq!(tod("21:01").hour(), 21);
    assert_eq!(tod("07:05").minute(), 5);
    assert_eq!(tod("07:05").to_string(), "07:05");
    assert_eq!(
        "24:00".parse::<TimeOfDay>(),
        Err(TimeOfDayError::OutOfRange { hour: 24, minute: 0 })
    );
    assert!("noon".parse::<TimeOfDay>().is_err());
}

#[test]
fn interval_wrapping_midnight() {
    let night = interval("21:01", "01:30");
    assert!(night.wraps_midnight());

    assert!(night.contains(at(23, 59)));
    assert!(night.contains(at(0, 0)));
    assert!(night.contains(at(1, 29)));
    assert!(night.contains(at(21, 1)));
    assert!(!night.contains(at(1, 31)));
    assert!(!night.contains(at(21, 0)));
    assert!(!night.contains(at(12, 0)));
}

#[test]
fn interval_within_one_day() {
    let lunch = interval("12:00", "13:00");
    assert!(!lunch.wraps_midnight());
    assert!(lunch.contains(at(12, 0)));
    assert!(lunch.contains(at(12, 59)));
    assert!(!lunch.contains(at(13, 0)));
    assert!(!lunch.contains(at(11, 59)));
}

#[test]
fn find_current_picks_containing_interval() {
    let intervals = vec![interval("12:00", "13:00"), interval("21:01", "01:30")];

    assert_eq!(find_current(&intervals, at(0, 0)), Some(&intervals[1]));
    assert_eq!(find_current(&intervals, at(12, 30)), Some(&intervals[0]));
    assert_eq!(find_current(&intervals, at(1, 31)), None);
    assert_eq!(find_current(&[], at(1, 31)), None);
}

#[test]
fn find_next_is_cyclic() {
    let intervals = vec![interval("12:00", "13:00"), interval("21:01", "01:30")];

    assert_eq!(find_next(&intervals, at(8, 0)), Some(&intervals[0]));
    assert_eq!(find_next(&intervals, at(13, 0)), Some(&intervals[1]));
    assert_eq!(find_next(&intervals, at(23, 59)), Some(&intervals[0]));
    assert_eq!(find_next(&intervals, at(0, 30)), Some(&intervals[0]));
    assert_eq!(find_next(&[], at(0, 30)), None);
}

#[test]
fn next_occurrence_rolls_to_tomorrow() {
    let utc = FixedOffset::east_opt(0).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();

    assert_eq!(
        next_occurrence(tod("23:00"), now, utc),
        Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap()
    );
    assert_eq!(
        next_occurrence(tod("01:30"), now, utc),
        Utc.with_ymd_and_hms(2024, 3, 11, 1, 30, 0).unwrap()
    );
    assert_eq!(
        next_occurrence(tod("22:00"), now, utc),
        Utc.with_ymd_and_hms(2024, 3, 11, 22, 0, 0).unwrap()
    );
}

#[test]
fn next_occurrence_honours_offset() {
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    // 22:00 UTC is already 00:00 the next day at +02:00
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();

    assert_eq!(
        next_occurrence(tod("01:30"), now, plus_two),
        Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap()
    );
}
