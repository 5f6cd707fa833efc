//! `month/day hh:mm:ss.fff` stamps.
//!
//! The client never writes a year, so the caller supplies one. A log that
//! crosses New Year's Eve therefore sorts its January lines before its
//! December lines; that limitation is accepted, not corrected.

use chrono::{NaiveDate, NaiveDateTime};
use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt},
    sequence::{preceded, separated_pair, tuple},
    IResult,
};

use crate::error::ParseErrorKind;

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>)(input)
}

/// `4/21` -> (4, 21)
fn month_day(input: &str) -> IResult<&str, (u32, u32)> {
    separated_pair(number, char('/'), number)(input)
}

/// `21:33:10.123` -> (21, 33, 10, nanoseconds)
fn clock(input: &str) -> IResult<&str, (u32, u32, u32, u32)> {
    let (rest, (hour, _, minute, _, second, fraction)) = tuple((
        number,
        char(':'),
        number,
        char(':'),
        number,
        opt(preceded(char('.'), digit1)),
    ))(input)?;
    Ok((rest, (hour, minute, second, fraction.map(fraction_nanos).unwrap_or(0))))
}

/// Scale a fractional-seconds digit run to nanoseconds (digits past 9 are dropped)
fn fraction_nanos(digits: &str) -> u32 {
    let digits = &digits[..digits.len().min(9)];
    let value: u32 = digits.parse().unwrap_or(0);
    value * 10u32.pow(9 - digits.len() as u32)
}

/// Build an absolute timestamp from the date and time tokens
pub fn parse_stamp(date: &str, time: &str, year: i32) -> Option<NaiveDateTime> {
    let (_, (month, day)) = all_consuming(month_day)(date).ok()?;
    let (_, (hour, minute, second, nanos)) = all_consuming(clock)(time).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_nano_opt(hour, minute, second, nanos)
}

/// Resolve the timestamp at the start of a log line
pub fn resolve(line: &str, year: i32) -> Result<NaiveDateTime, ParseErrorKind> {
    let head = line.split(',').next().unwrap_or(line);
    let mut tokens = head.split_whitespace();
    let date = tokens.next().unwrap_or_default();
    let time = tokens.next().unwrap_or_default();

    parse_stamp(date, time, year).ok_or_else(|| ParseErrorKind::InvalidTimestamp {
        raw: format!("{} {}", date, time).trim().to_string(),
    })
}
