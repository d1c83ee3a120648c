//! Seven-bit weekday set. Bit `n - 1` is set when the weekday with
//! Monday-based ordinal `n` (Mon=1 .. Sun=7) is allowed.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct DayMask(u8);

impl DayMask {
    pub const EMPTY: DayMask = DayMask(0);
    pub const ALL: DayMask = DayMask(0b111_1111);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Builds a mask from day names. Names that are not weekdays are skipped.
    pub fn encode<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| parse_day_name(name.as_ref()))
            .fold(Self::EMPTY, |mask, day| mask.with(day))
    }

    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        days.into_iter().fold(Self::EMPTY, |mask, day| mask.with(day))
    }

    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | bit(day))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn is_allowed(self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn days(self) -> Vec<Weekday> {
        WEEK.iter().copied().filter(|day| self.contains(*day)).collect()
    }

    pub fn names(self) -> Vec<&'static str> {
        self.days().into_iter().map(short_name).collect()
    }
}

impl From<u8> for DayMask {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<DayMask> for u8 {
    fn from(mask: DayMask) -> Self {
        mask.0
    }
}

impl fmt::Display for DayMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.names().join(","))
    }
}

fn bit(day: Weekday) -> u8 {
    1 << (day.number_from_monday() - 1)
}

/// Accepts three-letter and full English names in any case. `Thy` is kept
/// for payloads written by older clients that spelled Thursday that way.
pub fn parse_day_name(name: &str) -> Option<Weekday> {
    match name.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thy" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn short_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

pub fn all_day_names() -> Vec<String> {
    WEEK.iter().map(|day| short_name(*day).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_and_full_sets() {
        assert_eq!(DayMask::encode(Vec::<String>::new()).bits(), 0);
        let all = DayMask::encode(["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(all.bits(), 0b111_1111);
        assert_eq!(all, DayMask::ALL);
    }

    #[test]
    fn bit_positions_follow_monday_ordinal() {
        assert_eq!(DayMask::encode(["Mon"]).bits(), 0b000_0001);
        assert_eq!(DayMask::encode(["Wed"]).bits(), 0b000_0100);
        assert_eq!(DayMask::encode(["Sun"]).bits(), 0b100_0000);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mask = DayMask::encode(["Mon", "Funday", "", "Fri"]);
        assert_eq!(mask.days(), vec![Weekday::Mon, Weekday::Fri]);
    }

    #[test]
    fn legacy_thursday_spelling() {
        assert_eq!(DayMask::encode(["Thy"]), DayMask::encode(["thursday"]));
    }

    #[test]
    fn membership_matches_every_subset() {
        // 2024-06-10 is a Monday; walk two full weeks.
        let start = date(2024, 6, 10);
        for bits in 1u8..=0b111_1111 {
            let mask = DayMask::from_bits(bits);
            let names = mask.names();
            for offset in 0..14 {
                let d = start + chrono::Days::new(offset);
                let expected = names.contains(&short_name(d.weekday()));
                assert_eq!(mask.is_allowed(d), expected, "bits={bits:#b} date={d}");
            }
            assert_eq!(DayMask::encode(&names), mask);
        }
    }

    #[test]
    fn high_bits_are_dropped() {
        assert_eq!(DayMask::from_bits(0b1000_0001).bits(), 1);
        let mask: DayMask = serde_json::from_str("255").unwrap();
        assert_eq!(mask, DayMask::ALL);
        assert_eq!(serde_json::to_string(&DayMask::encode(["Tue"])).unwrap(), "2");
    }

    #[test]
    fn display_lists_names() {
        assert_eq!(DayMask::encode(["Fri", "Mon"]).to_string(), "Mon,Fri");
        assert_eq!(DayMask::EMPTY.to_string(), "none");
    }
}
