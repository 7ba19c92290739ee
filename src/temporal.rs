//! Free-form date and time parsing plus the canonical time zone table.
//!
//! Parsing is forgiving in the way form input usually needs: ISO-8601 and
//! RFC 3339/2822 timestamps, `YYYY-MM-DD HH:MM:SS ±HHMM`, spelled out month
//! names (`March 9, 2010`), leading weekday names and ordinal suffixes. Wall
//! clock inputs without an offset are placed in a [`LocalZone`].

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone as _, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use std::fmt;

lazy_static! {
    static ref WEEKDAY_PREFIX: Regex = Regex::new(
        r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+"
    ).unwrap();
    static ref ORDINAL_SUFFIX: Regex = Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap();
    static ref UTC_SUFFIX: Regex = Regex::new(r"(?i)\s*(z|utc|gmt)$").unwrap();
    static ref EMBEDDED_ISO_DATE: Regex = Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap();
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%B-%Y",
    "%B-%d-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
];

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S %:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M %z",
    "%Y/%m/%d %H:%M:%S %z",
    "%B %d, %Y %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
];

// ------------- Local Zone -------------
/// The zone used for wall-clock input that carries no offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LocalZone {
    #[default]
    System,
    Fixed(FixedOffset),
}

impl LocalZone {
    pub fn from_offset_seconds(seconds: i32) -> Option<LocalZone> {
        FixedOffset::east_opt(seconds).map(LocalZone::Fixed)
    }
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            LocalZone::System => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.fixed_offset()),
            LocalZone::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        }
    }
    pub fn midnight(&self, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        self.localize(date.and_time(NaiveTime::MIN))
    }
}

fn normalize(s: &str) -> String {
    let s = WEEKDAY_PREFIX.replace(s.trim(), "");
    ORDINAL_SUFFIX.replace_all(&s, "$1").into_owned()
}

/// Parses a date out of free-form text; time components are ignored.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let text = normalize(s);
    if text.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Some(date);
        }
    }
    if text.len() == 8 && text.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y%m%d") {
            return Some(date);
        }
    }
    if let Some(time) = parse_zoned(&text) {
        return Some(time.date_naive());
    }
    if let Some(naive) = parse_naive(&text) {
        return Some(naive.date());
    }
    let captures = EMBEDDED_ISO_DATE.captures(&text)?;
    let year = captures.get(1)?.as_str().parse().ok()?;
    let month = captures.get(2)?.as_str().parse().ok()?;
    let day = captures.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses an instant out of free-form text. Text without an offset is
/// interpreted in `zone`; a bare date means midnight of that date.
pub fn parse_time(s: &str, zone: &LocalZone) -> Option<DateTime<FixedOffset>> {
    let text = normalize(s);
    if text.is_empty() {
        return None;
    }
    if let Some(time) = parse_zoned(&text) {
        return Some(time);
    }
    if let Some(naive) = parse_naive(&text) {
        return zone.localize(naive);
    }
    parse_date(&text).and_then(|date| zone.midnight(date))
}

fn parse_zoned(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time);
    }
    if let Ok(time) = DateTime::parse_from_rfc2822(text) {
        return Some(time);
    }
    let utc = UTC_SUFFIX.replace(text, " +0000");
    for candidate in [text, utc.as_ref()] {
        for format in ZONED_FORMATS {
            if let Ok(time) = DateTime::parse_from_str(candidate, format) {
                return Some(time);
            }
        }
    }
    None
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

// ------------- Time Zones -------------
/// A named zone from the canonical table, with its standard UTC offset.
///
/// The table carries no daylight saving rules. The offset helpers always
/// report standard time, which is what zone names are displayed with, and
/// are not meant for converting instants in summer.
#[derive(Clone, Copy, Eq)]
pub struct TimeZone {
    name: &'static str,
    identifier: &'static str,
    utc_offset: i32,
}

impl TimeZone {
    /// Looks a zone up by its canonical name, falling back to its tz identifier.
    pub fn find(name: &str) -> Option<TimeZone> {
        let name = name.trim();
        ZONES
            .iter()
            .find(|z| z.name == name)
            .or_else(|| ZONES.iter().find(|z| z.identifier == name))
            .copied()
    }
    pub fn all() -> &'static [TimeZone] {
        ZONES
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn identifier(&self) -> &'static str {
        self.identifier
    }
    /// Standard (non daylight saving) offset in seconds east of UTC.
    pub fn utc_offset(&self) -> i32 {
        self.utc_offset
    }
    /// The standard offset as a chrono offset.
    pub fn fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset).unwrap_or_else(|| Utc.fix())
    }
    /// The standard offset as `±HH:MM`.
    pub fn formatted_offset(&self) -> String {
        let sign = if self.utc_offset < 0 { '-' } else { '+' };
        let minutes = self.utc_offset.abs() / 60;
        format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
    }
}
impl PartialEq for TimeZone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(GMT{}) {}", self.formatted_offset(), self.name)
    }
}
impl fmt::Debug for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TimeZone({})", self.name)
    }
}

const H: i32 = 3600;

macro_rules! zones {
    ($(($name:expr, $identifier:expr, $offset:expr)),+ $(,)?) => {
        &[$(TimeZone { name: $name, identifier: $identifier, utc_offset: $offset }),+]
    };
}

static ZONES: &[TimeZone] = zones![
    ("International Date Line West", "Etc/GMT+12", -12 * H),
    ("American Samoa", "Pacific/Pago_Pago", -11 * H),
    ("Midway Island", "Pacific/Midway", -11 * H),
    ("Hawaii", "Pacific/Honolulu", -10 * H),
    ("Alaska", "America/Juneau", -9 * H),
    ("Pacific Time (US & Canada)", "America/Los_Angeles", -8 * H),
    ("Tijuana", "America/Tijuana", -8 * H),
    ("Arizona", "America/Phoenix", -7 * H),
    ("Mazatlan", "America/Mazatlan", -7 * H),
    ("Mountain Time (US & Canada)", "America/Denver", -7 * H),
    ("Central America", "America/Guatemala", -6 * H),
    ("Central Time (US & Canada)", "America/Chicago", -6 * H),
    ("Guadalajara", "America/Mexico_City", -6 * H),
    ("Mexico City", "America/Mexico_City", -6 * H),
    ("Monterrey", "America/Monterrey", -6 * H),
    ("Saskatchewan", "America/Regina", -6 * H),
    ("Bogota", "America/Bogota", -5 * H),
    ("Eastern Time (US & Canada)", "America/New_York", -5 * H),
    ("Indiana (East)", "America/Indiana/Indianapolis", -5 * H),
    ("Lima", "America/Lima", -5 * H),
    ("Quito", "America/Lima", -5 * H),
    ("Atlantic Time (Canada)", "America/Halifax", -4 * H),
    ("Caracas", "America/Caracas", -4 * H),
    ("Georgetown", "America/Guyana", -4 * H),
    ("La Paz", "America/La_Paz", -4 * H),
    ("Puerto Rico", "America/Puerto_Rico", -4 * H),
    ("Santiago", "America/Santiago", -4 * H),
    ("Newfoundland", "America/St_Johns", -12600),
    ("Brasilia", "America/Sao_Paulo", -3 * H),
    ("Buenos Aires", "America/Argentina/Buenos_Aires", -3 * H),
    ("Montevideo", "America/Montevideo", -3 * H),
    ("Mid-Atlantic", "Atlantic/South_Georgia", -2 * H),
    ("Azores", "Atlantic/Azores", -H),
    ("Cape Verde Is.", "Atlantic/Cape_Verde", -H),
    ("Dublin", "Europe/Dublin", 0),
    ("Edinburgh", "Europe/London", 0),
    ("Lisbon", "Europe/Lisbon", 0),
    ("London", "Europe/London", 0),
    ("Monrovia", "Africa/Monrovia", 0),
    ("UTC", "Etc/UTC", 0),
    ("Amsterdam", "Europe/Amsterdam", H),
    ("Belgrade", "Europe/Belgrade", H),
    ("Berlin", "Europe/Berlin", H),
    ("Bern", "Europe/Zurich", H),
    ("Bratislava", "Europe/Bratislava", H),
    ("Brussels", "Europe/Brussels", H),
    ("Budapest", "Europe/Budapest", H),
    ("Copenhagen", "Europe/Copenhagen", H),
    ("Ljubljana", "Europe/Ljubljana", H),
    ("Madrid", "Europe/Madrid", H),
    ("Paris", "Europe/Paris", H),
    ("Prague", "Europe/Prague", H),
    ("Rome", "Europe/Rome", H),
    ("Sarajevo", "Europe/Sarajevo", H),
    ("Skopje", "Europe/Skopje", H),
    ("Stockholm", "Europe/Stockholm", H),
    ("Vienna", "Europe/Vienna", H),
    ("Warsaw", "Europe/Warsaw", H),
    ("West Central Africa", "Africa/Algiers", H),
    ("Zagreb", "Europe/Zagreb", H),
    ("Zurich", "Europe/Zurich", H),
    ("Athens", "Europe/Athens", 2 * H),
    ("Bucharest", "Europe/Bucharest", 2 * H),
    ("Cairo", "Africa/Cairo", 2 * H),
    ("Harare", "Africa/Harare", 2 * H),
    ("Helsinki", "Europe/Helsinki", 2 * H),
    ("Jerusalem", "Asia/Jerusalem", 2 * H),
    ("Kaliningrad", "Europe/Kaliningrad", 2 * H),
    ("Kyiv", "Europe/Kiev", 2 * H),
    ("Pretoria", "Africa/Johannesburg", 2 * H),
    ("Riga", "Europe/Riga", 2 * H),
    ("Sofia", "Europe/Sofia", 2 * H),
    ("Tallinn", "Europe/Tallinn", 2 * H),
    ("Vilnius", "Europe/Vilnius", 2 * H),
    ("Baghdad", "Asia/Baghdad", 3 * H),
    ("Istanbul", "Europe/Istanbul", 3 * H),
    ("Kuwait", "Asia/Kuwait", 3 * H),
    ("Minsk", "Europe/Minsk", 3 * H),
    ("Moscow", "Europe/Moscow", 3 * H),
    ("Nairobi", "Africa/Nairobi", 3 * H),
    ("Riyadh", "Asia/Riyadh", 3 * H),
    ("St. Petersburg", "Europe/Moscow", 3 * H),
    ("Tehran", "Asia/Tehran", 12600),
    ("Abu Dhabi", "Asia/Muscat", 4 * H),
    ("Baku", "Asia/Baku", 4 * H),
    ("Muscat", "Asia/Muscat", 4 * H),
    ("Samara", "Europe/Samara", 4 * H),
    ("Tbilisi", "Asia/Tbilisi", 4 * H),
    ("Yerevan", "Asia/Yerevan", 4 * H),
    ("Kabul", "Asia/Kabul", 16200),
    ("Ekaterinburg", "Asia/Yekaterinburg", 5 * H),
    ("Islamabad", "Asia/Karachi", 5 * H),
    ("Karachi", "Asia/Karachi", 5 * H),
    ("Tashkent", "Asia/Tashkent", 5 * H),
    ("Chennai", "Asia/Kolkata", 19800),
    ("Kolkata", "Asia/Kolkata", 19800),
    ("Mumbai", "Asia/Kolkata", 19800),
    ("New Delhi", "Asia/Kolkata", 19800),
    ("Sri Jayawardenepura", "Asia/Colombo", 19800),
    ("Kathmandu", "Asia/Kathmandu", 20700),
    ("Dhaka", "Asia/Dhaka", 6 * H),
    ("Urumqi", "Asia/Urumqi", 6 * H),
    ("Rangoon", "Asia/Rangoon", 23400),
    ("Bangkok", "Asia/Bangkok", 7 * H),
    ("Hanoi", "Asia/Bangkok", 7 * H),
    ("Jakarta", "Asia/Jakarta", 7 * H),
    ("Krasnoyarsk", "Asia/Krasnoyarsk", 7 * H),
    ("Novosibirsk", "Asia/Novosibirsk", 7 * H),
    ("Beijing", "Asia/Shanghai", 8 * H),
    ("Chongqing", "Asia/Chongqing", 8 * H),
    ("Hong Kong", "Asia/Hong_Kong", 8 * H),
    ("Irkutsk", "Asia/Irkutsk", 8 * H),
    ("Kuala Lumpur", "Asia/Kuala_Lumpur", 8 * H),
    ("Perth", "Australia/Perth", 8 * H),
    ("Singapore", "Asia/Singapore", 8 * H),
    ("Taipei", "Asia/Taipei", 8 * H),
    ("Ulaanbaatar", "Asia/Ulaanbaatar", 8 * H),
    ("Osaka", "Asia/Tokyo", 9 * H),
    ("Sapporo", "Asia/Tokyo", 9 * H),
    ("Seoul", "Asia/Seoul", 9 * H),
    ("Tokyo", "Asia/Tokyo", 9 * H),
    ("Yakutsk", "Asia/Yakutsk", 9 * H),
    ("Adelaide", "Australia/Adelaide", 34200),
    ("Darwin", "Australia/Darwin", 34200),
    ("Brisbane", "Australia/Brisbane", 10 * H),
    ("Canberra", "Australia/Canberra", 10 * H),
    ("Guam", "Pacific/Guam", 10 * H),
    ("Hobart", "Australia/Hobart", 10 * H),
    ("Melbourne", "Australia/Melbourne", 10 * H),
    ("Port Moresby", "Pacific/Port_Moresby", 10 * H),
    ("Sydney", "Australia/Sydney", 10 * H),
    ("Vladivostok", "Asia/Vladivostok", 10 * H),
    ("Magadan", "Asia/Magadan", 11 * H),
    ("New Caledonia", "Pacific/Noumea", 11 * H),
    ("Solomon Is.", "Pacific/Guadalcanal", 11 * H),
    ("Auckland", "Pacific/Auckland", 12 * H),
    ("Fiji", "Pacific/Fiji", 12 * H),
    ("Kamchatka", "Asia/Kamchatka", 12 * H),
    ("Marshall Is.", "Pacific/Majuro", 12 * H),
    ("Wellington", "Pacific/Auckland", 12 * H),
    ("Chatham Is.", "Pacific/Chatham", 45900),
    ("Nuku'alofa", "Pacific/Tongatapu", 13 * H),
    ("Samoa", "Pacific/Apia", 13 * H),
    ("Tokelau Is.", "Pacific/Fakaofo", 13 * H),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spelled_out_dates() {
        assert_eq!(parse_date("March 9, 2010"), NaiveDate::from_ymd_opt(2010, 3, 9));
        assert_eq!(parse_date("Tue, March 9th 2010"), NaiveDate::from_ymd_opt(2010, 3, 9));
        assert_eq!(parse_date("9 Mar 2010"), NaiveDate::from_ymd_opt(2010, 3, 9));
        assert_eq!(parse_date("2013-02-20 05:39:45 -0500"), NaiveDate::from_ymd_opt(2013, 2, 20));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn parses_offsets_and_local_times() {
        let expected = DateTime::parse_from_rfc3339("2013-02-20T05:39:45-05:00").unwrap();
        let zone = LocalZone::System;
        assert_eq!(parse_time("2013-02-20 05:39:45 -0500", &zone), Some(expected));
        assert_eq!(parse_time("2013-02-20T05:39:45-05:00", &zone), Some(expected));
        let utc = LocalZone::from_offset_seconds(0).unwrap();
        let noon = DateTime::parse_from_rfc3339("2013-02-20T12:00:00+00:00").unwrap();
        assert_eq!(parse_time("2013-02-20 12:00:00", &utc), Some(noon));
        assert_eq!(parse_time("2013-02-20 12:00:00 UTC", &zone), Some(noon));
    }

    #[test]
    fn finds_zones_by_name_or_identifier() {
        let eastern = TimeZone::find("Eastern Time (US & Canada)").unwrap();
        assert_eq!(eastern.identifier(), "America/New_York");
        assert_eq!(eastern.formatted_offset(), "-05:00");
        assert_eq!(eastern.to_string(), "(GMT-05:00) Eastern Time (US & Canada)");
    }

    #[test]
    fn offsets_are_standard_time_all_year() {
        let eastern = TimeZone::find("America/New_York").unwrap();
        assert_eq!(eastern.fixed_offset(), FixedOffset::west_opt(5 * 3600).unwrap());
        let london = TimeZone::find("London").unwrap();
        assert_eq!(london.formatted_offset(), "+00:00");
        assert_eq!(london.fixed_offset().local_minus_utc(), 0);
        assert_eq!(TimeZone::find("America/New_York"), Some(eastern));
        assert!(TimeZone::find("Atlantis").is_none());
    }
}
