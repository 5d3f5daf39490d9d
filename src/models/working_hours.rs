use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => Day::Mon,
            Weekday::Tue => Day::Tue,
            Weekday::Wed => Day::Wed,
            Weekday::Thu => Day::Thu,
            Weekday::Fri => Day::Fri,
            Weekday::Sat => Day::Sat,
            Weekday::Sun => Day::Sun,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
            Day::Sun => "Sun",
        }
    }
}

/// A range of wall-clock time on one weekday, `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub day: Day,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(day: Day, start: NaiveTime, end: NaiveTime) -> Self {
        Self { day, start, end }
    }

    /// True when `[start, end)` lies fully inside this window on its weekday.
    pub fn contains(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> bool {
        start.date() == end.date()
            && Day::of(start.date()) == self.day
            && start.time() >= self.start
            && end.time() <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub doctor_id: String,
    pub windows: Vec<TimeWindow>,
    pub is_default: bool,
}

pub fn default_day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn default_day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl WorkingHours {
    /// 09:00-17:00 on every day of the week.
    pub fn default_for(doctor_id: &str) -> Self {
        Self {
            doctor_id: doctor_id.to_string(),
            windows: Day::ALL
                .iter()
                .map(|day| TimeWindow::new(*day, default_day_start(), default_day_end()))
                .collect(),
            is_default: true,
        }
    }

    pub fn configured(doctor_id: &str, mut windows: Vec<TimeWindow>) -> Self {
        windows.sort_by_key(|w| (w.day, w.start, w.end));
        Self {
            doctor_id: doctor_id.to_string(),
            windows,
            is_default: false,
        }
    }

    pub fn windows_on(&self, date: NaiveDate) -> impl Iterator<Item = &TimeWindow> {
        let day = Day::of(date);
        self.windows.iter().filter(move |w| w.day == day)
    }

    pub fn contains(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> bool {
        self.windows.iter().any(|w| w.contains(start, end))
    }

    pub fn to_human_readable(&self) -> String {
        self.windows
            .iter()
            .map(|w| {
                format!(
                    "{}: {}-{}",
                    w.day.label(),
                    w.start.format("%H:%M"),
                    w.end.format("%H:%M")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn validate_windows(windows: &[TimeWindow]) -> Result<(), String> {
    for w in windows {
        if w.start >= w.end {
            return Err(format!(
                "window on {} must start before it ends ({}-{})",
                w.day.label(),
                w.start.format("%H:%M"),
                w.end.format("%H:%M")
            ));
        }
    }
    Ok(())
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|_| serde::de::Error::custom(format!("invalid time: {raw}")))
    }
}
