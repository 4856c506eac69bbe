use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub available: bool,
}

/// Daily bookable window. Both ends are candidate slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub step_minutes: u32,
}

impl Default for OperatingWindow {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            step_minutes: 30,
        }
    }
}

impl OperatingWindow {
    pub fn times(&self) -> impl Iterator<Item = NaiveTime> + '_ {
        let step = Duration::minutes(i64::from(self.step_minutes.max(1)));
        let close = self.close;
        std::iter::successors(Some(self.open), move |t| {
            let (next, wrapped) = t.overflowing_add_signed(step);
            (wrapped == 0 && next <= close).then_some(next)
        })
        .take_while(move |t| *t <= close)
    }

    pub fn instants(&self, date: NaiveDate) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.times().map(move |t| date.and_time(t))
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.times().any(|t| t == time)
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}
