use serde::{Deserialize, Deserializer, Serializer};
use time::{Time, macros::format_description};

pub fn serialize<S>(value: &Time, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value
		.format(format_description!("[hour]:[minute]"))
		.map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse_hh_mm(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time {raw:?}")))
}

/// Accepts `H:MM` or `HH:MM` on a 24-hour clock.
pub fn parse_hh_mm(raw: &str) -> Option<Time> {
	let (hour, minute) = raw.trim().split_once(':')?;

	if minute.len() != 2 {
		return None;
	}

	let hour = hour.parse::<u8>().ok()?;
	let minute = minute.parse::<u8>().ok()?;

	Time::from_hms(hour, minute, 0).ok()
}
