//! Airing-time math: broadcast slot `(HH:MM, timezone)` → absolute instant.
//!
//! The slot is taken on *today's date in the broadcast timezone*, so a title
//! airing at 01:00 JST is looked up on the Japanese calendar day, not the
//! local one.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use aniwa_core::types::TrackedAnime;

/// Errors raised while resolving a broadcast slot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AiringTimeError {
    #[error("invalid broadcast time \"{0}\"")]
    InvalidTime(String),

    #[error("unknown timezone \"{0}\"")]
    UnknownTimezone(String),

    #[error("{time} does not exist today in {timezone}")]
    NonexistentLocalTime { time: String, timezone: String },
}

/// A broadcast timezone: a fixed offset or a named IANA zone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BroadcastZone {
    Fixed(FixedOffset),
    Named(Tz),
}

/// Zero-pad a broadcast time to `HH:MM` (`"9:5"` → `"09:05"`).
pub fn normalize_time(raw: &str) -> Result<String, AiringTimeError> {
    let invalid = || AiringTimeError::InvalidTime(raw.to_string());

    let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let (h, m) = (h.trim(), m.trim());
    let is_field = |s: &str| (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    if !is_field(h) || !is_field(m) {
        return Err(invalid());
    }

    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(format!("{hour:02}:{minute:02}"))
}

/// Parse a broadcast timezone.
///
/// Accepts numeric offsets (`+9`, `-5`, `+09:00`, `+0930`), optionally prefixed
/// with `UTC`/`GMT`, the abbreviations `UTC`, `GMT`, `Z` and `JST`, and IANA
/// names (`Asia/Tokyo`).
pub fn parse_timezone(raw: &str) -> Result<BroadcastZone, AiringTimeError> {
    let unknown = || AiringTimeError::UnknownTimezone(raw.to_string());
    let tz = raw.trim();

    match tz.to_ascii_uppercase().as_str() {
        "" => return Err(unknown()),
        "UTC" | "GMT" | "Z" => return fixed(0).ok_or_else(unknown),
        "JST" => return fixed(9 * 3600).ok_or_else(unknown),
        _ => {}
    }

    let offset = tz
        .strip_prefix("UTC")
        .or_else(|| tz.strip_prefix("GMT"))
        .unwrap_or(tz);
    if offset.starts_with('+') || offset.starts_with('-') {
        return parse_offset(offset)
            .and_then(fixed)
            .ok_or_else(unknown);
    }

    Tz::from_str(tz).map(BroadcastZone::Named).map_err(|_| unknown())
}

fn fixed(seconds: i32) -> Option<BroadcastZone> {
    FixedOffset::east_opt(seconds).map(BroadcastZone::Fixed)
}

/// `+9`, `-05`, `+09:30`, `+0930` → seconds east of UTC.
fn parse_offset(raw: &str) -> Option<i32> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (h, m) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() <= 2 => (rest, "0"),
        None if rest.len() <= 4 => rest.split_at(rest.len() - 2),
        None => return None,
    };
    let hours: i32 = h.parse().ok()?;
    let minutes: i32 = m.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Absolute instant of today's broadcast slot.
pub fn airing_instant(
    time: &str,
    timezone: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AiringTimeError> {
    let normalized = normalize_time(time)?;
    let clock = NaiveTime::parse_from_str(&normalized, "%H:%M")
        .map_err(|_| AiringTimeError::InvalidTime(time.to_string()))?;

    let instant = match parse_timezone(timezone)? {
        BroadcastZone::Fixed(offset) => local_to_utc(&offset, now, clock),
        BroadcastZone::Named(tz) => local_to_utc(&tz, now, clock),
    };
    instant.ok_or_else(|| AiringTimeError::NonexistentLocalTime {
        time: normalized,
        timezone: timezone.to_string(),
    })
}

fn local_to_utc<Z: TimeZone>(zone: &Z, now: DateTime<Utc>, clock: NaiveTime) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(zone).date_naive();
    zone.from_local_datetime(&today.and_time(clock))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

// ─────────────────────────────────────────────
// Preview
// ─────────────────────────────────────────────

/// Resolved slot of one entry, for display.
#[derive(Clone, Debug, PartialEq)]
pub struct AiringPreview {
    pub title: String,
    pub ep: u32,
    pub time: Option<String>,
    pub timezone: String,
    pub instant: Option<DateTime<Utc>>,
    /// Milliseconds from `now`; negative when already aired.
    pub delay_ms: Option<i64>,
    pub error: Option<AiringTimeError>,
}

impl AiringPreview {
    pub fn is_upcoming(&self) -> bool {
        self.delay_ms.is_some_and(|d| d >= 0)
    }
}

/// Resolve every entry's slot without arming anything.
pub fn preview(entries: &[TrackedAnime], now: DateTime<Utc>) -> Vec<AiringPreview> {
    entries
        .iter()
        .map(|anime| {
            let data = &anime.broadcast_data;
            let resolved = airing_instant(&data.time, &data.timezone, now);
            AiringPreview {
                title: anime.title.clone(),
                ep: anime.ep,
                time: normalize_time(&data.time).ok(),
                timezone: data.timezone.clone(),
                instant: resolved.as_ref().ok().copied(),
                delay_ms: resolved
                    .as_ref()
                    .ok()
                    .map(|at| (*at - now).num_milliseconds()),
                error: resolved.err(),
            }
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_normalize_time() {
        assert_eq!(normalize_time("9:5").unwrap(), "09:05");
        assert_eq!(normalize_time("23:30").unwrap(), "23:30");
        assert_eq!(normalize_time(" 0:00 ").unwrap(), "00:00");
        assert_eq!(normalize_time("07:9").unwrap(), "07:09");
    }

    #[test]
    fn test_normalize_time_rejects_garbage() {
        for raw in ["", "9", "24:00", "12:60", "a:b", "123:00", "12:00:00", "-1:00"] {
            assert!(normalize_time(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_numeric_offsets() {
        let east = |s: i32| BroadcastZone::Fixed(FixedOffset::east_opt(s).unwrap());
        assert_eq!(parse_timezone("+9").unwrap(), east(9 * 3600));
        assert_eq!(parse_timezone("-5").unwrap(), east(-5 * 3600));
        assert_eq!(parse_timezone("+09:00").unwrap(), east(9 * 3600));
        assert_eq!(parse_timezone("+0930").unwrap(), east(9 * 3600 + 1800));
        assert_eq!(parse_timezone("UTC+9").unwrap(), east(9 * 3600));
        assert_eq!(parse_timezone("GMT-03:30").unwrap(), east(-(3 * 3600 + 1800)));
    }

    #[test]
    fn test_parse_named_zones() {
        assert_eq!(
            parse_timezone("UTC").unwrap(),
            BroadcastZone::Fixed(FixedOffset::east_opt(0).unwrap())
        );
        assert_eq!(
            parse_timezone("jst").unwrap(),
            BroadcastZone::Fixed(FixedOffset::east_opt(9 * 3600).unwrap())
        );
        assert_eq!(
            parse_timezone("Asia/Tokyo").unwrap(),
            BroadcastZone::Named(chrono_tz::Asia::Tokyo)
        );
    }

    #[test]
    fn test_parse_timezone_rejects_garbage() {
        for raw in ["", "+", "+25", "+9:75", "+12345", "Mars/Olympus", "9"] {
            assert!(parse_timezone(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_airing_instant_fixed_offset() {
        // 00:00 UTC is 09:00 in +9; the 09:05 slot is five minutes away.
        let now = utc("2024-05-01T00:00:00Z");
        let at = airing_instant("9:5", "+9", now).unwrap();
        assert_eq!(at, utc("2024-05-01T00:05:00Z"));
    }

    #[test]
    fn test_airing_instant_uses_broadcast_calendar_day() {
        // 20:00 UTC on Apr 30 is already May 1 in Tokyo; 23:00 JST May 1 = 14:00 UTC May 1.
        let now = utc("2024-04-30T20:00:00Z");
        let at = airing_instant("23:00", "Asia/Tokyo", now).unwrap();
        assert_eq!(at, utc("2024-05-01T14:00:00Z"));
    }

    #[test]
    fn test_airing_instant_in_the_past() {
        let now = utc("2024-05-01T01:00:00Z");
        let at = airing_instant("09:05", "JST", now).unwrap();
        assert!(at < now);
    }

    #[test]
    fn test_airing_instant_dst_gap() {
        // 02:30 does not exist in New York on 2024-03-10.
        let now = utc("2024-03-10T12:00:00Z");
        let err = airing_instant("2:30", "America/New_York", now).unwrap_err();
        assert!(matches!(err, AiringTimeError::NonexistentLocalTime { .. }));
    }

    #[test]
    fn test_preview() {
        let now = utc("2024-05-01T00:00:00Z");
        let entries = vec![
            TrackedAnime::new("Upcoming", 5, "9:5", "+9"),
            TrackedAnime::new("Aired", 2, "08:00", "+9"),
            TrackedAnime::new("Broken", 1, "25:00", "+9"),
        ];
        let rows = preview(&entries, now);

        assert_eq!(rows[0].time.as_deref(), Some("09:05"));
        assert_eq!(rows[0].delay_ms, Some(300_000));
        assert!(rows[0].is_upcoming());

        assert!(!rows[1].is_upcoming());
        assert_eq!(rows[1].delay_ms, Some(-3_600_000));

        assert!(rows[2].error.is_some());
        assert!(rows[2].instant.is_none());
        assert!(!rows[2].is_upcoming());
    }
}
