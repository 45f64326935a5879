use chrono::{
  DateTime,
  Datelike,
  Duration,
  FixedOffset,
  Month,
  NaiveDate,
  Timelike,
  Utc,
  Weekday
};
use chrono_tz::Tz;

const WEEKDAY_LABELS: [&str; 7] =
  ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// Number of whole calendar days from
/// `start` to `date`. Negative when `date`
/// is earlier. Works on dates only, so
/// DST shifts never move an entry.
#[must_use]
pub fn day_offset(
  start: NaiveDate,
  date: NaiveDate
) -> i64 {
  date
    .signed_duration_since(start)
    .num_days()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

pub fn parse_weekday(
  raw: &str
) -> Option<Weekday> {
  raw.trim().parse::<Weekday>().ok()
}

/// Two-letter weekday headings in grid
/// column order.
pub fn weekday_labels(
  week_start: Weekday
) -> Vec<&'static str> {
  let offset = week_start
    .num_days_from_monday()
    as usize;
  (0..7)
    .map(|col| {
      WEEKDAY_LABELS[(offset + col) % 7]
    })
    .collect()
}

pub fn month_name(
  date: NaiveDate
) -> &'static str {
  u8::try_from(date.month())
    .ok()
    .and_then(|m| {
      Month::try_from(m).ok()
    })
    .map(|m| m.name())
    .unwrap_or("")
}

/// Short start-time label: `09:05` in
/// 24-hour mode, `9:05am` / `12pm`
/// otherwise.
#[must_use]
pub fn format_time_label(
  at: &DateTime<FixedOffset>,
  is_24_hour: bool
) -> String {
  if is_24_hour {
    return at.format("%H:%M").to_string();
  }

  let (is_pm, hour) = at.hour12();
  let suffix =
    if is_pm { "pm" } else { "am" };
  if at.minute() == 0 {
    format!("{hour}{suffix}")
  } else {
    format!(
      "{hour}:{:02}{suffix}",
      at.minute()
    )
  }
}

pub fn parse_timezone(
  raw: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      "timezone value was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(err) => {
      tracing::warn!(
        timezone = %trimmed,
        error = %err,
        "invalid timezone"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  Utc::now().with_timezone(&tz).date_naive()
}

#[must_use]
pub fn now_in(
  tz: Tz
) -> DateTime<FixedOffset> {
  Utc::now().with_timezone(&tz).fixed_offset()
}
