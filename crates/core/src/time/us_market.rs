use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

// Regular session in exchange-local wall-clock time: [09:30, 16:00).
const OPEN_HOUR: u32 = 9;
const OPEN_MINUTE: u32 = 30;
const CLOSE_HOUR: u32 = 16;

// Intraday polls land on this minute of each hour.
const POLL_MINUTE: i64 = 30;

pub fn is_market_open(now: NaiveDateTime) -> bool {
    (now.hour(), now.minute()) >= (OPEN_HOUR, OPEN_MINUTE) && now.hour() < CLOSE_HOUR
}

/// Next wall-clock boundary at which market status should be re-checked.
pub fn next_market_tick(now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();

    if (now.hour(), now.minute()) < (OPEN_HOUR, OPEN_MINUTE) {
        return at_half_past(today.and_time(NaiveTime::MIN), i64::from(OPEN_HOUR));
    }

    if now.hour() >= CLOSE_HOUR {
        let tomorrow = today.and_time(NaiveTime::MIN) + Duration::days(1);
        return at_half_past(tomorrow, i64::from(OPEN_HOUR));
    }

    let hour = i64::from(now.hour());
    if i64::from(now.minute()) < POLL_MINUTE {
        at_half_past(today.and_time(NaiveTime::MIN), hour)
    } else {
        at_half_past(today.and_time(NaiveTime::MIN), hour + 1)
    }
}

/// Wall-clock time in `tz` for the instant `now`.
pub fn market_local(now: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    now.with_timezone(&tz).naive_local()
}

/// Delay from `now` until the next market tick, evaluated in `tz`.
pub fn delay_until_next_tick(now: DateTime<Utc>, tz: Tz) -> std::time::Duration {
    let local = market_local(now, tz);
    let next_local = next_market_tick(local);

    // A boundary inside a DST gap has no instant; reuse the current offset.
    let next = match tz.from_local_datetime(&next_local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let offset = local - now.naive_utc();
            Utc.from_utc_datetime(&(next_local - offset))
        }
    };

    (next - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

fn at_half_past(midnight: NaiveDateTime, hour: i64) -> NaiveDateTime {
    midnight + Duration::hours(hour) + Duration::minutes(POLL_MINUTE)
}
