use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Trailing news window length in days, today included.
pub const NEWS_WINDOW_DAYS: i64 = 7;

/// KST wall clock time. Korea has no DST, so KST is a fixed +09:00 offset.
pub fn now_kst(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDateTime> {
    let kst = chrono::FixedOffset::east_opt(KST_OFFSET_SECS).context("invalid KST offset")?;
    Ok(now_utc.with_timezone(&kst).naive_local())
}

pub fn today_kst(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    Ok(now_kst(now_utc)?.date())
}

/// `(today - 6 days, today)`, both inclusive.
pub fn news_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(NEWS_WINDOW_DAYS - 1), today)
}

/// Accepts `YYYY-MM-DD`; falls back to today in KST.
pub fn resolve_collection_date(
    date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    match date_arg {
        Some(s) => Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
        None => today_kst(now_utc),
    }
}

/// Parses feed `YYYYMMDD` + `HHMMSS` into a KST wall clock time.
pub fn parse_feed_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn today_rolls_over_at_kst_midnight() {
        // 2026-10-15 15:30 UTC = 2026-10-16 00:30 KST
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 15, 30, 0).unwrap();
        assert_eq!(today_kst(now).unwrap(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());

        let before = Utc.with_ymd_and_hms(2026, 10, 15, 14, 59, 0).unwrap();
        assert_eq!(today_kst(before).unwrap(), NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
    }

    #[test]
    fn kst_is_nine_hours_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 23, 45, 10).unwrap();
        assert_eq!(now_kst(now).unwrap().to_string(), "2026-10-16 08:45:10");
    }

    #[test]
    fn window_spans_seven_days_inclusive() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 3).unwrap();
        let (start, end) = news_window(today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 9, 27).unwrap());
        assert_eq!(end, today);
        assert_eq!((end - start).num_days() + 1, NEWS_WINDOW_DAYS);
    }

    #[test]
    fn feed_timestamps() {
        let ts = parse_feed_timestamp("20261012", "093015").unwrap();
        assert_eq!(ts.to_string(), "2026-10-12 09:30:15");
        assert!(parse_feed_timestamp("2026-10-12", "000000").is_none());
        assert!(parse_feed_timestamp("20261012", "").is_none());
    }

    #[test]
    fn explicit_collection_date_wins() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        let d = resolve_collection_date(Some("2026-09-01"), now).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
        assert!(resolve_collection_date(Some("20260901"), now).is_err());
    }
}
