use chrono::{Duration, NaiveDate};

/// Consecutive active days ending at `today`.
///
/// Counting starts at today and walks backward one day at a time; the first
/// missing day ends the streak. A student whose latest activity was
/// yesterday therefore has a streak of 0. Dates after `today` and duplicates
/// are ignored.
pub fn current_streak(activity_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut dates: Vec<NaiveDate> = activity_dates
        .iter()
        .copied()
        .filter(|date| *date <= today)
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let mut streak = 0;
    for (offset, date) in dates.iter().enumerate() {
        if *date == today - Duration::days(offset as i64) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}
