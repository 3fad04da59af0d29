use chrono::NaiveDate;

/// Consecutive completed days ending today, or yesterday when today is not
/// done yet.
///
/// Input order does not matter and duplicates are ignored. Dates after
/// `today` are not counted.
pub fn current_streak<'a, I>(dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    let mut dates: Vec<NaiveDate> = dates.into_iter().copied().filter(|d| *d <= today).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let Some(&latest) = dates.first() else {
        return 0;
    };
    if (today - latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1u32;
    for window in dates.windows(2) {
        if (window[0] - window[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Longest run of consecutive days anywhere in the history.
pub fn longest_run<'a, I>(dates: I) -> u32
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    let mut dates: Vec<NaiveDate> = dates.into_iter().copied().collect();
    if dates.is_empty() {
        return 0;
    }
    dates.sort_unstable();
    dates.dedup();

    let mut best = 1u32;
    let mut current = 1u32;
    for window in dates.windows(2) {
        if (window[1] - window[0]).num_days() == 1 {
            current += 1;
            best = best.max(current);
        } else {
            current = 1;
        }
    }
    best
}
