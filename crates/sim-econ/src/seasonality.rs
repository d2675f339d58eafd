//! Calendar seasonality: month, weekday, holiday and category effects.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Monthly multipliers, January first. Holiday peak in Nov–Dec.
pub const MONTHLY: [f64; 12] = [
    0.80, 0.82, 0.90, 0.95, 1.00, 1.05, 1.02, 0.98, 1.00, 1.10, 1.30, 1.40,
];

/// Weekday multipliers, Monday first.
pub const DAY_OF_WEEK: [f64; 7] = [1.10, 1.05, 1.00, 1.00, 1.15, 0.85, 0.75];

/// Multiplier applied on demand-spike holidays.
pub const HOLIDAY_MULTIPLIER: f64 = 1.25;

/// (month, day) pairs with a demand spike: New Year, July 4th, the
/// Thanksgiving/Black Friday weekend and Christmas.
const SPIKE_DAYS: [(u32, u32); 7] = [(1, 1), (7, 4), (11, 24), (11, 25), (11, 26), (11, 27), (12, 25)];

/// US holidays flagged in the calendar dimension (fixed approximations).
pub const US_HOLIDAYS: [(u32, u32); 8] = [
    (1, 1),
    (1, 17),
    (2, 21),
    (5, 30),
    (7, 4),
    (9, 5),
    (11, 24),
    (12, 25),
];

/// Extra multiplier for a category in a given month (1.0 when none).
pub fn category_boost(category: &str, month: u32) -> f64 {
    let boosts: &[(u32, f64)] = match category {
        "Electronics" => &[(11, 1.4), (12, 1.6)],
        "Toys" => &[(11, 1.5), (12, 1.8)],
        "Apparel" => &[(3, 1.2), (4, 1.2), (9, 1.3)],
        "Home & Garden" => &[(4, 1.3), (5, 1.4), (6, 1.3)],
        "Health" => &[(1, 1.3), (2, 1.2)],
        "Sports" => &[(5, 1.2), (6, 1.3), (7, 1.3)],
        "Beauty" => &[(2, 1.2), (12, 1.3)],
        _ => &[],
    };
    boosts
        .iter()
        .find(|(m, _)| *m == month)
        .map_or(1.0, |(_, b)| *b)
}

/// Whether `date` carries the holiday demand spike.
pub fn is_spike_day(date: NaiveDate) -> bool {
    SPIKE_DAYS.contains(&(date.month(), date.day()))
}

/// Combined demand multiplier for `date`, optionally for one category.
///
/// Example:
/// // Friday 2022-12-02: 1.40 (Dec) × 1.15 (Fri)
/// let m = demand_multiplier(NaiveDate::from_ymd_opt(2022, 12, 2).unwrap(), None);
pub fn demand_multiplier(date: NaiveDate, category: Option<&str>) -> f64 {
    let month = date.month();
    let mut m = MONTHLY[month as usize - 1];
    m *= DAY_OF_WEEK[date.weekday().num_days_from_monday() as usize];
    if is_spike_day(date) {
        m *= HOLIDAY_MULTIPLIER;
    }
    if let Some(cat) = category {
        m *= category_boost(cat, month);
    }
    m
}

/// Number of orders placed on `date`: base × seasonality × N(1, 0.1)
/// clamped to [0.8, 1.2], truncated, at least 1.
pub fn daily_order_count<R: Rng + ?Sized>(base: u32, date: NaiveDate, rng: &mut R) -> u32 {
    let noise = clamped_normal(rng, 1.0, 0.10, 0.8, 1.2);
    let count = (base as f64 * demand_multiplier(date, None) * noise) as u32;
    count.max(1)
}

/// Draw from N(mean, std) clamped to [lo, hi].
///
/// A degenerate spread (zero, negative or non-finite) returns `mean`
/// clamped, without consuming randomness.
pub fn clamped_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64, lo: f64, hi: f64) -> f64 {
    match Normal::new(mean, std) {
        Ok(n) if std > 0.0 => n.sample(rng).clamp(lo, hi),
        _ => mean.clamp(lo, hi),
    }
}
