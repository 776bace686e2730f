//! Scoring decision tables. Thresholds are behavior-compatible with the
//! deployed detector; do not tidy them.

/// (denomination in ZEC, remainder tolerance in ZEC, points), largest first.
pub const ROUND_DENOMINATIONS: [(f64, f64, u32); 6] = [
    (1000.0, 0.01, 20),
    (500.0, 0.01, 18),
    (100.0, 0.01, 15),
    (50.0, 0.01, 12),
    (10.0, 0.01, 10),
    (1.0, 0.001, 5),
];

/// Points awarded when no denomination matches but the amounts are
/// near-identical anyway (uniformity ≥ 10): a repeated odd amount is its own
/// fingerprint.
pub const NON_ROUND_IDENTICAL_BONUS: u32 = 8;

pub fn size_points(count: usize) -> u32 {
    if count >= 12 {
        30
    } else if count >= 8 {
        22
    } else if count >= 5 {
        15
    } else {
        10
    }
}

pub fn uniformity_points(cv: f64) -> u32 {
    if cv < 0.0001 {
        15
    } else if cv < 0.001 {
        10
    } else if cv < 0.01 {
        5
    } else {
        0
    }
}

/// Walk the denomination ladder from largest to smallest; the first rung the
/// amount sits on wins. Falls back to the identical-amount bonus.
pub fn round_points(amount_zec: f64, uniformity_points: u32) -> u32 {
    for &(denom, tolerance, points) in &ROUND_DENOMINATIONS {
        if amount_zec >= denom && amount_zec % denom < tolerance {
            return points;
        }
    }
    if uniformity_points >= 10 {
        NON_ROUND_IDENTICAL_BONUS
    } else {
        0
    }
}

/// "Round" for explanation purposes means a rung worth ≥ 10 points; the 1-ZEC
/// rung and the identical-amount bonus do not qualify.
pub fn is_round(round_points: u32) -> bool {
    round_points >= 10
}

pub fn time_points(span_hours: f64) -> u32 {
    if span_hours < 6.0 {
        12
    } else if span_hours < 24.0 {
        10
    } else if span_hours < 72.0 {
        6
    } else if span_hours < 168.0 {
        3
    } else {
        0
    }
}

/// Points for a found funding match, from the percent difference between the
/// cluster total and the shield amount. No match scores 0 (handled upstream).
pub fn match_points(diff_pct: f64) -> u32 {
    if diff_pct < 0.01 {
        25
    } else if diff_pct < 0.1 {
        22
    } else if diff_pct < 1.0 {
        18
    } else if diff_pct < 5.0 {
        12
    } else {
        5
    }
}
