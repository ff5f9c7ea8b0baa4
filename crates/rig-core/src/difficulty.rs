//! Scoring helpers for the leading-zero search.
//!
//! There is no real target comparison: a digest is scored only by its
//! leading zero bits, and a score at or above the configured threshold is a
//! solution.

use alloc::string::String;

/// Highest possible score (an all-zero digest).
pub const MAX_SCORE: u32 = 256;

/// Whether `score` counts as a solution for `threshold`.
#[inline]
pub fn is_solution(score: u32, threshold: u32) -> bool {
    score >= threshold
}

/// Average iterations needed to see a digest with at least `score` leading
/// zero bits.
pub fn expected_iterations(score: u32) -> f64 {
    pow2_f64(score.min(MAX_SCORE) as i32)
}

/// Compute 2^exp for f64, no_std compatible.
fn pow2_f64(exp: i32) -> f64 {
    let mut value = 1.0f64;
    if exp >= 0 {
        for _ in 0..exp {
            value *= 2.0;
        }
    } else {
        for _ in 0..(-exp) {
            value /= 2.0;
        }
    }
    value
}

/// Format a rate for display (e.g., "1.23 KH/s").
pub fn format_rate(rate: f64) -> String {
    if rate >= 1e9 {
        alloc::format!("{:.2} GH/s", rate / 1e9)
    } else if rate >= 1e6 {
        alloc::format!("{:.2} MH/s", rate / 1e6)
    } else if rate >= 1e3 {
        alloc::format!("{:.2} KH/s", rate / 1e3)
    } else {
        alloc::format!("{:.1} H/s", rate)
    }
}

/// Format a large count with a unit suffix (e.g., "4.29G").
pub fn format_count(count: f64) -> String {
    if count >= 1e15 {
        alloc::format!("{:.2}P", count / 1e15)
    } else if count >= 1e12 {
        alloc::format!("{:.2}T", count / 1e12)
    } else if count >= 1e9 {
        alloc::format!("{:.2}G", count / 1e9)
    } else if count >= 1e6 {
        alloc::format!("{:.2}M", count / 1e6)
    } else if count >= 1e3 {
        alloc::format!("{:.2}K", count / 1e3)
    } else {
        alloc::format!("{:.0}", count)
    }
}
