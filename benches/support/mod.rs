#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slset::{SkipList, Token};
use std::time::Duration;

pub fn usize_env(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn duration_env(name: &str, default_secs: f64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_secs);
    Duration::from_secs_f64(secs)
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x51_5e7)
}

/// Every entry has a distinct score, already in order.
pub fn unique_increasing(n: usize) -> Vec<(String, String)> {
    (0..n)
        .map(|i| (format!("{i:010}"), format!("member:{i}")))
        .collect()
}

/// Distinct members over a uniformly drawn score space.
pub fn uniform_random(n: usize, score_space: usize) -> Vec<(String, String)> {
    let mut rng = seeded_rng();
    (0..n)
        .map(|i| {
            let s = rng.gen_range(0..score_space);
            (format!("{s:010}"), format!("member:{i}"))
        })
        .collect()
}

/// Many members piled onto a handful of scores.
pub fn high_ties(n: usize) -> Vec<(String, String)> {
    let mut rng = seeded_rng();
    (0..n)
        .map(|i| {
            let s = rng.gen_range(0..16u32);
            (format!("tied:{s:02}"), format!("member:{i}"))
        })
        .collect()
}

pub fn build_list(entries: &[(String, String)]) -> SkipList {
    let mut sl = SkipList::new();
    for (s, m) in entries {
        sl.upsert(Token::parse(s.as_bytes()), Token::parse(m.as_bytes()));
    }
    sl
}
