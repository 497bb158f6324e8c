use anyhow::{Context, Result, bail};
use std::collections::HashSet;

const DEFAULT_SEED: u64 = 1337;
const MAX_RANGE_SEEDS: u64 = 10_000;

/// Resolve CLI seed tokens into a deduplicated seed list.
///
/// Accepts decimal integers (negative values use their magnitude), `0x` hex
/// literals and inclusive ranges written `start..end`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        for seed in parse_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_token(token: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = token.split_once("..") {
        let start = parse_single(start)?;
        let end = parse_single(end)?;
        if end < start {
            bail!("Seed range {token} runs backwards");
        }
        if end - start >= MAX_RANGE_SEEDS {
            bail!("Seed range {token} spans more than {MAX_RANGE_SEEDS} seeds");
        }
        return Ok((start..=end).collect());
    }
    Ok(vec![parse_single(token)?])
}

fn parse_single(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .with_context(|| format!("Unrecognized hex seed: {token}"));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    token
        .parse::<u64>()
        .with_context(|| format!("Unrecognized seed token: {token}"))
}
