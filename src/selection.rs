//! Candidate pool loading and run id selection.
//!
//! The pool comes from a headerless CSV with one run id per row. Selection draws a
//! seeded sample without replacement and unions in any explicitly requested ids.

use anyhow::{bail, ensure, Context, Result};
use rand::seq::index;
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

/// Read the candidate pool from the first column of a headerless CSV file.
pub fn load_pool(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read run ids file {}", path.display()))?;
    let pool = parse_pool(&raw)
        .with_context(|| format!("failed to parse run ids file {}", path.display()))?;
    tracing::debug!(path = %path.display(), pool_size = pool.len(), "loaded candidate pool");
    Ok(pool)
}

/// Parse CSV text into run ids, one per non-blank row, in file order.
///
/// Duplicate rows are kept; the pool size is the row count.
pub fn parse_pool(raw: &str) -> Result<Vec<String>> {
    let mut pool = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let id = first_field(line).with_context(|| format!("row {}", idx + 1))?;
        pool.push(id);
    }
    Ok(pool)
}

/// First column of a non-blank CSV row. Quoted fields may contain commas and `""`.
fn first_field(line: &str) -> Result<String> {
    let Some(rest) = line.strip_prefix('"') else {
        let field = line.split(',').next().unwrap_or_default();
        ensure!(!field.is_empty(), "empty run id in first column");
        return Ok(field.to_string());
    };

    let mut field = String::new();
    let mut chars = rest.chars();
    loop {
        match chars.next() {
            Some('"') if chars.as_str().starts_with('"') => {
                chars.next();
                field.push('"');
            }
            Some('"') => break,
            Some(c) => field.push(c),
            None => bail!("unterminated quoted field"),
        }
    }
    let tail = chars.as_str();
    if !tail.is_empty() && !tail.starts_with(',') {
        bail!("unexpected text {tail:?} after closing quote");
    }
    ensure!(!field.is_empty(), "empty run id in first column");
    Ok(field)
}

/// Draw `n` run ids uniformly at random without replacement.
///
/// The draw is fully determined by the pool order and the generator state.
pub fn sample<R: Rng + ?Sized>(pool: &[String], n: usize, rng: &mut R) -> Result<Vec<String>> {
    ensure!(
        n <= pool.len(),
        "cannot sample {} run ids without replacement from a pool of {}",
        n,
        pool.len()
    );
    Ok(index::sample(rng, pool.len(), n)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect())
}

/// Union the sample with extra ids. Sampled ids keep draw order, new extras follow.
pub fn merge(sampled: Vec<String>, extras: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(sampled.len() + extras.len());
    sampled
        .into_iter()
        .chain(extras.iter().cloned())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Split a comma-separated flag value. Elements are passed through untouched.
pub fn split_comma_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}
