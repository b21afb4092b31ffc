use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{PipelineError, Result};

/// Break-point detection tests the runner knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    Pettitt,
    Snht,
    BuishandRange,
}

// Legacy workflow definitions spell two of the tests "pettit" and "shnt";
// both spellings resolve to the same tests.
static TEST_ALIASES: Lazy<HashMap<&'static str, TestKind>> = Lazy::new(|| {
    HashMap::from([
        ("pettitt", TestKind::Pettitt),
        ("pettit", TestKind::Pettitt),
        ("snht", TestKind::Snht),
        ("shnt", TestKind::Snht),
        ("buishand", TestKind::BuishandRange),
        ("buishand_range", TestKind::BuishandRange),
    ])
});

impl TestKind {
    pub fn parse(name: &str) -> Option<TestKind> {
        TEST_ALIASES
            .get(name.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Pettitt => "pettitt",
            TestKind::Snht => "snht",
            TestKind::BuishandRange => "buishand",
        }
    }

    /// Column heading used in the side-by-side report file.
    pub fn report_label(&self) -> &'static str {
        match self {
            TestKind::Pettitt => "Pettit Test",
            TestKind::Snht => "SNHT Test",
            TestKind::BuishandRange => "Buishand Test",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a test selection. Every supplied name must be recognized and at
/// least one test must be selected; duplicates collapse, keeping order.
pub fn parse_tests(names: &[String]) -> Result<Vec<TestKind>> {
    if names.is_empty() {
        return Err(PipelineError::InvalidParameter(
            "select at least one homogeneity test".to_string(),
        ));
    }
    let mut tests = Vec::new();
    for name in names {
        let kind = TestKind::parse(name).ok_or_else(|| {
            PipelineError::InvalidParameter(format!(
                "'{name}' is not a recognized homogeneity test (expected pettitt, snht or buishand)"
            ))
        })?;
        if !tests.contains(&kind) {
            tests.push(kind);
        }
    }
    Ok(tests)
}

#[derive(Debug, Clone, Copy)]
pub struct HomogeneityOptions {
    /// Significance level the p-value is compared against.
    pub alpha: f64,
    /// Monte Carlo sample count for the p-value.
    pub simulations: usize,
    /// Fixing the seed makes reruns bit-identical.
    pub seed: Option<u64>,
}

impl Default for HomogeneityOptions {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            simulations: 10_000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomogeneityResult {
    pub test: TestKind,
    pub homogeneous: bool,
    /// Last date of the first segment.
    pub change_point: NaiveDate,
    pub p_value: f64,
    pub statistic: f64,
    pub mean_before: f64,
    pub mean_after: f64,
}

/// Run the selected tests over one series column. Null entries are skipped;
/// the tests see the remaining (date, value) pairs in order.
pub fn run_tests(
    dates: &[NaiveDate],
    values: &[Option<f64>],
    tests: &[TestKind],
    options: &HomogeneityOptions,
) -> Result<Vec<HomogeneityResult>> {
    let mut observed_dates: Vec<NaiveDate> = Vec::with_capacity(values.len());
    let mut xs: Vec<f64> = Vec::with_capacity(values.len());
    for (date, value) in dates.iter().zip(values) {
        if let Some(value) = value {
            observed_dates.push(*date);
            xs.push(*value);
        }
    }

    if xs.len() < 3 {
        return Err(PipelineError::Processing(format!(
            "homogeneity tests need at least 3 observations, found {}",
            xs.len()
        )));
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    tests
        .iter()
        .map(|kind| run_single(*kind, &observed_dates, &xs, options, &mut rng))
        .collect()
}

fn run_single(
    kind: TestKind,
    dates: &[NaiveDate],
    xs: &[f64],
    options: &HomogeneityOptions,
    rng: &mut StdRng,
) -> Result<HomogeneityResult> {
    let stat_fn: fn(&[f64]) -> (f64, usize) = match kind {
        TestKind::Pettitt => pettitt_statistic,
        TestKind::Snht => snht_statistic,
        TestKind::BuishandRange => buishand_statistic,
    };

    let (statistic, loc) = stat_fn(xs);
    let p_value = monte_carlo_p(stat_fn, statistic, xs.len(), options.simulations, rng);

    Ok(HomogeneityResult {
        test: kind,
        homogeneous: p_value >= options.alpha,
        change_point: dates[loc - 1],
        p_value,
        statistic,
        mean_before: mean(&xs[..loc]),
        mean_after: mean(&xs[loc..]),
    })
}

/// Share of standard-normal series of the same length whose statistic
/// exceeds the observed one.
fn monte_carlo_p(
    stat_fn: fn(&[f64]) -> (f64, usize),
    observed: f64,
    n: usize,
    simulations: usize,
    rng: &mut StdRng,
) -> f64 {
    if simulations == 0 {
        return 1.0;
    }
    let mut exceeded = 0usize;
    let mut sample = vec![0.0f64; n];
    for _ in 0..simulations {
        for slot in sample.iter_mut() {
            *slot = StandardNormal.sample(rng);
        }
        if stat_fn(&sample).0 > observed {
            exceeded += 1;
        }
    }
    exceeded as f64 / simulations as f64
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_std(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let ss: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum();
    (ss / (xs.len() - 1) as f64).sqrt()
}

fn population_std(xs: &[f64], mean: f64) -> f64 {
    let ss: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum();
    (ss / xs.len() as f64).sqrt()
}

/// Ranks with ties averaged, as the rank-based Pettitt statistic requires.
fn average_ranks(xs: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut stop = start;
        while stop + 1 < n && xs[order[stop + 1]] == xs[order[start]] {
            stop += 1;
        }
        let rank = (start + stop) as f64 / 2.0 + 1.0;
        for idx in start..=stop {
            ranks[order[idx]] = rank;
        }
        start = stop + 1;
    }
    ranks
}

/// Pettitt: U_t = 2 * sum(r_1..r_t) - t(n+1); statistic max|U_t|.
fn pettitt_statistic(xs: &[f64]) -> (f64, usize) {
    let n = xs.len();
    let nf = n as f64;
    let ranks = average_ranks(xs);

    let mut cumulative = 0.0;
    let mut best = 0.0;
    let mut loc = 1usize;
    for t in 1..n {
        cumulative += ranks[t - 1];
        let u = 2.0 * cumulative - t as f64 * (nf + 1.0);
        if u.abs() > best {
            best = u.abs();
            loc = t;
        }
    }
    (best, loc)
}

/// SNHT: T_k = k*z1^2 + (n-k)*z2^2 over the standardized series.
fn snht_statistic(xs: &[f64]) -> (f64, usize) {
    let n = xs.len();
    let m = mean(xs);
    let sd = sample_std(xs, m);
    if sd == 0.0 {
        return (0.0, 1);
    }

    let total: f64 = xs.iter().map(|x| (x - m) / sd).sum();
    let mut prefix = 0.0;
    let mut best = 0.0;
    let mut loc = 1usize;
    for k in 1..n {
        prefix += (xs[k - 1] - m) / sd;
        let z1 = prefix / k as f64;
        let z2 = (total - prefix) / (n - k) as f64;
        let t = k as f64 * z1 * z1 + (n - k) as f64 * z2 * z2;
        if t > best {
            best = t;
            loc = k;
        }
    }
    (best, loc)
}

/// Buishand range: rescaled range of the adjusted partial sums,
/// R = (max S - min S) / (sigma * sqrt(n)); change point at max|S_k|.
fn buishand_statistic(xs: &[f64]) -> (f64, usize) {
    let n = xs.len();
    let nf = n as f64;
    let m = mean(xs);
    let sd = population_std(xs, m);
    if sd == 0.0 {
        return (0.0, 1);
    }

    let mut partial = 0.0;
    let mut s_max = f64::NEG_INFINITY;
    let mut s_min = f64::INFINITY;
    let mut best_abs = 0.0;
    let mut loc = 1usize;
    for k in 1..=n {
        partial += xs[k - 1] - m;
        if partial > s_max {
            s_max = partial;
        }
        if partial < s_min {
            s_min = partial;
        }
        if k < n && partial.abs() > best_abs {
            best_abs = partial.abs();
            loc = k;
        }
    }
    ((s_max - s_min) / (sd * nf.sqrt()), loc)
}
