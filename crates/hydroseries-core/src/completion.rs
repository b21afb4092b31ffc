use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::series::StationSeries;

/// Criterion used to rank the analysis stations before filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priorize {
    R2,
    Slope,
    Pair,
}

impl Priorize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priorize::R2 => "r2",
            Priorize::Slope => "slope",
            Priorize::Pair => "pair",
        }
    }
}

impl fmt::Display for Priorize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priorize {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "r2" => Ok(Priorize::R2),
            "slope" => Ok(Priorize::Slope),
            "pair" => Ok(Priorize::Pair),
            other => Err(PipelineError::InvalidParameter(format!(
                "'{other}' is not a valid completion criterion (expected r2, slope or pair)"
            ))),
        }
    }
}

/// Regression between the target and one analysis station over their shared
/// non-null dates.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRegression {
    pub station: String,
    pub r2: f64,
    pub slope: f64,
    pub intercept: f64,
    pub pairs: usize,
}

/// Completed target column plus the ranked regression diagnostics. Dates no
/// analysis station covers stay null and are counted in `unresolved`.
#[derive(Debug, Clone)]
pub struct Completion {
    pub values: Vec<Option<f64>>,
    pub diagnostics: Vec<StationRegression>,
    pub unresolved: usize,
}

struct OlsFit {
    slope: f64,
    intercept: f64,
    r2: f64,
    pairs: usize,
}

/// Ordinary least squares of candidate -> target over rows where both are
/// observed. `None` when there is no overlap at all.
fn fit_ols(target: &[Option<f64>], candidate: &[Option<f64>]) -> Option<OlsFit> {
    let mut pairs = 0usize;
    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_yy, mut sum_xy) =
        (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);

    for (y, x) in target.iter().zip(candidate) {
        let (Some(y), Some(x)) = (y, x) else { continue };
        pairs += 1;
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_yy += y * y;
        sum_xy += x * y;
    }

    if pairs == 0 {
        return None;
    }

    let n = pairs as f64;
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;
    let ss_xx = sum_xx - n * mean_x * mean_x;
    let ss_yy = sum_yy - n * mean_y * mean_y;
    let ss_xy = sum_xy - n * mean_x * mean_y;

    // a constant candidate carries no usable signal; the fit degrades to the
    // target mean instead of dividing by zero
    let slope = if ss_xx > 0.0 { ss_xy / ss_xx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;
    let r2 = if ss_xx > 0.0 && ss_yy > 0.0 {
        (ss_xy * ss_xy) / (ss_xx * ss_yy)
    } else {
        0.0
    };

    Some(OlsFit {
        slope,
        intercept,
        r2,
        pairs,
    })
}

fn ranking_metric(diagnostic: &StationRegression, priorize: Priorize) -> f64 {
    match priorize {
        Priorize::R2 => diagnostic.r2,
        Priorize::Slope => diagnostic.slope,
        Priorize::Pair => diagnostic.pairs as f64,
    }
}

fn count_missing(values: &[Option<f64>]) -> usize {
    values.iter().filter(|value| value.is_none()).count()
}

/// Fill the target station's gaps from regression reconstructions of the
/// analysis stations, best-ranked first. Returns the raw (unrounded)
/// completed column together with the diagnostics sorted by the ranking
/// criterion.
pub fn complete_series(
    series: &StationSeries,
    target: &str,
    analysis_stations: &[String],
    priorize: Priorize,
) -> Result<Completion> {
    if analysis_stations.is_empty() {
        return Err(PipelineError::InvalidParameter(
            "analysis_stations must not be empty".to_string(),
        ));
    }
    if !series.has_station(target) {
        return Err(PipelineError::InvalidParameter(format!(
            "target station '{target}' is not a column of the series"
        )));
    }
    for station in analysis_stations {
        if !series.has_station(station) {
            return Err(PipelineError::InvalidParameter(format!(
                "analysis station '{station}' is not a column of the series"
            )));
        }
    }

    let target_values = series.values(target)?;

    let mut diagnostics: Vec<StationRegression> = Vec::new();
    let mut reconstructions: HashMap<String, Vec<Option<f64>>> = HashMap::new();

    for station in analysis_stations {
        let candidate = series.values(station)?;
        let Some(fit) = fit_ols(&target_values, &candidate) else {
            debug!(station = %station, "no shared observations with the target; skipped");
            continue;
        };

        let reconstruction: Vec<Option<f64>> = candidate
            .iter()
            .map(|value| value.map(|x| fit.slope * x + fit.intercept))
            .collect();
        reconstructions.insert(station.clone(), reconstruction);
        diagnostics.push(StationRegression {
            station: station.clone(),
            r2: fit.r2,
            slope: fit.slope,
            intercept: fit.intercept,
            pairs: fit.pairs,
        });
    }

    // stable sort: tied stations keep their first-occurrence order
    diagnostics.sort_by(|a, b| {
        ranking_metric(b, priorize).total_cmp(&ranking_metric(a, priorize))
    });

    let mut values = target_values;
    let mut remaining = count_missing(&values);
    while remaining > 0 {
        let before = remaining;
        for diagnostic in &diagnostics {
            let Some(reconstruction) = reconstructions.get(&diagnostic.station) else {
                continue;
            };
            for (slot, fill) in values.iter_mut().zip(reconstruction) {
                if slot.is_none() {
                    *slot = *fill;
                }
            }
        }
        remaining = count_missing(&values);
        if remaining == before {
            // a full ranked pass made no progress: the remaining dates have
            // no candidate coverage
            break;
        }
    }

    if remaining > 0 {
        warn!(target = %target, remaining, "completion left days without coverage");
    }

    Ok(Completion {
        values,
        diagnostics,
        unresolved: remaining,
    })
}

/// Residual artifact cleanup carried over from the historical pipeline: a
/// completed value exactly equal to one of the regression intercepts is
/// treated as a degenerate prediction and reset to zero.
pub fn zero_intercept_artifacts(
    values: &mut [Option<f64>],
    diagnostics: &[StationRegression],
) {
    for value in values.iter_mut() {
        if let Some(v) = *value {
            if diagnostics.iter().any(|d| d.intercept == v) {
                *value = Some(0.0);
            }
        }
    }
}

pub fn round_values(values: &mut [Option<f64>], decimals: u32) {
    let factor = 10f64.powi(decimals as i32);
    for value in values.iter_mut() {
        if let Some(v) = *value {
            *value = Some((v * factor).round() / factor);
        }
    }
}

/// Temperature post-processing: round both extremes to whole degrees, and
/// force any day whose completed maximum dropped to or below the completed
/// minimum apart by two degrees around their average.
pub fn reconcile_extremes(max_values: &mut [Option<f64>], min_values: &mut [Option<f64>]) {
    for (max_slot, min_slot) in max_values.iter_mut().zip(min_values.iter_mut()) {
        match (*max_slot, *min_slot) {
            (Some(max), Some(min)) if max <= min => {
                let avg = ((max + min) / 2.0).round();
                *max_slot = Some(avg + 1.0);
                *min_slot = Some(avg - 1.0);
            }
            _ => {
                if let Some(max) = *max_slot {
                    *max_slot = Some(max.round());
                }
                if let Some(min) = *min_slot {
                    *min_slot = Some(min.round());
                }
            }
        }
    }
}
