//! Cooldown completion estimator
//!
//! Fits `time = f(temperature)` by least squares over every sample collected
//! during a cooldown and evaluates the fit at the target temperature. A
//! degree-2 polynomial is used once three distinct temperatures are known;
//! with exactly two the fit degrades to a straight line.
//!
//! Temperatures are centred and scaled to `[-1, 1]` and timestamps are taken
//! relative to the first sample before solving the normal equations, which
//! keeps the 3x3 system well conditioned for epoch-sized timestamps.

use std::time::Duration;
use thiserror::Error;

/// Default minimum spacing between refits
pub const DEFAULT_RECOMPUTE_INTERVAL: Duration = Duration::from_secs(15 * 60);

const DISTINCT_EPSILON: f64 = 1e-9;
const PIVOT_EPSILON: f64 = 1e-12;

/// Why no estimate could be produced
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EstimateError {
    #[error("Need at least 2 distinct temperatures, have {0}")]
    InsufficientSamples(usize),

    #[error("Sample matrix is singular")]
    Singular,

    #[error("Fit produced a non-finite prediction")]
    NonFinite,
}

/// One (temperature, timestamp) observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub temperature: f64,
    /// Seconds on any monotonic scale
    pub timestamp: f64,
}

/// Fitted polynomial in normalised coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownFit {
    /// Lowest order first
    coefficients: Vec<f64>,
    temp_offset: f64,
    temp_scale: f64,
    time_offset: f64,
}

impl CooldownFit {
    /// Predicted timestamp at which `temperature` is reached
    pub fn evaluate(&self, temperature: f64) -> f64 {
        let x = (temperature - self.temp_offset) / self.temp_scale;
        let value = self
            .coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c);
        value + self.time_offset
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }
}

/// Sample history and last estimate for one cooldown
#[derive(Debug, Clone)]
pub struct CooldownModel {
    samples: Vec<Sample>,
    target_temperature: f64,
    recompute_interval: Duration,
    estimate: Option<f64>,
}

impl CooldownModel {
    pub fn new(target_temperature: f64) -> Self {
        Self::with_interval(target_temperature, DEFAULT_RECOMPUTE_INTERVAL)
    }

    pub fn with_interval(target_temperature: f64, recompute_interval: Duration) -> Self {
        Self {
            samples: Vec::new(),
            target_temperature,
            recompute_interval,
            estimate: None,
        }
    }

    /// Append a sample; non-finite values are dropped
    pub fn push(&mut self, temperature: f64, timestamp: f64) {
        if temperature.is_finite() && timestamp.is_finite() {
            self.samples.push(Sample {
                temperature,
                timestamp,
            });
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn target_temperature(&self) -> f64 {
        self.target_temperature
    }

    pub fn recompute_interval(&self) -> Duration {
        self.recompute_interval
    }

    /// Last successful prediction
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    /// Number of distinct temperatures among the samples
    pub fn distinct_temperatures(&self) -> usize {
        let mut temps: Vec<f64> = self.samples.iter().map(|s| s.temperature).collect();
        temps.sort_by(|a, b| a.total_cmp(b));
        temps.dedup_by(|a, b| (*a - *b).abs() < DISTINCT_EPSILON);
        temps.len()
    }

    /// Least-squares fit over all samples
    pub fn fit(&self) -> Result<CooldownFit, EstimateError> {
        let distinct = self.distinct_temperatures();
        if distinct < 2 {
            return Err(EstimateError::InsufficientSamples(distinct));
        }
        let degree = if distinct >= 3 { 2 } else { 1 };

        let n = self.samples.len() as f64;
        let temp_offset = self.samples.iter().map(|s| s.temperature).sum::<f64>() / n;
        let temp_scale = self
            .samples
            .iter()
            .map(|s| (s.temperature - temp_offset).abs())
            .fold(0.0, f64::max);
        if temp_scale < DISTINCT_EPSILON {
            return Err(EstimateError::Singular);
        }
        let time_offset = self.samples[0].timestamp;

        // Normal equations: sum(x^(i+j)) * c_j = sum(y * x^i)
        let size = degree + 1;
        let mut matrix = vec![vec![0.0; size + 1]; size];
        for sample in &self.samples {
            let x = (sample.temperature - temp_offset) / temp_scale;
            let y = sample.timestamp - time_offset;
            let powers: Vec<f64> = (0..=2 * degree).map(|p| x.powi(p as i32)).collect();
            for (i, row) in matrix.iter_mut().enumerate() {
                for j in 0..size {
                    row[j] += powers[i + j];
                }
                row[size] += y * powers[i];
            }
        }

        let coefficients = solve(matrix)?;
        Ok(CooldownFit {
            coefficients,
            temp_offset,
            temp_scale,
            time_offset,
        })
    }

    /// Predict the completion timestamp without recording it
    pub fn predict(&self) -> Result<f64, EstimateError> {
        let prediction = self.fit()?.evaluate(self.target_temperature);
        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(EstimateError::NonFinite)
        }
    }

    /// Refit and store the prediction; on failure the previous estimate stays
    pub fn refresh(&mut self) -> Result<f64, EstimateError> {
        let prediction = self.predict()?;
        self.estimate = Some(prediction);
        Ok(prediction)
    }
}

/// Gaussian elimination with partial pivoting on an augmented matrix
fn solve(mut matrix: Vec<Vec<f64>>) -> Result<Vec<f64>, EstimateError> {
    let size = matrix.len();
    let scale = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0, f64::max)
        .max(1.0);

    for col in 0..size {
        let pivot = (col..size)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);
        if matrix[pivot][col].abs() < PIVOT_EPSILON * scale {
            return Err(EstimateError::Singular);
        }
        matrix.swap(col, pivot);

        for row in (col + 1)..size {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=size {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = ((row + 1)..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (matrix[row][size] - tail) / matrix[row][row];
    }

    if solution.iter().all(|c| c.is_finite()) {
        Ok(solution)
    } else {
        Err(EstimateError::NonFinite)
    }
}
