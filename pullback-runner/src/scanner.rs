//! Multi-symbol pullback scanner.
//!
//! Each symbol is evaluated independently (one rayon task per symbol, no
//! shared state); results at or above the confidence floor are kept and
//! ranked. A symbol that degrades to an ERROR result drops out whatever the
//! floor.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use pullback_core::{CriteriaResult, IndicatedSeries, SignalEvaluator};

/// Default confidence floor for a scan.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 70;

/// One symbol's inputs.
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub symbol: String,
    pub daily: IndicatedSeries,
    pub intraday: IndicatedSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub total_scanned: usize,
    pub opportunities_found: usize,
    /// Confidence descending, then symbol ascending.
    pub opportunities: Vec<CriteriaResult>,
}

/// Evaluate every input and keep non-error results with `confidence >= min_confidence`.
pub fn scan(
    inputs: &[ScanInput],
    evaluator: &dyn SignalEvaluator,
    min_confidence: u8,
) -> ScanReport {
    let mut opportunities: Vec<CriteriaResult> = inputs
        .par_iter()
        .map(|input| evaluator.evaluate(&input.symbol, input.daily.view(), input.intraday.view()))
        .filter(|result| !result.is_error() && result.confidence >= min_confidence)
        .collect();

    opportunities.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    info!(
        scanned = inputs.len(),
        found = opportunities.len(),
        min_confidence,
        "scan complete"
    );

    ScanReport {
        total_scanned: inputs.len(),
        opportunities_found: opportunities.len(),
        opportunities,
    }
}
