//! Six-criteria EMA pullback evaluation.
//!
//! Combines a daily series (trend, pullback, stop placement) with a finer
//! intraday series (candle confirmation, momentum, volume) into one graded
//! signal plus a trade setup:
//!
//! 1. Trend: EMA50 > EMA200 and higher-highs/higher-lows on recent daily swings
//! 2. Pullback: close near EMA50 and not more than 2% below it
//! 3. Confirmation: bullish pattern, intraday RSI and MACD agree
//! 4. Volume: intraday volume spike
//! 5. Stop: swing-low / ATR stop leaves positive risk per share
//! 6. Risk/reward: risk is a meaningful fraction of price
//!
//! Evaluation never fails outward: missing data produces a `Signal::Error`
//! result carrying the reason.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculator::{IndicatedSeries, IndicatedView, IndicatorRow};
use crate::config::EvaluatorConfig;
use crate::domain::Bar;
use crate::patterns::{detect_bullish_pattern, CandlePattern};
use crate::structure::has_higher_highs_higher_lows;
use crate::swing::detect_swing_points;

/// Number of criteria in the rule.
pub const CRITERIA_COUNT: u8 = 6;

/// Graded outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Error,
    Hold,
    WeakBuy,
    Buy,
    StrongBuy,
}

impl Signal {
    /// Tier for a number of met criteria: >=5 strong, 4 buy, 3 weak, else hold.
    pub fn from_criteria_met(criteria_met: u8) -> Self {
        match criteria_met {
            5.. => Self::StrongBuy,
            4 => Self::Buy,
            3 => Self::WeakBuy,
            _ => Self::Hold,
        }
    }

    /// Fixed confidence attached to each tier.
    pub fn confidence(&self) -> u8 {
        match self {
            Self::StrongBuy => 90,
            Self::Buy => 75,
            Self::WeakBuy => 60,
            Self::Hold => 40,
            Self::Error => 0,
        }
    }

    /// Whether a flat backtest should open a position on this signal.
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Buy | Self::StrongBuy)
    }
}

/// Which input series a problem refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Intraday,
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => f.write_str("daily"),
            Self::Intraday => f.write_str("intraday"),
        }
    }
}

/// Internal evaluation failures. Converted into `Signal::Error` results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("{0} series is empty")]
    EmptySeries(Cadence),

    #[error("{0} series has no indicators (degraded data)")]
    MissingIndicators(Cadence),

    #[error("{cadence} {field} is not finite")]
    NonFinite {
        cadence: Cadence,
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendCheck {
    pub met: bool,
    pub ema_trend_up: bool,
    pub higher_highs_lows: bool,
    pub ema50: f64,
    pub ema200: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullbackCheck {
    pub met: bool,
    pub near_ema50: bool,
    pub distance_pct: f64,
    pub close: f64,
    pub ema50: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationCheck {
    pub met: bool,
    pub pattern: CandlePattern,
    pub pattern_confidence: u8,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_bullish: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeCheck {
    pub met: bool,
    pub current_volume: u64,
    pub average_volume: f64,
    /// current / average; 0 when the average is 0.
    pub spike_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossCheck {
    pub met: bool,
    pub stop_price: f64,
    pub risk_per_share: f64,
    pub risk_pct: f64,
    pub atr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardCheck {
    pub met: bool,
    pub target_2r: f64,
    pub target_3r: f64,
}

/// Per-criterion outcome with the values that decided it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub trend: TrendCheck,
    pub pullback: PullbackCheck,
    pub confirmation: ConfirmationCheck,
    pub volume: VolumeCheck,
    pub stop_loss: StopLossCheck,
    pub risk_reward: RiskRewardCheck,
}

impl Criteria {
    pub fn flags(&self) -> [bool; CRITERIA_COUNT as usize] {
        [
            self.trend.met,
            self.pullback.met,
            self.confirmation.met,
            self.volume.met,
            self.stop_loss.met,
            self.risk_reward.met,
        ]
    }

    pub fn met_count(&self) -> u8 {
        self.flags().iter().filter(|&&met| met).count() as u8
    }
}

/// Entry, stop and R-multiple targets derived from the latest daily close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub entry_price: f64,
    pub stop_loss: f64,
    /// 2R target.
    pub target_1: f64,
    /// 3R target.
    pub target_2: f64,
    pub risk_amount: f64,
    pub reward_1: f64,
    pub reward_2: f64,
}

/// One graded evaluation for a symbol at the latest daily bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaResult {
    pub symbol: String,
    /// Timestamp of the latest daily bar; `None` only for errors on empty input.
    pub timestamp: Option<NaiveDateTime>,
    pub signal: Signal,
    pub confidence: u8,
    /// criteria_met / 6 * 100
    pub signal_strength: f64,
    pub criteria_met: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_setup: Option<TradeSetup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CriteriaResult {
    fn graded(
        symbol: &str,
        timestamp: NaiveDateTime,
        criteria: Criteria,
        trade_setup: TradeSetup,
    ) -> Self {
        let criteria_met = criteria.met_count();
        let signal = Signal::from_criteria_met(criteria_met);
        Self {
            symbol: symbol.to_string(),
            timestamp: Some(timestamp),
            signal,
            confidence: signal.confidence(),
            signal_strength: f64::from(criteria_met) / f64::from(CRITERIA_COUNT) * 100.0,
            criteria_met,
            criteria: Some(criteria),
            trade_setup: Some(trade_setup),
            error: None,
        }
    }

    /// The degraded result for a failed evaluation.
    pub fn error(symbol: &str, timestamp: Option<NaiveDateTime>, err: &CriteriaError) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            signal: Signal::Error,
            confidence: 0,
            signal_strength: 0.0,
            criteria_met: 0,
            criteria: None,
            trade_setup: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.signal == Signal::Error
    }
}

/// Something that grades a (daily, intraday) pair at their latest bars.
///
/// The backtest simulator drives entries through this seam.
pub trait SignalEvaluator: Send + Sync {
    fn evaluate(
        &self,
        symbol: &str,
        daily: IndicatedView<'_>,
        intraday: IndicatedView<'_>,
    ) -> CriteriaResult;
}

/// The six-criteria pullback evaluator.
#[derive(Debug, Clone, Default)]
pub struct CriteriaEvaluator {
    config: EvaluatorConfig,
}

impl CriteriaEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate, reporting internal failures as `Err`.
    pub fn try_evaluate(
        &self,
        symbol: &str,
        daily: IndicatedView<'_>,
        intraday: IndicatedView<'_>,
    ) -> Result<CriteriaResult, CriteriaError> {
        let (daily_bar, daily_row) = latest(daily, Cadence::Daily)?;
        let (intraday_bar, intraday_row) = latest(intraday, Cadence::Intraday)?;
        require_finite(daily_row, Cadence::Daily)?;
        require_finite(intraday_row, Cadence::Intraday)?;

        let cfg = &self.config;
        let close = daily_bar.close;

        // 1. Trend
        let recent = daily.tail(cfg.structure_lookback);
        let swings = detect_swing_points(recent.bars(), cfg.swing_window);
        let ema_trend_up = daily_row.ema50 > daily_row.ema200;
        let higher_highs_lows = has_higher_highs_higher_lows(&swings);
        let trend = TrendCheck {
            met: ema_trend_up && higher_highs_lows,
            ema_trend_up,
            higher_highs_lows,
            ema50: daily_row.ema50,
            ema200: daily_row.ema200,
        };

        // 2. Pullback
        let pullback = PullbackCheck {
            met: daily_row.near_ema50 && close >= daily_row.ema50 * cfg.pullback_floor_fraction,
            near_ema50: daily_row.near_ema50,
            distance_pct: daily_row.ema50_distance_pct,
            close,
            ema50: daily_row.ema50,
        };

        // 3. Intraday confirmation
        let pattern = detect_bullish_pattern(intraday.tail(3).bars());
        let macd_bullish = intraday_row.macd > intraday_row.macd_signal;
        let confirmation = ConfirmationCheck {
            met: pattern.confidence > cfg.min_pattern_confidence
                && intraday_row.rsi > cfg.rsi_threshold
                && macd_bullish,
            pattern: pattern.pattern,
            pattern_confidence: pattern.confidence,
            rsi: intraday_row.rsi,
            macd: intraday_row.macd,
            macd_signal: intraday_row.macd_signal,
            macd_bullish,
        };

        // 4. Volume
        let volume = VolumeCheck {
            met: intraday_row.volume_spike,
            current_volume: intraday_bar.volume,
            average_volume: intraday_row.volume_ma,
            spike_ratio: if intraday_row.volume_ma > 0.0 {
                intraday_bar.volume as f64 / intraday_row.volume_ma
            } else {
                0.0
            },
        };

        // 5. Stop: the tighter of the swing-low stop and the one-ATR stop
        let swing_low_stop = swings
            .recent_low_prices(cfg.stop_swing_lows)
            .reduce(f64::min)
            .unwrap_or(close * cfg.fallback_stop_fraction);
        let atr_stop = close - daily_row.atr;
        let stop_price = swing_low_stop.max(atr_stop);
        let risk_per_share = close - stop_price;
        let risk_pct = risk_per_share / close * 100.0;
        let stop_loss = StopLossCheck {
            met: risk_per_share > 0.0,
            stop_price,
            risk_per_share,
            risk_pct,
            atr: daily_row.atr,
        };

        // 6. Risk/reward
        let target_2r = close + 2.0 * risk_per_share;
        let target_3r = close + 3.0 * risk_per_share;
        let risk_reward = RiskRewardCheck {
            met: risk_pct > cfg.min_risk_pct,
            target_2r,
            target_3r,
        };

        let trade_setup = TradeSetup {
            entry_price: close,
            stop_loss: stop_price,
            target_1: target_2r,
            target_2: target_3r,
            risk_amount: risk_per_share,
            reward_1: 2.0 * risk_per_share,
            reward_2: 3.0 * risk_per_share,
        };

        let criteria = Criteria {
            trend,
            pullback,
            confirmation,
            volume,
            stop_loss,
            risk_reward,
        };

        Ok(CriteriaResult::graded(
            symbol,
            daily_bar.timestamp,
            criteria,
            trade_setup,
        ))
    }
}

impl SignalEvaluator for CriteriaEvaluator {
    fn evaluate(
        &self,
        symbol: &str,
        daily: IndicatedView<'_>,
        intraday: IndicatedView<'_>,
    ) -> CriteriaResult {
        match self.try_evaluate(symbol, daily, intraday) {
            Ok(result) => result,
            Err(err) => {
                warn!(symbol, error = %err, "pullback evaluation failed");
                let timestamp = daily.bars().last().map(|b| b.timestamp);
                CriteriaResult::error(symbol, timestamp, &err)
            }
        }
    }
}

/// Evaluate with the default thresholds.
pub fn evaluate(
    symbol: &str,
    daily: &IndicatedSeries,
    intraday: &IndicatedSeries,
) -> CriteriaResult {
    CriteriaEvaluator::default().evaluate(symbol, daily.view(), intraday.view())
}

fn latest(
    view: IndicatedView<'_>,
    cadence: Cadence,
) -> Result<(&Bar, &IndicatorRow), CriteriaError> {
    if view.is_empty() {
        return Err(CriteriaError::EmptySeries(cadence));
    }
    view.latest()
        .ok_or(CriteriaError::MissingIndicators(cadence))
}

fn require_finite(row: &IndicatorRow, cadence: Cadence) -> Result<(), CriteriaError> {
    let fields = [
        ("ema50", row.ema50),
        ("ema200", row.ema200),
        ("rsi", row.rsi),
        ("macd", row.macd),
        ("macd_signal", row.macd_signal),
        ("atr", row.atr),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some(&(field, _)) => Err(CriteriaError::NonFinite { cadence, field }),
        None => Ok(()),
    }
}
