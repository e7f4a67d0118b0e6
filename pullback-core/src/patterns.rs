//! Bullish candlestick patterns on the last three bars.
//!
//! Rules are tried in priority order and the first match wins:
//! Hammer > Bullish Engulfing > Morning Star > plain bullish candle.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandlePattern {
    Hammer,
    BullishEngulfing,
    MorningStar,
    BullishCandle,
    None,
}

impl CandlePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hammer => "HAMMER",
            Self::BullishEngulfing => "BULLISH_ENGULFING",
            Self::MorningStar => "MORNING_STAR",
            Self::BullishCandle => "BULLISH_CANDLE",
            Self::None => "NONE",
        }
    }
}

impl std::fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: CandlePattern,
    /// 0..=100
    pub confidence: u8,
}

impl PatternMatch {
    pub const NONE: PatternMatch = PatternMatch {
        pattern: CandlePattern::None,
        confidence: 0,
    };
}

/// The three bars a rule looks at: `first` is two bars back, `last` is current.
#[derive(Debug, Clone, Copy)]
struct Window<'a> {
    first: &'a Bar,
    middle: &'a Bar,
    last: &'a Bar,
}

struct Rule {
    pattern: CandlePattern,
    confidence: u8,
    matches: fn(&Window<'_>) -> bool,
}

/// Maximum middle-bar body of a morning star, as a fraction of the last body.
const STAR_BODY_RATIO: f64 = 0.3;

const RULES: &[Rule] = &[
    Rule {
        pattern: CandlePattern::Hammer,
        confidence: 75,
        matches: is_hammer,
    },
    Rule {
        pattern: CandlePattern::BullishEngulfing,
        confidence: 85,
        matches: is_bullish_engulfing,
    },
    Rule {
        pattern: CandlePattern::MorningStar,
        confidence: 90,
        matches: is_morning_star,
    },
    Rule {
        pattern: CandlePattern::BullishCandle,
        confidence: 60,
        matches: is_bullish_candle,
    },
];

/// Long lower shadow, short upper shadow.
fn is_hammer(w: &Window<'_>) -> bool {
    let body = w.last.body();
    w.last.lower_shadow() > 2.0 * body && w.last.upper_shadow() < body
}

/// Green candle opening below and closing above a red candle's body.
fn is_bullish_engulfing(w: &Window<'_>) -> bool {
    w.middle.is_bearish()
        && w.last.is_bullish()
        && w.last.open < w.middle.close
        && w.last.close > w.middle.open
}

/// Red, small-bodied, then green closing above the red candle's midpoint.
fn is_morning_star(w: &Window<'_>) -> bool {
    let midpoint = (w.first.open + w.first.close) / 2.0;
    w.first.is_bearish()
        && w.middle.body() < w.last.body() * STAR_BODY_RATIO
        && w.last.is_bullish()
        && w.last.close > midpoint
}

fn is_bullish_candle(w: &Window<'_>) -> bool {
    w.last.is_bullish()
}

/// Classify the last three bars of `bars`. Fewer than three bars → `NONE`.
pub fn detect_bullish_pattern(bars: &[Bar]) -> PatternMatch {
    let [first, middle, last] = match bars {
        [.., a, b, c] => [a, b, c],
        _ => return PatternMatch::NONE,
    };
    let window = Window {
        first,
        middle,
        last,
    };

    RULES
        .iter()
        .find(|rule| (rule.matches)(&window))
        .map(|rule| PatternMatch {
            pattern: rule.pattern,
            confidence: rule.confidence,
        })
        .unwrap_or(PatternMatch::NONE)
}
