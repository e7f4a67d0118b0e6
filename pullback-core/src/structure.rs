//! Market structure: higher highs and higher lows.

use crate::swing::{SwingPoint, SwingPoints};

/// True when the two most recent swing highs and the two most recent swing
/// lows both step strictly upward. Fewer than two of either → false.
pub fn has_higher_highs_higher_lows(swings: &SwingPoints) -> bool {
    match (last_two(&swings.highs), last_two(&swings.lows)) {
        (Some((prev_high, last_high)), Some((prev_low, last_low))) => {
            last_high.price > prev_high.price && last_low.price > prev_low.price
        }
        _ => false,
    }
}

/// The two latest points by timestamp, earlier first.
fn last_two(points: &[SwingPoint]) -> Option<(&SwingPoint, &SwingPoint)> {
    if points.len() < 2 {
        return None;
    }
    let mut ordered: Vec<&SwingPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.timestamp);
    let n = ordered.len();
    Some((ordered[n - 2], ordered[n - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swing::SwingKind;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn point(day: u32, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            index: day as usize,
            price,
            timestamp: at(day),
            kind,
        }
    }

    fn swings(highs: &[(u32, f64)], lows: &[(u32, f64)]) -> SwingPoints {
        SwingPoints {
            highs: highs
                .iter()
                .map(|&(d, p)| point(d, p, SwingKind::High))
                .collect(),
            lows: lows
                .iter()
                .map(|&(d, p)| point(d, p, SwingKind::Low))
                .collect(),
        }
    }

    #[test]
    fn rising_highs_and_lows() {
        let s = swings(&[(2, 110.0), (12, 115.0)], &[(6, 100.0), (16, 104.0)]);
        assert!(has_higher_highs_higher_lows(&s));
    }

    #[test]
    fn lower_low_breaks_structure() {
        let s = swings(&[(2, 110.0), (12, 115.0)], &[(6, 100.0), (16, 99.0)]);
        assert!(!has_higher_highs_higher_lows(&s));
    }

    #[test]
    fn equal_highs_are_not_higher() {
        let s = swings(&[(2, 110.0), (12, 110.0)], &[(6, 100.0), (16, 104.0)]);
        assert!(!has_higher_highs_higher_lows(&s));
    }

    #[test]
    fn insufficient_swings() {
        assert!(!has_higher_highs_higher_lows(&SwingPoints::default()));
        let s = swings(&[(2, 110.0), (12, 115.0)], &[(6, 100.0)]);
        assert!(!has_higher_highs_higher_lows(&s));
    }

    #[test]
    fn only_latest_two_matter() {
        // An old higher high is ignored; the latest pair decides.
        let s = swings(
            &[(2, 130.0), (12, 110.0), (22, 115.0)],
            &[(6, 90.0), (16, 100.0), (26, 104.0)],
        );
        assert!(has_higher_highs_higher_lows(&s));
    }

    #[test]
    fn ordering_is_by_timestamp_not_position() {
        let s = swings(&[(12, 115.0), (2, 110.0)], &[(16, 104.0), (6, 100.0)]);
        assert!(has_higher_highs_higher_lows(&s));
    }
}
