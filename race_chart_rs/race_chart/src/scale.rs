//! Linear domain → pixel mappings with "nice" rounding and tick generation.

use serde::{Deserialize, Serialize};

const E10: f64 = 7.071_067_811_865_476; // sqrt(50)
const E5: f64 = 3.162_277_660_168_379_5; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Maximum refinement passes when nicing a domain.
const NICE_PASSES: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 || d1 == d0 {
            return d0;
        }
        d0 + (pixel - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Extend the domain outward to round tick boundaries.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut start, mut stop) = self.domain;
        let reversed = stop < start;
        if reversed {
            std::mem::swap(&mut start, &mut stop);
        }
        let mut prestep: Option<f64> = None;
        for _ in 0..NICE_PASSES {
            let step = tick_increment(start, stop, count);
            if prestep == Some(step) {
                break;
            }
            if step > 0.0 {
                start = (start / step).floor() * step;
                stop = (stop / step).ceil() * step;
            } else if step < 0.0 {
                start = (start * step).ceil() / step;
                stop = (stop * step).floor() / step;
            } else {
                break;
            }
            prestep = Some(step);
        }
        self.domain = if reversed { (stop, start) } else { (start, stop) };
        self
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count)
    }
}

/// `[min, max]` of `accessor` over `items`, skipping non-finite values.
pub fn extent<T, F>(items: &[T], accessor: F) -> Option<(f64, f64)>
where
    F: Fn(&T) -> f64,
{
    items
        .iter()
        .map(accessor)
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Step between ticks as a power of ten times 1, 2 or 5. Negative results
/// encode the reciprocal of a sub-unit step so that tick values stay exact.
fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    if !(step > 0.0) || !step.is_finite() {
        return 0.0;
    }
    let power = step.log10().floor() as i32;
    let error = step / 10f64.powi(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    if power >= 0 {
        factor * 10f64.powi(power)
    } else {
        -(10f64.powi(-power)) / factor
    }
}

pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if !start.is_finite() || !stop.is_finite() || count == 0 {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let step = tick_increment(lo, hi, count);
    if step == 0.0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    if step > 0.0 {
        let mut r0 = (lo / step).round();
        let mut r1 = (hi / step).round();
        if r0 * step < lo {
            r0 += 1.0;
        }
        if r1 * step > hi {
            r1 -= 1.0;
        }
        let mut i = r0;
        while i <= r1 {
            out.push(i * step);
            i += 1.0;
        }
    } else {
        let inv = -step;
        let mut r0 = (lo * inv).round();
        let mut r1 = (hi * inv).round();
        if r0 / inv < lo {
            r0 += 1.0;
        }
        if r1 / inv > hi {
            r1 -= 1.0;
        }
        let mut i = r0;
        while i <= r1 {
            out.push(i / inv);
            i += 1.0;
        }
    }
    if reverse {
        out.reverse();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_invert() {
        let scale = LinearScale::new((2010.0, 2020.0), (0.0, 960.0));
        assert_eq!(scale.apply(2010.0), 0.0);
        assert_eq!(scale.apply(2020.0), 960.0);
        assert_eq!(scale.apply(2015.0), 480.0);
        assert!((scale.invert(96.0) - 2011.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_range() {
        let scale = LinearScale::new((0.0, 100.0), (360.0, 0.0));
        assert_eq!(scale.apply(0.0), 360.0);
        assert_eq!(scale.apply(100.0), 0.0);
        assert!((scale.invert(90.0) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_domain() {
        let scale = LinearScale::new((5.0, 5.0), (360.0, 0.0)).nice(10);
        assert_eq!(scale.domain, (5.0, 5.0));
        assert_eq!(scale.apply(5.0), 180.0);
        assert_eq!(scale.invert(17.0), 5.0);
        assert_eq!(scale.ticks(6), vec![5.0]);
    }

    #[test]
    fn test_nice_rounds_outward() {
        let scale = LinearScale::new((72_321.0, 80_950.0), (360.0, 0.0)).nice(10);
        assert_eq!(scale.domain, (72_000.0, 81_000.0));

        let scale = LinearScale::new((0.13, 0.96), (0.0, 1.0)).nice(10);
        assert!((scale.domain.0 - 0.1).abs() < 1e-12);
        assert!((scale.domain.1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nice_contains_extent() {
        let cases = [
            (1.0, 9.5),
            (3_512.0, 3_999.0),
            (40_000.5, 40_000.7),
            (-12.0, 87.0),
            (61_234.0, 123_456.0),
        ];
        for (lo, hi) in cases {
            for count in [2, 6, 10] {
                let niced = LinearScale::new((lo, hi), (1.0, 0.0)).nice(count);
                assert!(niced.domain.0 <= lo, "{lo}..{hi} count {count}: {:?}", niced.domain);
                assert!(niced.domain.1 >= hi, "{lo}..{hi} count {count}: {:?}", niced.domain);
            }
        }
    }

    #[test]
    fn test_ticks() {
        assert_eq!(
            ticks(2012.0, 2021.0, 10),
            (2012..=2021).map(f64::from).collect::<Vec<_>>()
        );
        assert_eq!(ticks(0.0, 100.0, 6), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        assert_eq!(ticks(0.0, 1.0, 5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(10.0, 0.0, 2), vec![10.0, 5.0, 0.0]);
        assert!(ticks(0.0, f64::NAN, 5).is_empty());
    }

    #[test]
    fn test_extent() {
        let values = [3.0, f64::NAN, -1.0, 7.5];
        assert_eq!(extent(&values, |v| *v), Some((-1.0, 7.5)));
        let empty: [f64; 0] = [];
        assert_eq!(extent(&empty, |v| *v), None);
    }
}
