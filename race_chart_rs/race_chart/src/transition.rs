//! Index-keyed data join and timed interpolation between two scenes.

use std::ops::Range;

use crate::scene::{Marker, Scene};

/// Marks paired by index between the previous and the next data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub update: Range<usize>,
    pub enter: Range<usize>,
    pub exit: Range<usize>,
}

pub fn join(prev_len: usize, next_len: usize) -> Join {
    let shared = prev_len.min(next_len);
    Join {
        update: 0..shared,
        enter: shared..next_len,
        exit: shared..prev_len,
    }
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[derive(Clone, Debug)]
pub struct Transition {
    from: Scene,
    to: Scene,
    duration_ms: f64,
    join: Join,
}

impl Transition {
    pub fn new(from: Scene, to: Scene, duration_ms: f64) -> Self {
        let join = join(from.markers.len(), to.markers.len());
        Self {
            from,
            to,
            duration_ms: duration_ms.max(0.0),
            join,
        }
    }

    pub fn is_finished(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.duration_ms
    }

    /// Scene to draw `elapsed_ms` after the transition started.
    ///
    /// Updating markers slide between positions, entering markers grow from
    /// radius zero at their target and exiting markers shrink in place until
    /// they are dropped at the end. Axes and subtitle switch immediately.
    pub fn frame(&self, elapsed_ms: f64) -> Scene {
        if self.is_finished(elapsed_ms) {
            return self.to.clone();
        }
        let t = ease_cubic_in_out(elapsed_ms / self.duration_ms);

        let mut markers = Vec::with_capacity(
            self.join.update.len() + self.join.enter.len() + self.join.exit.len(),
        );
        for i in self.join.update.clone() {
            let (a, b) = (self.from.markers[i], self.to.markers[i]);
            markers.push(Marker {
                cx: lerp(a.cx, b.cx, t),
                cy: lerp(a.cy, b.cy, t),
                r: lerp(a.r, b.r, t),
            });
        }
        for i in self.join.enter.clone() {
            let b = self.to.markers[i];
            markers.push(Marker {
                r: lerp(0.0, b.r, t),
                ..b
            });
        }
        for i in self.join.exit.clone() {
            let a = self.from.markers[i];
            markers.push(Marker {
                r: lerp(a.r, 0.0, t),
                ..a
            });
        }

        Scene {
            line: interpolate_line(&self.from.line, &self.to.line, t),
            markers,
            x_axis: self.to.x_axis.clone(),
            y_axis: self.to.y_axis.clone(),
            subtitle: self.to.subtitle.clone(),
        }
    }
}

/// Point-wise interpolation; the shorter polyline is padded with its last vertex.
fn interpolate_line(from: &[(f64, f64)], to: &[(f64, f64)], t: f64) -> Vec<(f64, f64)> {
    if from.is_empty() {
        return to.to_vec();
    }
    if to.is_empty() {
        return Vec::new();
    }
    let len = from.len().max(to.len());
    let pick = |line: &[(f64, f64)], i: usize| line[i.min(line.len() - 1)];
    (0..len)
        .map(|i| {
            let (x0, y0) = pick(from, i);
            let (x1, y1) = pick(to, i);
            (lerp(x0, x1, t), lerp(y0, y1, t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChartConfig;
    use crate::dataset::Record;
    use crate::scale::LinearScale;

    fn scene(points: &[(i32, f64)]) -> Scene {
        let records: Vec<Record> = points
            .iter()
            .map(|&(year, time)| Record {
                race_group_id: "g".into(),
                event_name: "E".into(),
                race_name: "R".into(),
                year,
                time_seconds: time,
            })
            .collect();
        let x = LinearScale::new((2010.0, 2020.0), (0.0, 1000.0));
        let y = LinearScale::new((0.0, 100.0), (100.0, 0.0));
        Scene::build(&records, &x, &y, &ChartConfig::default())
    }

    #[test]
    fn test_join_partitions() {
        assert_eq!(join(3, 5), Join { update: 0..3, enter: 3..5, exit: 3..3 });
        assert_eq!(join(4, 2), Join { update: 0..2, enter: 2..2, exit: 2..4 });
        assert_eq!(join(0, 2).enter.len(), 2);
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(ease_cubic_in_out(0.0), 0.0);
        assert_eq!(ease_cubic_in_out(0.5), 0.5);
        assert_eq!(ease_cubic_in_out(1.0), 1.0);
        assert!(ease_cubic_in_out(0.25) < 0.25);
        assert_eq!(ease_cubic_in_out(3.0), 1.0);
    }

    #[test]
    fn test_start_frame_keeps_old_positions() {
        let from = scene(&[(2010, 0.0), (2020, 100.0)]);
        let to = scene(&[(2012, 50.0), (2014, 50.0), (2016, 50.0)]);
        let transition = Transition::new(from.clone(), to, 800.0);
        let frame = transition.frame(0.0);
        assert_eq!(frame.markers.len(), 3);
        assert_eq!(frame.markers[0], from.markers[0]);
        assert_eq!(frame.markers[1], from.markers[1]);
        assert_eq!(frame.markers[2].r, 0.0);
        assert_eq!(frame.line[0], from.line[0]);
        assert_eq!(frame.line[2], from.line[1]);
    }

    #[test]
    fn test_midpoint_and_end() {
        let from = scene(&[(2010, 0.0), (2020, 100.0), (2015, 0.0)]);
        let to = scene(&[(2020, 0.0)]);
        let transition = Transition::new(from.clone(), to.clone(), 800.0);

        let mid = transition.frame(400.0);
        assert_eq!(mid.markers.len(), 3);
        assert_eq!(mid.markers[0].cx, 500.0);
        assert_eq!(mid.markers[1].r, 2.5);
        assert_eq!(mid.markers[1].cx, from.markers[1].cx);

        let end = transition.frame(800.0);
        assert_eq!(end, to);
        assert!(transition.is_finished(900.0));
    }

    #[test]
    fn test_zero_duration_jumps() {
        let from = scene(&[(2010, 0.0)]);
        let to = scene(&[(2020, 100.0)]);
        let transition = Transition::new(from, to.clone(), 0.0);
        assert_eq!(transition.frame(0.0), to);
    }
}
