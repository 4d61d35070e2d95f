use crate::dataset::Record;

/// Index of the record whose year is closest to `query_year`.
///
/// Linear scan; ties keep the first record in slice order. Returns `None` only
/// for an empty slice. A single race holds a handful of points, so no ordered
/// index is kept.
pub fn nearest_index(records: &[Record], query_year: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, record) in records.iter().enumerate() {
        let distance = (record.year as f64 - query_year).abs();
        match best {
            Some((_, best_distance)) if !(distance < best_distance) => {}
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}
