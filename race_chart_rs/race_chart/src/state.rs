//! Selection cursor over race groups and everything derived from it.

use tracing::debug;

use crate::config::ChartConfig;
use crate::dataset::{Dataset, RaceGroups, Record};
use crate::format::{format_time, format_year};
use crate::nearest::nearest_index;
use crate::scale::{extent, LinearScale};
use crate::scene::Scene;
use crate::ChartError;

/// Tick count used when rounding the time domain.
const NICE_COUNT: usize = 10;

/// What the floating tooltip shows for the record nearest to the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub year: i32,
    pub time_seconds: f64,
    pub year_label: String,
    pub time_label: String,
    /// Highlight circle centre in bounds coordinates.
    pub highlight: (f64, f64),
    /// Tooltip anchor in rendered (page) pixels relative to the chart's box.
    pub anchor: (f64, f64),
}

#[derive(Clone, Debug)]
pub struct ChartState {
    dataset: Dataset,
    groups: RaceGroups,
    config: ChartConfig,
    selection: usize,
    active: Vec<Record>,
    x_scale: LinearScale,
    y_scale: LinearScale,
}

impl ChartState {
    pub fn new(dataset: Dataset, config: ChartConfig) -> Result<Self, ChartError> {
        config.validate()?;
        let groups = dataset.race_groups();
        if groups.is_empty() {
            return Err(ChartError::EmptyDataset);
        }
        let years =
            extent(dataset.records(), |r| r.year as f64).ok_or(ChartError::EmptyDataset)?;
        let x_scale = LinearScale::new(years, (0.0, config.bounded_width()));
        let mut state = Self {
            dataset,
            groups,
            config,
            selection: 0,
            active: Vec::new(),
            x_scale,
            y_scale: LinearScale::new((0.0, 0.0), (0.0, 0.0)),
        };
        state.refresh();
        Ok(state)
    }

    fn refresh(&mut self) {
        let group = self.groups.get(self.selection).unwrap_or_default().to_string();
        self.active = self.dataset.subset(&group);
        let times = extent(&self.active, |r| r.time_seconds).unwrap_or((0.0, 0.0));
        self.y_scale =
            LinearScale::new(times, (self.config.bounded_height(), 0.0)).nice(NICE_COUNT);
        debug!(
            "Selected race group {} ({}/{}): {} records, time domain {:?}",
            group,
            self.selection + 1,
            self.groups.len(),
            self.active.len(),
            self.y_scale.domain
        );
    }

    /// Move to the next race group, wrapping after the last one.
    pub fn advance(&mut self) -> Scene {
        self.selection = (self.selection + 1) % self.groups.len();
        self.refresh();
        self.scene()
    }

    pub fn select_index(&mut self, index: usize) -> Result<Scene, ChartError> {
        if index >= self.groups.len() {
            return Err(ChartError::UnknownRace(format!(
                "index {} (have {} race groups)",
                index,
                self.groups.len()
            )));
        }
        self.selection = index;
        self.refresh();
        Ok(self.scene())
    }

    pub fn select_group(&mut self, id: &str) -> Result<Scene, ChartError> {
        let index = self
            .groups
            .position(id)
            .ok_or_else(|| ChartError::UnknownRace(id.to_string()))?;
        self.select_index(index)
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn current_group(&self) -> &str {
        self.groups.get(self.selection).unwrap_or_default()
    }

    pub fn race_groups(&self) -> &RaceGroups {
        &self.groups
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn active(&self) -> &[Record] {
        &self.active
    }

    pub fn x_scale(&self) -> &LinearScale {
        &self.x_scale
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y_scale
    }

    pub fn scene(&self) -> Scene {
        Scene::build(&self.active, &self.x_scale, &self.y_scale, &self.config)
    }

    /// Convert a pointer position measured against the rendered chart box into
    /// bounds coordinates. The viewBox stays `width x height` and is fitted
    /// into the box with a uniform scale anchored at the top-left corner.
    pub fn pointer_to_bounds(&self, pointer: (f64, f64), rendered: (f64, f64)) -> (f64, f64) {
        let (rw, rh) = rendered;
        let k = (rw / self.config.width).min(rh / self.config.height);
        let k = if k.is_finite() && k > 0.0 { k } else { 1.0 };
        (
            pointer.0 / k - self.config.margin.left,
            pointer.1 / k - self.config.margin.top,
        )
    }

    /// Record closest in year to the horizontal bounds coordinate `x_px`.
    pub fn nearest_at(&self, x_px: f64) -> Option<&Record> {
        let year = self.x_scale.invert(x_px);
        nearest_index(&self.active, year).map(|idx| &self.active[idx])
    }

    pub fn tooltip_at(&self, x_px: f64, rendered: (f64, f64)) -> Option<Tooltip> {
        let record = self.nearest_at(x_px)?;
        let cx = self.x_scale.apply(record.year as f64);
        let cy = self.y_scale.apply(record.time_seconds);
        let (rw, rh) = rendered;
        let anchor = (
            (cx + self.config.margin.left) * rw / self.config.width,
            (cy + self.config.margin.top) * rh / self.config.height,
        );
        Some(Tooltip {
            year: record.year,
            time_seconds: record.time_seconds,
            year_label: format_year(record.year as f64),
            time_label: format_time(record.time_seconds),
            highlight: (cx, cy),
            anchor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_csv_str;

    const RACES: &str = "\
event_race,event,race,year,time_in_seconds
utmb,UTMB,171K,2017,69600
lavaredo,Lavaredo,120K,2017,45000
utmb,UTMB,171K,2018,73800
western,Western States,100M,2019,55000
lavaredo,Lavaredo,120K,2019,44000
utmb,UTMB,171K,2019,72300
western,Western States,100M,2021,52000
";

    fn state() -> ChartState {
        ChartState::new(parse_csv_str(RACES).unwrap(), ChartConfig::default()).unwrap()
    }

    #[test]
    fn test_every_selection_has_homogeneous_subset() {
        let mut state = state();
        for _ in 0..state.race_groups().len() {
            let group = state.current_group().to_string();
            assert!(!state.active().is_empty());
            assert!(state.active().iter().all(|r| r.race_group_id == group));
            state.advance();
        }
    }

    #[test]
    fn test_advance_wraps() {
        let mut state = state();
        let start = state.selection();
        let n = state.race_groups().len();
        assert_eq!(n, 3);
        for _ in 0..n {
            state.advance();
        }
        assert_eq!(state.selection(), start);
        state.advance();
        assert_eq!(state.current_group(), "lavaredo");
    }

    #[test]
    fn test_y_domain_is_niced_and_contains_extent() {
        let mut state = state();
        for _ in 0..3 {
            let (lo, hi) = extent(state.active(), |r| r.time_seconds).unwrap();
            let (d0, d1) = state.y_scale().domain;
            assert!(d0 <= lo && d1 >= hi);
            state.advance();
        }
        assert_eq!(state.y_scale().domain, (69_500.0, 74_000.0));
    }

    #[test]
    fn test_x_scale_spans_whole_dataset() {
        let mut state = state();
        assert_eq!(state.x_scale().domain, (2017.0, 2021.0));
        state.advance();
        assert_eq!(state.x_scale().domain, (2017.0, 2021.0));
        assert_eq!(state.x_scale().range, (0.0, 960.0));
    }

    #[test]
    fn test_select_by_id_and_index() {
        let mut state = state();
        state.select_group("western").unwrap();
        assert_eq!(state.selection(), 2);
        assert!(matches!(state.select_group("hardrock"), Err(ChartError::UnknownRace(_))));
        assert!(state.select_index(3).is_err());
        state.select_index(1).unwrap();
        assert_eq!(state.active().len(), 2);
    }

    #[test]
    fn test_nearest_and_tooltip() {
        let state = state();
        // 2018 sits at a quarter of the 2017..2021 span.
        let x = state.x_scale().apply(2018.0);
        assert_eq!(x, 240.0);
        let record = state.nearest_at(x + 20.0).unwrap();
        assert_eq!(record.year, 2018);

        let tooltip = state.tooltip_at(x, (600.0, 200.0)).unwrap();
        assert_eq!(tooltip.year_label, "2018");
        assert_eq!(tooltip.time_label, "20H 30M");
        assert_eq!(tooltip.highlight.0, 240.0);
        assert!((tooltip.anchor.0 - 180.0).abs() < 1e-9);
        let cy = state.y_scale().apply(73_800.0);
        assert!((tooltip.anchor.1 - (cy + 10.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pointer_to_bounds() {
        let state = state();
        let (x, y) = state.pointer_to_bounds((300.0, 100.0), (600.0, 200.0));
        assert_eq!(x, 600.0 - 120.0);
        assert_eq!(y, 200.0 - 10.0);
        // Letterboxed: a taller box keeps the horizontal scale.
        let (x, _) = state.pointer_to_bounds((300.0, 100.0), (600.0, 900.0));
        assert_eq!(x, 480.0);
    }

    #[test]
    fn test_two_record_single_group_scene() {
        let text = "event_race,event,race,year,time_in_seconds\nsolo,Solo,50K,2015,20000\nsolo,Solo,50K,2020,18000\n";
        let state = ChartState::new(parse_csv_str(text).unwrap(), ChartConfig::default()).unwrap();
        let scene = state.scene();
        assert_eq!(scene.segment_count(), 1);
        assert_eq!(scene.markers.len(), 2);
        let x = state.x_scale();
        let y = state.y_scale();
        assert_eq!(scene.markers[0].cx, x.apply(2015.0));
        assert_eq!(scene.markers[0].cy, y.apply(20_000.0));
        assert_eq!(scene.markers[1].cx, x.apply(2020.0));
        assert_eq!(scene.markers[1].cy, y.apply(18_000.0));
        assert_eq!(scene.markers[0].cx, 0.0);
        assert_eq!(scene.markers[1].cx, 960.0);
    }
}
