use std::fs;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::text_anchor::{HPos, Pos, VPos};
use race_chart::{load_csv_path, Axis, AxisOrientation, ChartConfig, ChartState, Scene, Tooltip};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Space above the plot for the event/race subtitle.
const HEADER_PX: u32 = 48;
/// Space below the plot for the caption.
const FOOTER_PX: u32 = 24;
const TICK_PX: i32 = 6;

#[derive(Parser, Debug)]
#[command(author, version, about = "Race timing chart CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the race groups found in a timing CSV
    Races(RacesArgs),
    /// Render one race group (or all of them) to SVG
    Render(RenderArgs),
    /// Resolve the record nearest to a year or pixel position
    Nearest(NearestArgs),
    /// Dump the scene for one race group as JSON
    Scene(SceneArgs),
}

#[derive(Parser, Debug)]
struct RacesArgs {
    /// Timing CSV (event_race, event, race, year, time_in_seconds)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Timing CSV (event_race, event, race, year, time_in_seconds)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Race group to draw: zero-based index or event_race id
    #[arg(long)]
    race: Option<String>,

    /// Render every race group into --out-dir
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "race")]
    all: bool,

    /// Output SVG path
    #[arg(short, long, default_value = "race_chart.svg", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Output directory for --all
    #[arg(long, default_value = "charts", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Highlight the record nearest to this year, as the tooltip would
    #[arg(long)]
    highlight: Option<f64>,

    /// Optional chart layout JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct NearestArgs {
    /// Timing CSV (event_race, event, race, year, time_in_seconds)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Race group to query: zero-based index or event_race id
    #[arg(long)]
    race: Option<String>,

    /// Query year
    #[arg(long, required_unless_present = "pixel", conflicts_with = "pixel")]
    year: Option<f64>,

    /// Horizontal pixel inside the plotting area
    #[arg(long)]
    pixel: Option<f64>,

    /// Optional chart layout JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Timing CSV (event_race, event, race, year, time_in_seconds)
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Race group to dump: zero-based index or event_race id
    #[arg(long)]
    race: Option<String>,

    /// Optional chart layout JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Races(args) => args.verbose,
        Command::Render(args) => args.verbose,
        Command::Nearest(args) => args.verbose,
        Command::Scene(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Races(args) => handle_races(args),
        Command::Render(args) => handle_render(args),
        Command::Nearest(args) => handle_nearest(args),
        Command::Scene(args) => handle_scene(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ChartConfig> {
    match path {
        Some(path) => ChartConfig::from_json_path(path)
            .with_context(|| format!("failed to load chart config {}", path.display())),
        None => Ok(ChartConfig::default()),
    }
}

fn load_state(input: &Path, config: ChartConfig) -> Result<ChartState> {
    let dataset =
        load_csv_path(input).with_context(|| format!("failed to load {}", input.display()))?;
    let state = ChartState::new(dataset, config)?;
    info!(
        "Loaded {} records in {} race groups from {}",
        state.dataset().len(),
        state.race_groups().len(),
        input.display()
    );
    Ok(state)
}

/// Accepts a zero-based index or a race-group id.
fn select_race(state: &mut ChartState, race: Option<&str>) -> Result<()> {
    let Some(token) = race else {
        return Ok(());
    };
    let token = token.trim();
    if let Ok(index) = token.parse::<usize>() {
        if index < state.race_groups().len() {
            state.select_index(index)?;
            return Ok(());
        }
    }
    state.select_group(token)?;
    Ok(())
}

fn handle_races(args: RacesArgs) -> Result<()> {
    let mut state = load_state(&args.input, ChartConfig::default())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "index\tid\tevent\trace\trecords\tyears")?;
    for index in 0..state.race_groups().len() {
        state.select_index(index)?;
        let active = state.active();
        let first = active
            .first()
            .ok_or_else(|| anyhow!("race group {} has no records", state.current_group()))?;
        let min_year = active.iter().map(|r| r.year).min().unwrap_or(first.year);
        let max_year = active.iter().map(|r| r.year).max().unwrap_or(first.year);
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}-{}",
            index,
            state.current_group(),
            first.event_name,
            first.race_name,
            active.len(),
            min_year,
            max_year
        )?;
    }
    Ok(())
}

fn handle_render(args: RenderArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let mut state = load_state(&args.input, config)?;

    if args.all {
        fs::create_dir_all(&args.out_dir)
            .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
        let mut written = 0usize;
        for index in 0..state.race_groups().len() {
            state.select_index(index)?;
            let path = args
                .out_dir
                .join(format!("{:02}_{}.svg", index, slug(state.current_group())));
            let tooltip = highlight_tooltip(&state, args.highlight);
            match render_chart_guard(&state, tooltip.as_ref(), &path) {
                Ok(()) => {
                    written += 1;
                    debug!("Wrote chart: {}", path.display());
                }
                Err(err) => warn!("Skipping SVG render ({}): {}", path.display(), err),
            }
        }
        info!("Wrote {} charts into {}", written, args.out_dir.display());
        return Ok(());
    }

    select_race(&mut state, args.race.as_deref())?;
    let tooltip = highlight_tooltip(&state, args.highlight);
    render_chart_guard(&state, tooltip.as_ref(), &args.output)
        .map_err(|err| anyhow!("failed to render {}: {}", args.output.display(), err))?;
    info!(
        "Wrote chart for {}: {}",
        state.current_group(),
        args.output.display()
    );
    Ok(())
}

fn handle_nearest(args: NearestArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let mut state = load_state(&args.input, config)?;
    select_race(&mut state, args.race.as_deref())?;

    let pixel = match (args.pixel, args.year) {
        (Some(px), _) => px,
        (None, Some(year)) => state.x_scale().apply(year),
        (None, None) => return Err(anyhow!("either --year or --pixel is required")),
    };
    let rendered = (state.config().width, state.config().height);
    let tooltip = state
        .tooltip_at(pixel, rendered)
        .ok_or_else(|| anyhow!("race group {} has no records", state.current_group()))?;
    debug!(
        "Pointer {:.1}px -> year {:.2}",
        pixel,
        state.x_scale().invert(pixel)
    );
    println!("{}\t{}", tooltip.year_label, tooltip.time_label);
    Ok(())
}

fn scene_json(scene: &Scene, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(scene)
    } else {
        serde_json::to_string(scene)
    };
    json.context("failed to serialise scene")
}

fn handle_scene(args: SceneArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let mut state = load_state(&args.input, config)?;
    select_race(&mut state, args.race.as_deref())?;
    let scene = state.scene();
    debug!(
        "Scene for {}: {} markers, {} segments",
        state.current_group(),
        scene.markers.len(),
        scene.segment_count()
    );
    println!("{}", scene_json(&scene, args.pretty)?);
    Ok(())
}

fn highlight_tooltip(state: &ChartState, year: Option<f64>) -> Option<Tooltip> {
    let year = year?;
    let config = state.config();
    state.tooltip_at(state.x_scale().apply(year), (config.width, config.height))
}

fn slug(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for ch in id.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "race".to_string()
    } else {
        trimmed.to_string()
    }
}

fn render_chart_guard(
    state: &ChartState,
    tooltip: Option<&Tooltip>,
    path: &Path,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        let scene = state.scene();
        let config = state.config();
        let size = canvas_size(config);
        let backend = SVGBackend::new(path, size);
        draw_chart(backend.into_drawing_area(), &scene, config, tooltip)
            .map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn canvas_size(config: &ChartConfig) -> (u32, u32) {
    (
        config.width.round().max(1.0) as u32,
        config.height.round().max(1.0) as u32 + HEADER_PX + FOOTER_PX,
    )
}

fn parse_hex_color(text: &str) -> Result<RGBColor> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("invalid colour '{}': expected #rrggbb", text));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    scene: &Scene,
    config: &ChartConfig,
    tooltip: Option<&Tooltip>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (header, rest) = root.split_vertically(HEADER_PX);
    let (plot, footer) = rest.split_vertically(config.height.round().max(1.0) as u32);

    let line_color = parse_hex_color(&config.line_color)?;
    let marker_color = parse_hex_color(&config.marker_color)?;
    let highlight_color = parse_hex_color(&config.highlight_color)?;

    header.draw(&Text::new(
        scene.subtitle.event.clone(),
        (config.margin.left.round() as i32, 6),
        FontDesc::new(FontFamily::SansSerif, 20.0, FontStyle::Bold).color(&BLACK),
    ))?;
    header.draw(&Text::new(
        scene.subtitle.race.clone(),
        (config.margin.left.round() as i32, 30),
        FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal).color(&BLACK.mix(0.7)),
    ))?;

    let origin = (config.margin.left, config.margin.top);
    let px = move |x: f64, y: f64| -> (i32, i32) {
        ((x + origin.0).round() as i32, (y + origin.1).round() as i32)
    };

    draw_axis(&plot, &scene.x_axis, &px)?;
    draw_axis(&plot, &scene.y_axis, &px)?;

    let line_style = ShapeStyle {
        color: line_color.to_rgba(),
        filled: false,
        stroke_width: config.line_width.round().max(1.0) as u32,
    };
    let vertices: Vec<(i32, i32)> = scene.line.iter().map(|&(x, y)| px(x, y)).collect();
    if vertices.len() > 1 {
        plot.draw(&PathElement::new(vertices, line_style))?;
    }

    for marker in &scene.markers {
        plot.draw(&Circle::new(
            px(marker.cx, marker.cy),
            marker.r.round() as i32,
            marker_color.filled(),
        ))?;
    }

    if let Some(tooltip) = tooltip {
        let (cx, cy) = px(tooltip.highlight.0, tooltip.highlight.1);
        plot.draw(&Circle::new(
            (cx, cy),
            config.highlight_radius.round() as i32,
            ShapeStyle {
                color: highlight_color.to_rgba(),
                filled: false,
                stroke_width: 1,
            },
        ))?;
        plot.draw(&Text::new(
            format!("{}  {}", tooltip.year_label, tooltip.time_label),
            (cx, cy - config.highlight_radius.round() as i32 - 4),
            FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Bold)
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom)),
        ))?;
    }

    if let Some(caption) = config.caption.as_ref() {
        footer.draw(&Text::new(
            caption.clone(),
            (config.margin.left.round() as i32, 4),
            FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal).color(&BLACK.mix(0.6)),
        ))?;
    }

    root.present()?;
    Ok(())
}

fn draw_axis<DB, F>(area: &DrawingArea<DB, Shift>, axis: &Axis, px: &F) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    F: Fn(f64, f64) -> (i32, i32),
{
    let stroke = ShapeStyle {
        color: BLACK.to_rgba(),
        filled: false,
        stroke_width: 1,
    };
    let font = FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal);
    match axis.orientation {
        AxisOrientation::Bottom => {
            let y = axis.translate;
            area.draw(&PathElement::new(
                vec![px(axis.range.0, y), px(axis.range.1, y)],
                stroke,
            ))?;
            for tick in &axis.ticks {
                let (x0, y0) = px(tick.offset, y);
                area.draw(&PathElement::new(vec![(x0, y0), (x0, y0 + TICK_PX)], stroke))?;
                area.draw(&Text::new(
                    tick.label.clone(),
                    (x0, y0 + TICK_PX + 3),
                    font.clone()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Center, VPos::Top)),
                ))?;
            }
        }
        AxisOrientation::Left => {
            let x = axis.translate;
            area.draw(&PathElement::new(
                vec![px(x, axis.range.0), px(x, axis.range.1)],
                stroke,
            ))?;
            for tick in &axis.ticks {
                let (x0, y0) = px(x, tick.offset);
                area.draw(&PathElement::new(vec![(x0 - TICK_PX, y0), (x0, y0)], stroke))?;
                area.draw(&Text::new(
                    tick.label.clone(),
                    (x0 - TICK_PX - 3, y0),
                    font.clone()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Right, VPos::Center)),
                ))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_chart::parse_csv_str;

    const TWO_POINTS: &str = "\
event_race,event,race,year,time_in_seconds
solo_50k,Solo Trail,50K,2015,20000
solo_50k,Solo Trail,50K,2020,18000
";

    const RACES: &str = "\
event_race,event,race,year,time_in_seconds
utmb,UTMB,171K,2017,69600
lavaredo,Lavaredo,120K,2017,45000
utmb,UTMB,171K,2018,73800
lavaredo,Lavaredo,120K,2019,44000
";

    fn render_to_string(state: &ChartState, tooltip: Option<&Tooltip>) -> String {
        let mut buf = String::new();
        {
            let size = canvas_size(state.config());
            let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
            draw_chart(root, &state.scene(), state.config(), tooltip).expect("chart draws");
        }
        buf
    }

    #[test]
    fn test_two_record_chart_has_one_line_and_two_markers() {
        let state =
            ChartState::new(parse_csv_str(TWO_POINTS).unwrap(), ChartConfig::default()).unwrap();
        let svg = render_to_string(&state, None);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert_eq!(svg.to_ascii_uppercase().matches("#2A9D8F").count(), 1);
        assert!(svg.contains("Solo Trail"));
        assert!(svg.contains("5H 33M"));
    }

    #[test]
    fn test_highlight_adds_ring_and_label() {
        let state =
            ChartState::new(parse_csv_str(TWO_POINTS).unwrap(), ChartConfig::default()).unwrap();
        let tooltip = highlight_tooltip(&state, Some(2019.0)).unwrap();
        assert_eq!(tooltip.year, 2020);
        let svg = render_to_string(&state, Some(&tooltip));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("2020  5H 00M"));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#2a9d8f").unwrap(), RGBColor(0x2a, 0x9d, 0x8f));
        assert!(parse_hex_color("teal").is_err());
        assert!(parse_hex_color("#12345").is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("UTMB / CCC 2019"), "utmb-ccc-2019");
        assert_eq!(slug("***"), "race");
    }

    #[test]
    fn test_select_race_by_index_or_id() {
        let mut state =
            ChartState::new(parse_csv_str(RACES).unwrap(), ChartConfig::default()).unwrap();
        select_race(&mut state, Some("1")).unwrap();
        assert_eq!(state.current_group(), "lavaredo");
        select_race(&mut state, Some("utmb")).unwrap();
        assert_eq!(state.selection(), 0);
        assert!(select_race(&mut state, Some("hardrock")).is_err());
        select_race(&mut state, None).unwrap();
        assert_eq!(state.selection(), 0);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["race-chart", "render", "data.csv", "--race", "2"]).unwrap();
        match cli.command {
            Command::Render(args) => {
                assert_eq!(args.race.as_deref(), Some("2"));
                assert_eq!(args.output, PathBuf::from("race_chart.svg"));
                assert!(!args.all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(
            Cli::try_parse_from(["race-chart", "render", "d.csv", "--all", "--race", "1"]).is_err()
        );
        assert!(Cli::try_parse_from(["race-chart", "nearest", "d.csv"]).is_err());
        assert!(Cli::try_parse_from(["race-chart", "nearest", "d.csv", "--year", "2019"]).is_ok());
    }

    #[test]
    fn test_scene_json_output() {
        let state =
            ChartState::new(parse_csv_str(TWO_POINTS).unwrap(), ChartConfig::default()).unwrap();
        let scene = state.scene();
        let json = scene_json(&scene, false).unwrap();
        assert!(json.contains("\"subtitle\":{\"event\":\"Solo Trail\",\"race\":\"50K\"}"));
        let parsed: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.subtitle, scene.subtitle);
        assert!(scene_json(&scene, true).unwrap().contains('\n'));
    }

    #[test]
    fn test_render_all_writes_one_file_per_race() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("races.csv");
        fs::write(&input, RACES).unwrap();
        let out_dir = dir.path().join("charts");
        let cli = Cli::try_parse_from([
            "race-chart",
            "render",
            input.to_str().unwrap(),
            "--all",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
        .unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render command");
        };
        handle_render(args).unwrap();
        let first = fs::read_to_string(out_dir.join("00_utmb.svg")).unwrap();
        assert!(first.contains("<svg"));
        assert!(out_dir.join("01_lavaredo.svg").exists());
    }
}
