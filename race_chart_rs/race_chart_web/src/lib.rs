use leptos::*;

use race_chart::{
    parse_csv_str, Axis, AxisOrientation, ChartConfig, ChartState, Scene, Tooltip, Transition,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_COMMIT: &str = env!("RACE_CHART_COMMIT");

/// Timing table fetched once when the page mounts.
const DATA_URL: &str = "race_times.csv";
const TICK_PX: f64 = 6.0;

fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

async fn fetch_text(url: &str) -> Result<String, String> {
    let window = web_sys::window().ok_or_else(|| "no window available".to_string())?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_error)?;
    let response: web_sys::Response = response.dyn_into().map_err(js_error)?;
    if !response.ok() {
        return Err(format!("HTTP {} for {}", response.status(), url));
    }
    let body = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    body.as_string()
        .ok_or_else(|| "response body is not text".to_string())
}

fn load_state(text: &str, config: ChartConfig) -> Result<ChartState, String> {
    let dataset = parse_csv_str(text).map_err(|e| e.to_string())?;
    ChartState::new(dataset, config).map_err(|e| e.to_string())
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Empty starting point for the first draw, so every marker enters.
fn entrance_from(target: &Scene) -> Scene {
    Scene {
        line: Vec::new(),
        markers: Vec::new(),
        ..target.clone()
    }
}

fn tooltip_style(tooltip: Option<&Tooltip>) -> String {
    match tooltip {
        Some(t) => format!(
            "opacity: 1; transform: translate(calc(-50% + {:.1}px), calc(-100% + {:.1}px));",
            t.anchor.0, t.anchor.1
        ),
        None => "opacity: 0;".to_string(),
    }
}

/// Rendered chart box in client pixels, as given by `getBoundingClientRect`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ChartBox {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

fn tooltip_for_client(
    chart: &ChartState,
    client: (f64, f64),
    chart_box: ChartBox,
) -> Option<Tooltip> {
    let rendered = (chart_box.width, chart_box.height);
    let pointer = (client.0 - chart_box.left, client.1 - chart_box.top);
    let (x, _) = chart.pointer_to_bounds(pointer, rendered);
    chart.tooltip_at(x, rendered)
}

fn translate(x: f64, y: f64) -> String {
    format!("translate({x},{y})")
}

/// Drive `transition` on animation frames until it finishes or a newer one
/// replaces it.
fn animate(
    transition: Transition,
    started: f64,
    token: u64,
    generation: StoredValue<u64>,
    frame: RwSignal<Option<Scene>>,
) {
    request_animation_frame(move || {
        if generation.get_value() != token {
            return;
        }
        let elapsed = now_ms() - started;
        frame.set(Some(transition.frame(elapsed)));
        if !transition.is_finished(elapsed) {
            animate(transition, started, token, generation, frame);
        }
    });
}

fn start_transition(
    from: Scene,
    to: Scene,
    duration_ms: f64,
    generation: StoredValue<u64>,
    frame: RwSignal<Option<Scene>>,
) {
    generation.update_value(|g| *g += 1);
    let token = generation.get_value();
    animate(
        Transition::new(from, to, duration_ms),
        now_ms(),
        token,
        generation,
        frame,
    );
}

fn axis_view(axis: &Axis) -> View {
    match axis.orientation {
        AxisOrientation::Bottom => {
            let ticks = axis
                .ticks
                .iter()
                .map(|tick| {
                    view! {
                        <g class="tick" transform=translate(tick.offset, 0.0)>
                            <line y2=TICK_PX stroke="currentColor"/>
                            <text y={TICK_PX + 3.0} dy="0.71em" text-anchor="middle" fill="currentColor">
                                {tick.label.clone()}
                            </text>
                        </g>
                    }
                })
                .collect_view();
            view! {
                <g class="x-axis" transform=translate(0.0, axis.translate) font-size="10">
                    <path class="domain" fill="none" stroke="currentColor"
                        d=format!("M{},0H{}", axis.range.0, axis.range.1)/>
                    {ticks}
                </g>
            }
            .into_view()
        }
        AxisOrientation::Left => {
            let ticks = axis
                .ticks
                .iter()
                .map(|tick| {
                    view! {
                        <g class="tick" transform=translate(0.0, tick.offset)>
                            <line x2={-TICK_PX} stroke="currentColor"/>
                            <text x={-(TICK_PX + 3.0)} dy="0.32em" text-anchor="end" fill="currentColor">
                                {tick.label.clone()}
                            </text>
                        </g>
                    }
                })
                .collect_view();
            view! {
                <g class="y-axis" transform=translate(axis.translate, 0.0) font-size="10">
                    <path class="domain" fill="none" stroke="currentColor"
                        d=format!("M0,{}V{}", axis.range.0, axis.range.1)/>
                    {ticks}
                </g>
            }
            .into_view()
        }
    }
}

#[component]
pub fn App() -> impl IntoView {
    let config = ChartConfig::default();

    let state = create_rw_signal(Option::<ChartState>::None);
    let frame = create_rw_signal(Option::<Scene>::None);
    let tooltip = create_rw_signal(Option::<Tooltip>::None);
    let status = create_rw_signal(String::from("Loading race data…"));
    let generation = store_value(0u64);

    {
        let config = config.clone();
        spawn_local(async move {
            let loaded = fetch_text(DATA_URL)
                .await
                .and_then(|text| load_state(&text, config));
            match loaded {
                Ok(chart) => {
                    let target = chart.scene();
                    let duration = chart.config().transition_ms;
                    status.set(format!(
                        "{} records across {} races.",
                        chart.dataset().len(),
                        chart.race_groups().len()
                    ));
                    state.set(Some(chart));
                    start_transition(entrance_from(&target), target, duration, generation, frame);
                }
                Err(err) => status.set(format!("Failed to load {DATA_URL}: {err}")),
            }
        });
    }

    let on_change_race = move |_ev: leptos::ev::MouseEvent| {
        let mut next = None;
        state.update(|chart| {
            if let Some(chart) = chart.as_mut() {
                let to = chart.advance();
                next = Some((to, chart.config().transition_ms));
            }
        });
        let Some((to, duration)) = next else {
            return;
        };
        tooltip.set(None);
        let from = frame.get_untracked().unwrap_or_else(|| to.clone());
        start_transition(from, to, duration, generation, frame);
    };

    let on_pointer_move = move |ev: leptos::ev::MouseEvent| {
        // Delegated handlers see `window` as currentTarget; start from the
        // element that was actually hit.
        let Some(hit) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        else {
            return;
        };
        let Ok(Some(svg)) = hit.closest("svg") else {
            return;
        };
        let rect = svg.get_bounding_client_rect();
        let chart_box = ChartBox {
            left: rect.left(),
            top: rect.top(),
            width: rect.width(),
            height: rect.height(),
        };
        let client = (ev.client_x() as f64, ev.client_y() as f64);
        let next = state.with_untracked(|chart| {
            chart
                .as_ref()
                .and_then(|chart| tooltip_for_client(chart, client, chart_box))
        });
        tooltip.set(next);
    };

    let on_pointer_leave = move |_ev: leptos::ev::MouseEvent| tooltip.set(None);

    let line_color = config.line_color.clone();
    let line_width = config.line_width;
    let marker_color = config.marker_color.clone();
    let highlight_color = config.highlight_color.clone();
    let highlight_radius = config.highlight_radius;
    let bounded_width = config.bounded_width();
    let bounded_height = config.bounded_height();
    let caption = config.caption.clone().unwrap_or_default();

    let subtitle = move || {
        frame.with(|f| f.as_ref().map(|scene| scene.subtitle.clone()).unwrap_or_default())
    };
    let markers = move || {
        let color = marker_color.clone();
        frame.with(|f| {
            f.as_ref().map(|scene| {
                scene
                    .markers
                    .iter()
                    .map(|m| view! { <circle cx=m.cx cy=m.cy r=m.r fill=color.clone()/> })
                    .collect_view()
            })
        })
    };
    let axes = move || {
        frame.with(|f| {
            f.as_ref().map(|scene| {
                view! {
                    {axis_view(&scene.x_axis)}
                    {axis_view(&scene.y_axis)}
                }
            })
        })
    };

    view! {
        <main id="wrapper" class="race-chart">
            <header>
                <h1>"Race winning times"</h1>
                <p id="event" class="subtitle">{move || subtitle().event}</p>
                <p id="race" class="subtitle">{move || subtitle().race}</p>
            </header>
            <div class="chart">
                <div id="tooltip" class="tooltip" style=move || tooltip.with(|t| tooltip_style(t.as_ref()))>
                    <div class="year">{move || tooltip.with(|t| t.as_ref().map(|t| t.year_label.clone()))}</div>
                    <div class="time">{move || tooltip.with(|t| t.as_ref().map(|t| t.time_label.clone()))}</div>
                </div>
                <svg
                    viewBox=format!("0 0 {} {}", config.width, config.height)
                    preserveAspectRatio="xMinYMin meet"
                >
                    <g transform=translate(config.margin.left, config.margin.top)>
                        <g class="line">
                            <path
                                fill="transparent"
                                stroke=line_color
                                stroke-width=line_width
                                d=move || frame.with(|f| f.as_ref().map(Scene::path_data).unwrap_or_default())
                            />
                        </g>
                        {axes}
                        {markers}
                        <circle
                            class="tooltip-circle"
                            r=highlight_radius
                            fill="transparent"
                            stroke=highlight_color
                            stroke-width="1"
                            cx=move || tooltip.with(|t| t.as_ref().map(|t| t.highlight.0).unwrap_or(0.0))
                            cy=move || tooltip.with(|t| t.as_ref().map(|t| t.highlight.1).unwrap_or(0.0))
                            style=move || if tooltip.with(Option::is_some) { "opacity: 1;" } else { "opacity: 0;" }
                        />
                        <rect
                            class="listening-rect"
                            width=bounded_width
                            height=bounded_height
                            fill="transparent"
                            on:mousemove=on_pointer_move
                            on:mouseleave=on_pointer_leave
                        />
                    </g>
                </svg>
            </div>
            <p class="caption">{caption}</p>
            <button class="btn" on:click=on_change_race disabled=move || state.with(Option::is_none)>
                "Change Race"
            </button>
            <p class="note">{move || status.get()}</p>
            <p class="note">{"Web version "}{APP_VERSION}{" ("}{APP_COMMIT}{")"}</p>
        </main>
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    leptos::mount_to_body(|| view! { <App/> });
}
