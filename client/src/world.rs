//! The world map canvas.
//!
//! One component owns the whole scene: geometry loaded once from the two
//! topology documents, a projection fitted to the current viewport, the
//! centroid index derived from it, the pin set and the live blip list. All
//! of it lives in a single [`WorldState`] mutated only from this component's
//! event handlers and frame callback.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use gloo_storage::Storage;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent};

use worldpulse_map::{
    Blip, BlipKind, BlipSchedule, CentroidIndex, CountryCode, Equirectangular, Topology,
    WorldGeometry, alpha2_for_numeric,
};

use crate::app::{BlipRequests, HoverState, Hovered, PinRequests, SelectedCountry};
use crate::render_loop::FrameLoop;
use crate::scene;

/// Latitude below which outline rendering is clipped away.
pub(crate) const SOUTH_GATE_LAT: f64 = -60.0;
/// Hover snaps to the nearest country centroid within this many logical px.
const HOVER_RADIUS_PX: f64 = 20.0;
/// Backing-store resolution cap: device pixel ratio beyond 2 costs more than
/// it shows.
const MAX_BACKING_SCALE: f64 = 2.0;

const LAND_URL: &str = "/world/land-110m.json";
const COUNTRIES_URL: &str = "/world/countries-110m.json";
const LAND_OBJECT: &str = "land";
const COUNTRIES_OBJECT: &str = "countries";
const PIN_CACHE_KEY: &str = "worldpulse_pins";

/// Everything the renderer owns. Single writer: this component.
pub(crate) struct WorldState {
    pub geometry: Option<WorldGeometry>,
    pub projection: Option<Equirectangular>,
    pub centroids: CentroidIndex,
    pub pins: HashSet<CountryCode>,
    pub blips: BlipSchedule,
    pub width: f64,
    pub height: f64,
}

impl WorldState {
    fn new() -> Self {
        Self {
            geometry: None,
            projection: None,
            centroids: CentroidIndex::default(),
            pins: HashSet::new(),
            blips: BlipSchedule::default(),
            width: 0.0,
            height: 0.0,
        }
    }

    /// Recompute the projection for a viewport size. The centroid index is
    /// rebuilt in the same call — it is never valid for any other
    /// projection.
    fn refit(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        let projection = match &self.geometry {
            Some(geometry) => Equirectangular::fit_extent(geometry.land.bounds(), width, height)
                .unwrap_or_else(|| Equirectangular::fallback(width, height)),
            None => Equirectangular::fallback(width, height),
        };
        self.centroids = match &self.geometry {
            Some(geometry) => CentroidIndex::build(&geometry.countries, &projection),
            None => CentroidIndex::default(),
        };
        self.projection = Some(projection);
    }

    fn install_geometry(&mut self, geometry: WorldGeometry) {
        self.geometry = Some(geometry);
        if self.width > 0.0 && self.height > 0.0 {
            self.refit(self.width, self.height);
        }
    }
}

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
}

#[component]
pub fn WorldBackground() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let SelectedCountry(selected) = expect_context();
    let PinRequests(pin_requests) = expect_context();
    let BlipRequests(blip_requests) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let state: Rc<RefCell<WorldState>> = Rc::new(RefCell::new(WorldState::new()));
    state.borrow_mut().pins = load_pin_cache();

    // Cleared on disposal; the in-flight topology fetch checks it before
    // touching state.
    let alive: Rc<Cell<bool>> = Rc::new(Cell::new(true));

    // Continuous repaint. Sizing is rechecked every frame: the first frame
    // and any missed resize both land here, and a size change refits the
    // projection and centroid index together.
    let frame_state = state.clone();
    let frame_loop = Rc::new(FrameLoop::start(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let w = canvas.client_width() as f64;
        let h = canvas.client_height() as f64;
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        let dpr = web_sys::window()
            .map(|win| win.device_pixel_ratio())
            .unwrap_or(1.0)
            .clamp(1.0, MAX_BACKING_SCALE);
        let backing_w = (w * dpr).round().max(1.0) as u32;
        let backing_h = (h * dpr).round().max(1.0) as u32;
        if canvas.width() != backing_w || canvas.height() != backing_h {
            canvas.set_width(backing_w);
            canvas.set_height(backing_h);
        }

        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            return;
        };
        // All drawing happens in logical pixel coordinates.
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

        let mut st = frame_state.borrow_mut();
        if st.width != w || st.height != h {
            st.refit(w, h);
        }
        scene::draw_scene(&ctx, &mut st, js_sys::Date::now());
    }));

    // Load the two topology documents once. Failure leaves the scene
    // background-only rather than blocking the page.
    let fetch_started = Rc::new(Cell::new(false));
    Effect::new({
        let state = state.clone();
        let alive = alive.clone();
        move || {
            if fetch_started.replace(true) {
                return;
            }
            let state = state.clone();
            let alive = alive.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match load_world_geometry().await {
                    Ok(geometry) => {
                        if !alive.get() {
                            return;
                        }
                        state.borrow_mut().install_geometry(geometry);
                    }
                    Err(err) => {
                        web_sys::console::warn_1(
                            &format!("world topology unavailable, rendering background only: {err}")
                                .into(),
                        );
                    }
                }
            });
        }
    });

    // Pin channel: valid codes join the pin set (and the cache); everything
    // else is dropped without comment.
    Effect::new({
        let state = state.clone();
        move || {
            let pending = pin_requests.get();
            if pending.is_empty() {
                return;
            }
            pin_requests.update_untracked(|queue| queue.clear());
            let mut st = state.borrow_mut();
            let mut changed = false;
            for raw in &pending {
                changed |= merge_pin(&mut st.pins, raw);
            }
            if changed {
                store_pin_cache(&st.pins);
            }
        }
    });

    // Blip channel: server-confirmed pulses land on the country's centroid.
    Effect::new({
        let state = state.clone();
        move || {
            let pending = blip_requests.get();
            if pending.is_empty() {
                return;
            }
            blip_requests.update_untracked(|queue| queue.clear());
            let mut guard = state.borrow_mut();
            let st = &mut *guard;
            let now = js_sys::Date::now();
            for request in &pending {
                let Some(code) = CountryCode::parse(&request.country) else {
                    continue;
                };
                let Some((x, y)) = st.centroids.get(code) else {
                    continue;
                };
                st.blips.spawn(Blip {
                    x,
                    y,
                    kind: request.kind,
                    started_ms: now,
                });
            }
        }
    });

    // Window resize refits synchronously; the next frame draws with the new
    // projection.
    let resize_binding: Rc<RefCell<Option<ResizeBinding>>> = Rc::new(RefCell::new(None));
    Effect::new({
        let state = state.clone();
        let resize_binding = resize_binding.clone();
        move || {
            if resize_binding.borrow().is_some() {
                return;
            }
            let Some(window) = web_sys::window() else {
                return;
            };
            let handler = Closure::<dyn Fn()>::new({
                let state = state.clone();
                move || {
                    let Some(canvas) = canvas_ref.get_untracked() else {
                        return;
                    };
                    let w = canvas.client_width() as f64;
                    let h = canvas.client_height() as f64;
                    if w > 0.0 && h > 0.0 {
                        state.borrow_mut().refit(w, h);
                    }
                }
            });
            if window
                .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
                .is_ok()
            {
                *resize_binding.borrow_mut() = Some(ResizeBinding { window, handler });
            }
        }
    });

    let on_click = {
        let state = state.clone();
        move |e: MouseEvent| {
            let Some(canvas) = canvas_ref.get_untracked() else {
                return;
            };
            let rect = canvas.get_bounding_client_rect();
            let local_x = e.client_x() as f64 - rect.left();
            let local_y = e.client_y() as f64 - rect.top();
            if let Some(code) = resolve_click(&state, local_x, local_y) {
                selected.set(Some(code));
            }
        }
    };

    let on_pointer_move = {
        let state = state.clone();
        move |e: PointerEvent| {
            let Some(canvas) = canvas_ref.get_untracked() else {
                return;
            };
            let rect = canvas.get_bounding_client_rect();
            let local_x = e.client_x() as f64 - rect.left();
            let local_y = e.client_y() as f64 - rect.top();
            let country = {
                let st = state.borrow();
                st.centroids
                    .nearest_within(local_x, local_y, HOVER_RADIUS_PX)
                    .map(|(code, _)| code)
            };
            hovered.set(HoverState {
                country,
                x: e.client_x() as f64,
                y: e.client_y() as f64,
            });
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        hovered.set(HoverState::idle());
    };

    // Teardown runs once: stop the frame loop, drop the resize listener and
    // mark the component dead for the in-flight fetch.
    let disposed = Rc::new(Cell::new(false));
    on_cleanup({
        let alive = alive.clone();
        let frame_loop = frame_loop.clone();
        let resize_binding = resize_binding.clone();
        move || {
            if disposed.replace(true) {
                return;
            }
            alive.set(false);
            frame_loop.cancel();
            if let Some(binding) = resize_binding.borrow_mut().take() {
                let _ = binding.window.remove_event_listener_with_callback(
                    "resize",
                    binding.handler.as_ref().unchecked_ref(),
                );
            }
        }
    });

    view! {
        <canvas
            node_ref=canvas_ref
            style="position: absolute; inset: 0; width: 100%; height: 100%; display: block; cursor: crosshair;"
            on:click=on_click
            on:pointermove=on_pointer_move
            on:pointerleave=on_pointer_leave
        />
    }
}

/// Click → inverse-project → country containment scan. A hit spawns a
/// first-time blip at the country's cached centroid (or the click point if
/// the centroid is not indexed yet) and reports the alpha-2 code.
fn resolve_click(
    state: &Rc<RefCell<WorldState>>,
    local_x: f64,
    local_y: f64,
) -> Option<CountryCode> {
    let mut guard = state.borrow_mut();
    let st = &mut *guard;
    let geometry = st.geometry.as_ref()?;
    let projection = st.projection.as_ref()?;
    let (lon, lat) = projection.invert(local_x, local_y);
    let numeric_id = geometry.countries.hit_test(lon, lat)?;
    let code = alpha2_for_numeric(numeric_id)?;
    let (x, y) = st.centroids.get(code).unwrap_or((local_x, local_y));
    st.blips.spawn(Blip {
        x,
        y,
        kind: BlipKind::New,
        started_ms: js_sys::Date::now(),
    });
    Some(code)
}

async fn load_world_geometry() -> Result<WorldGeometry, String> {
    let land = fetch_topology(LAND_URL).await?;
    let countries = fetch_topology(COUNTRIES_URL).await?;
    WorldGeometry::from_topologies(&land, LAND_OBJECT, &countries, COUNTRIES_OBJECT)
        .map_err(|err| err.to_string())
}

async fn fetch_topology(url: &str) -> Result<Topology, String> {
    let response = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|err| err.to_string())?;
    if !response.ok() {
        return Err(format!("{url} returned {}", response.status()));
    }
    let raw = response.text().await.map_err(|err| err.to_string())?;
    Topology::from_json(&raw).map_err(|err| err.to_string())
}

/// Admit a raw code into the pin set. Invalid codes are dropped silently;
/// pins are never removed, so the set only grows.
fn merge_pin(pins: &mut HashSet<CountryCode>, raw: &str) -> bool {
    CountryCode::parse(raw).is_some_and(|code| pins.insert(code))
}

fn load_pin_cache() -> HashSet<CountryCode> {
    let cached: Vec<String> = gloo_storage::LocalStorage::get(PIN_CACHE_KEY).unwrap_or_default();
    cached
        .iter()
        .filter_map(|raw| CountryCode::parse(raw))
        .collect()
}

fn store_pin_cache(pins: &HashSet<CountryCode>) {
    let mut codes: Vec<String> = pins.iter().map(|code| code.to_string()).collect();
    codes.sort();
    let _ = gloo_storage::LocalStorage::set(PIN_CACHE_KEY, &codes);
}

#[cfg(test)]
mod tests {
    use super::merge_pin;
    use std::collections::HashSet;

    #[test]
    fn pin_set_grows_monotonically_and_dedupes() {
        let mut pins = HashSet::new();
        assert!(merge_pin(&mut pins, "US"));
        assert!(merge_pin(&mut pins, "DE"));
        assert_eq!(pins.len(), 2);
        // Re-pinning is a no-op, never a removal.
        assert!(!merge_pin(&mut pins, "US"));
        assert_eq!(pins.len(), 2);
    }

    #[test]
    fn invalid_codes_never_enter_the_pin_set() {
        let mut pins = HashSet::new();
        for raw in ["us", "USA", "U", "", "1A"] {
            assert!(!merge_pin(&mut pins, raw));
        }
        assert!(pins.is_empty());
    }
}
