use leptos::prelude::*;

use worldpulse_map::{BlipKind, CountryCode};

use crate::api;
use crate::world::WorldBackground;

/// Off-screen sentinel reported by the hover channel after pointer-leave.
pub(crate) const POINTER_GONE: (f64, f64) = (-1000.0, -1000.0);

/// The most recent hover result: nearest country (if any within range) plus
/// the pointer position in client coordinates, for tooltip placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct HoverState {
    pub country: Option<CountryCode>,
    pub x: f64,
    pub y: f64,
}

impl HoverState {
    pub fn idle() -> Self {
        Self {
            country: None,
            x: POINTER_GONE.0,
            y: POINTER_GONE.1,
        }
    }
}

/// An externally requested pulse: country code (validated by the consumer)
/// and blip kind.
#[derive(Clone, Debug)]
pub(crate) struct BlipRequest {
    pub country: String,
    pub kind: BlipKind,
}

/// Newtype wrappers so every channel is a distinct Leptos context type.
/// Producers push onto the request queues; the map component drains them in
/// arrival order.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<HoverState>);
#[derive(Clone, Copy)]
pub(crate) struct SelectedCountry(pub RwSignal<Option<CountryCode>>);
#[derive(Clone, Copy)]
pub(crate) struct PinRequests(pub RwSignal<Vec<String>>);
#[derive(Clone, Copy)]
pub(crate) struct BlipRequests(pub RwSignal<Vec<BlipRequest>>);

#[component]
pub fn App() -> impl IntoView {
    let hovered: RwSignal<HoverState> = RwSignal::new(HoverState::idle());
    let selected: RwSignal<Option<CountryCode>> = RwSignal::new(None);
    let pin_requests: RwSignal<Vec<String>> = RwSignal::new(Vec::new());
    let blip_requests: RwSignal<Vec<BlipRequest>> = RwSignal::new(Vec::new());
    let click_total: RwSignal<Option<u64>> = RwSignal::new(None);
    let click_pending: RwSignal<bool> = RwSignal::new(false);

    provide_context(Hovered(hovered));
    provide_context(SelectedCountry(selected));
    provide_context(PinRequests(pin_requests));
    provide_context(BlipRequests(blip_requests));

    // A map selection records a click for that country; the confirmed
    // response flows back in as pin + blip requests.
    Effect::new(move || {
        let Some(code) = selected.get() else {
            return;
        };
        submit_click(
            Some(code),
            pin_requests,
            blip_requests,
            click_total,
            click_pending,
        );
    });

    let on_press = move |_| {
        submit_click(
            None,
            pin_requests,
            blip_requests,
            click_total,
            click_pending,
        );
    };

    let tooltip_style = move || {
        let hover = hovered.get();
        match hover.country {
            Some(_) => format!(
                "position: fixed; left: {:.0}px; top: {:.0}px; padding: 4px 8px; \
                 background: rgba(10,16,38,0.92); border: 1px solid rgba(103,232,249,0.4); \
                 border-radius: 4px; color: #a5f3fc; font-size: 12px; pointer-events: none; \
                 z-index: 10;",
                hover.x + 14.0,
                hover.y + 12.0
            ),
            None => "display: none;".to_string(),
        }
    };

    view! {
        <div style="position: fixed; inset: 0; overflow: hidden; background: #000; color: #e2e8f0; font-family: system-ui, sans-serif;">
            <WorldBackground/>
            <div style="position: relative; z-index: 1; display: flex; flex-direction: column; align-items: center; gap: 14px; padding-top: 7vh; pointer-events: none;">
                <h1 style="margin: 0; font-size: 26px; font-weight: 600; letter-spacing: 0.35em; text-transform: uppercase; color: #a5f3fc;">
                    "worldpulse"
                </h1>
                <button
                    style="pointer-events: auto; padding: 10px 26px; font-size: 15px; letter-spacing: 0.1em; color: #0b1026; background: linear-gradient(90deg, #a78bfa, #22d3ee); border: none; border-radius: 999px; cursor: pointer;"
                    on:click=on_press
                >
                    "press the world"
                </button>
                {move || {
                    click_total.get().map(|total| {
                        view! {
                            <p style="margin: 0; font-size: 13px; color: #94a3b8;">
                                {format!("{total} clicks worldwide")}
                            </p>
                        }
                    })
                }}
            </div>
            <div style=tooltip_style>
                {move || {
                    hovered
                        .get()
                        .country
                        .map(|code| code.to_string())
                        .unwrap_or_default()
                }}
            </div>
        </div>
    }
}

/// Fire one click at the backend. At most one request is in flight; the
/// confirmed outcome feeds the pin and blip channels.
fn submit_click(
    country: Option<CountryCode>,
    pin_requests: RwSignal<Vec<String>>,
    blip_requests: RwSignal<Vec<BlipRequest>>,
    click_total: RwSignal<Option<u64>>,
    click_pending: RwSignal<bool>,
) {
    if click_pending.get_untracked() {
        return;
    }
    click_pending.set(true);
    wasm_bindgen_futures::spawn_local(async move {
        let owned = country.map(|code| code.to_string());
        match api::record_click(owned.as_deref()).await {
            Ok(outcome) => {
                click_total.set(Some(outcome.total));
                let kind = outcome.blip_kind();
                pin_requests.update(|queue| queue.push(outcome.country.clone()));
                blip_requests.update(|queue| {
                    queue.push(BlipRequest {
                        country: outcome.country,
                        kind,
                    });
                });
            }
            Err(err) => {
                web_sys::console::warn_1(&format!("click not recorded: {err}").into());
            }
        }
        click_pending.set(false);
    });
}
