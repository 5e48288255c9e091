//! Thin client for the click-recording endpoint.
//!
//! The backend geolocates the caller, bumps the per-country counter and says
//! whether this was a first or repeat click. Failures degrade to a console
//! warning — the map itself never depends on the endpoint.

use serde::Deserialize;

use worldpulse_map::BlipKind;

const CLICK_ENDPOINT: &str = "/api/click";

/// Server verdict for one recorded click.
#[derive(Debug, Clone, Deserialize)]
pub struct ClickOutcome {
    pub country: String,
    pub kind: String,
    #[serde(default)]
    pub total: u64,
}

impl ClickOutcome {
    /// Anything the server doesn't explicitly call a repeat renders as a
    /// first-time pulse.
    pub fn blip_kind(&self) -> BlipKind {
        if self.kind == "repeat" {
            BlipKind::Repeat
        } else {
            BlipKind::New
        }
    }
}

/// Record a click. `country` is the alpha-2 code of a map selection; `None`
/// lets the server geolocate the caller's IP.
pub async fn record_click(country: Option<&str>) -> Result<ClickOutcome, String> {
    let body = match country {
        Some(code) => serde_json::json!({ "country": code }),
        None => serde_json::json!({}),
    };
    let response = gloo_net::http::Request::post(CLICK_ENDPOINT)
        .header("content-type", "application/json")
        .body(body.to_string())
        .map_err(|err| err.to_string())?
        .send()
        .await
        .map_err(|err| err.to_string())?;
    if !response.ok() {
        return Err(format!("click endpoint returned {}", response.status()));
    }
    response
        .json::<ClickOutcome>()
        .await
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parses_with_total() {
        let outcome: ClickOutcome =
            serde_json::from_str(r#"{ "country": "US", "kind": "new", "total": 41 }"#).unwrap();
        assert_eq!(outcome.country, "US");
        assert_eq!(outcome.total, 41);
        assert_eq!(outcome.blip_kind(), BlipKind::New);
    }

    #[test]
    fn outcome_total_defaults_to_zero() {
        let outcome: ClickOutcome =
            serde_json::from_str(r#"{ "country": "DE", "kind": "repeat" }"#).unwrap();
        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.blip_kind(), BlipKind::Repeat);
    }

    #[test]
    fn unknown_kind_falls_back_to_new() {
        let outcome: ClickOutcome =
            serde_json::from_str(r#"{ "country": "FR", "kind": "??" }"#).unwrap();
        assert_eq!(outcome.blip_kind(), BlipKind::New);
    }
}
