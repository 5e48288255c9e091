//! Transient click-pulse effects.
//!
//! A blip is a timestamped record; radius and opacity are derived from
//! elapsed time each frame, so a backgrounded tab simply resumes wherever
//! the clock landed. The schedule retires a blip the moment its lifetime is
//! over — it is never drawn at zero opacity and never revived.

/// Visual kind of a blip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlipKind {
    /// First-time click: a filled, glow-blurred circle growing 4→22px over
    /// 760ms while fading out completely.
    New,
    /// Repeat click: a stroked ring growing 8→20px over 420ms, fading from
    /// 85% opacity to zero.
    Repeat,
}

impl BlipKind {
    pub const fn duration_ms(self) -> f64 {
        match self {
            BlipKind::New => 760.0,
            BlipKind::Repeat => 420.0,
        }
    }

    const fn radius_range(self) -> (f64, f64) {
        match self {
            BlipKind::New => (4.0, 22.0),
            BlipKind::Repeat => (8.0, 20.0),
        }
    }

    const fn start_opacity(self) -> f64 {
        match self {
            BlipKind::New => 1.0,
            BlipKind::Repeat => 0.85,
        }
    }

    /// Radius at normalized progress `t ∈ [0, 1]`.
    pub fn radius_at(self, t: f64) -> f64 {
        let (from, to) = self.radius_range();
        from + (to - from) * t
    }

    /// Opacity at normalized progress `t ∈ [0, 1]`.
    pub fn opacity_at(self, t: f64) -> f64 {
        self.start_opacity() * (1.0 - t)
    }
}

/// A live blip: screen position, kind and start timestamp (ms).
#[derive(Debug, Clone, Copy)]
pub struct Blip {
    pub x: f64,
    pub y: f64,
    pub kind: BlipKind,
    pub started_ms: f64,
}

/// Per-frame draw parameters for one live blip.
#[derive(Debug, Clone, Copy)]
pub struct BlipFrame {
    pub x: f64,
    pub y: f64,
    pub kind: BlipKind,
    pub radius: f64,
    pub opacity: f64,
}

/// The live-effect list. Owned exclusively by the renderer; blips enter via
/// `spawn` and leave only by expiring.
#[derive(Debug, Default)]
pub struct BlipSchedule {
    live: Vec<Blip>,
}

impl BlipSchedule {
    pub fn spawn(&mut self, blip: Blip) {
        self.live.push(blip);
    }

    /// Retire every blip whose lifetime has elapsed, then yield draw
    /// parameters for the survivors.
    pub fn frames(&mut self, now_ms: f64) -> Vec<BlipFrame> {
        self.live
            .retain(|blip| now_ms - blip.started_ms < blip.kind.duration_ms());
        self.live
            .iter()
            .map(|blip| {
                let t = ((now_ms - blip.started_ms) / blip.kind.duration_ms()).clamp(0.0, 1.0);
                BlipFrame {
                    x: blip.x,
                    y: blip.y,
                    kind: blip.kind,
                    radius: blip.kind.radius_at(t),
                    opacity: blip.kind.opacity_at(t),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
