//! Screen-space country centroids for hover and pin placement.
//!
//! Valid only for the projection it was built with; the renderer rebuilds
//! the index together with every projection change so the two can never
//! disagree.

use std::collections::HashMap;

use crate::codes::{CountryCode, alpha2_for_numeric};
use crate::geometry::{CountryFeature, CountrySet, LonLat};
use crate::projection::Equirectangular;

#[derive(Debug, Default)]
pub struct CentroidIndex {
    map: HashMap<CountryCode, (f64, f64)>,
}

impl CentroidIndex {
    /// Compute every country's visual centroid under the given projection.
    /// Countries without an alpha-2 mapping, and countries whose centroid
    /// comes out non-finite, are left out of the index.
    pub fn build(countries: &CountrySet, projection: &Equirectangular) -> Self {
        let mut map = HashMap::with_capacity(countries.len());
        for feature in &countries.features {
            let Some(code) = alpha2_for_numeric(feature.numeric_id) else {
                continue;
            };
            let Some((x, y)) = projected_centroid(feature, projection) else {
                continue;
            };
            map.insert(code, (x, y));
        }
        Self { map }
    }

    pub fn get(&self, code: CountryCode) -> Option<(f64, f64)> {
        self.map.get(&code).copied()
    }

    /// Nearest indexed centroid within `radius` logical pixels of the given
    /// point, by squared Euclidean distance. Linear scan — the country count
    /// is small and fixed.
    pub fn nearest_within(&self, x: f64, y: f64, radius: f64) -> Option<(CountryCode, (f64, f64))> {
        let limit = radius * radius;
        self.map
            .iter()
            .map(|(&code, &(cx, cy))| {
                let (dx, dy) = (cx - x, cy - y);
                (code, (cx, cy), dx * dx + dy * dy)
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .filter(|&(_, _, d2)| d2 <= limit)
            .map(|(code, at, _)| (code, at))
    }

    pub fn codes(&self) -> impl Iterator<Item = CountryCode> + '_ {
        self.map.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Area-weighted centroid of a country's projected rings. Holes carry
/// negative weight; near-zero total area falls back to the vertex mean.
fn projected_centroid(
    feature: &CountryFeature,
    projection: &Equirectangular,
) -> Option<(f64, f64)> {
    let mut weight_sum = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut vertex_sum = (0.0, 0.0);
    let mut vertex_count = 0usize;

    for polygon in &feature.polygons {
        for (ring, is_hole) in std::iter::once((&polygon.exterior, false))
            .chain(polygon.holes.iter().map(|hole| (hole, true)))
        {
            let projected: Vec<(f64, f64)> = ring
                .iter()
                .map(|&(lon, lat): &LonLat| projection.project(lon, lat))
                .collect();
            if let Some((area, (rx, ry))) = ring_centroid(&projected) {
                let weight = if is_hole { -area } else { area };
                weight_sum += weight;
                cx += rx * weight;
                cy += ry * weight;
            }
            for &(px, py) in &projected {
                vertex_sum.0 += px;
                vertex_sum.1 += py;
                vertex_count += 1;
            }
        }
    }

    let centroid = if weight_sum.abs() > 1e-9 {
        (cx / weight_sum, cy / weight_sum)
    } else if vertex_count > 0 {
        (
            vertex_sum.0 / vertex_count as f64,
            vertex_sum.1 / vertex_count as f64,
        )
    } else {
        return None;
    };

    (centroid.0.is_finite() && centroid.1.is_finite()).then_some(centroid)
}

/// Unsigned shoelace area and centroid of one projected ring.
fn ring_centroid(ring: &[(f64, f64)]) -> Option<(f64, (f64, f64))> {
    if ring.len() < 3 {
        return None;
    }
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        let cross = xj * yi - xi * yj;
        twice_area += cross;
        cx += (xi + xj) * cross;
        cy += (yi + yj) * cross;
        j = i;
    }
    if twice_area.abs() < 1e-12 {
        return None;
    }
    let area = twice_area / 2.0;
    Some((area.abs(), (cx / (3.0 * twice_area), cy / (3.0 * twice_area))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CountryPolygon, GeoBounds};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-6,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    fn square(cx: f64, cy: f64, half: f64) -> Vec<LonLat> {
        vec![
            (cx - half, cy - half),
            (cx + half, cy - half),
            (cx + half, cy + half),
            (cx - half, cy + half),
            (cx - half, cy - half),
        ]
    }

    fn feature(id: u16, cx: f64, cy: f64, half: f64) -> CountryFeature {
        CountryFeature {
            numeric_id: id,
            polygons: vec![CountryPolygon {
                exterior: square(cx, cy, half),
                holes: Vec::new(),
            }],
        }
    }

    fn world_projection(width: f64, height: f64) -> Equirectangular {
        let bounds = GeoBounds {
            min_lon: -90.0,
            min_lat: -45.0,
            max_lon: 90.0,
            max_lat: 45.0,
        };
        Equirectangular::fit_extent(bounds, width, height).unwrap()
    }

    #[test]
    fn square_centroid_lands_on_projected_center() {
        let projection = world_projection(1000.0, 800.0);
        let set = CountrySet {
            features: vec![feature(840, 20.0, 10.0, 5.0)],
        };
        let index = CentroidIndex::build(&set, &projection);
        let code = CountryCode::parse("US").unwrap();
        let (x, y) = index.get(code).unwrap();
        let (ex, ey) = projection.project(20.0, 10.0);
        assert_close(x, ex);
        assert_close(y, ey);
    }

    #[test]
    fn unmapped_numeric_id_is_excluded() {
        let projection = world_projection(1000.0, 800.0);
        let set = CountrySet {
            features: vec![feature(840, 0.0, 0.0, 5.0), feature(999, 30.0, 0.0, 5.0)],
        };
        let index = CentroidIndex::build(&set, &projection);
        assert_eq!(index.len(), 1);
        assert!(index.get(CountryCode::parse("US").unwrap()).is_some());
    }

    #[test]
    fn degenerate_feature_is_excluded() {
        let projection = world_projection(1000.0, 800.0);
        let empty = CountryFeature {
            numeric_id: 840,
            polygons: Vec::new(),
        };
        let set = CountrySet {
            features: vec![empty],
        };
        assert!(CentroidIndex::build(&set, &projection).is_empty());
    }

    #[test]
    fn nearest_within_honors_the_radius() {
        let projection = world_projection(1000.0, 800.0);
        let set = CountrySet {
            features: vec![feature(840, 0.0, 0.0, 5.0)],
        };
        let index = CentroidIndex::build(&set, &projection);
        let (cx, cy) = projection.project(0.0, 0.0);

        let hit = index.nearest_within(cx + 3.0, cy + 4.0, 20.0);
        assert_eq!(hit.map(|(code, _)| code), CountryCode::parse("US"));
        // 21px away: nearest, but beyond the threshold.
        assert!(index.nearest_within(cx + 21.0, cy, 20.0).is_none());
    }

    #[test]
    fn rebuild_after_resize_keeps_codes_and_moves_coordinates() {
        let set = CountrySet {
            features: vec![feature(840, 20.0, 10.0, 5.0), feature(276, -30.0, 0.0, 5.0)],
        };
        let before = CentroidIndex::build(&set, &world_projection(1000.0, 800.0));
        let after = CentroidIndex::build(&set, &world_projection(500.0, 400.0));

        let mut codes_before: Vec<_> = before.codes().collect();
        let mut codes_after: Vec<_> = after.codes().collect();
        codes_before.sort();
        codes_after.sort();
        assert_eq!(codes_before, codes_after);

        for code in codes_before {
            assert_ne!(before.get(code), after.get(code));
        }
    }

    #[test]
    fn click_at_indexed_centroid_resolves_its_country() {
        let projection = world_projection(1000.0, 800.0);
        let set = CountrySet {
            features: vec![feature(840, 20.0, 10.0, 5.0), feature(276, -30.0, 0.0, 5.0)],
        };
        let index = CentroidIndex::build(&set, &projection);
        let (cx, cy) = index.get(CountryCode::parse("US").unwrap()).unwrap();

        let (lon, lat) = projection.invert(cx, cy);
        assert_eq!(set.hit_test(lon, lat), Some(840));
        assert_eq!(
            set.hit_test(lon, lat).and_then(alpha2_for_numeric),
            CountryCode::parse("US")
        );
    }

    #[test]
    fn hole_shifts_centroid_away() {
        let projection = world_projection(1000.0, 800.0);
        // A square with a hole in its right half: centroid moves left.
        let punched = CountryFeature {
            numeric_id: 840,
            polygons: vec![CountryPolygon {
                exterior: square(0.0, 0.0, 10.0),
                holes: vec![square(5.0, 0.0, 2.0)],
            }],
        };
        let set = CountrySet {
            features: vec![punched],
        };
        let index = CentroidIndex::build(&set, &projection);
        let (x, _) = index.get(CountryCode::parse("US").unwrap()).unwrap();
        let (center_x, _) = projection.project(0.0, 0.0);
        assert!(x < center_x);
    }
}
