//! Renderable geometry stages derived from a decoded topology.
//!
//! Each stage is an explicit type: `PolygonSet` (strokeable land rings),
//! `BorderMesh` (every border edge exactly once) and `CountrySet`
//! (hit-testable per-country polygons). A `WorldGeometry` bundles the three
//! and is built once per session; viewport changes only rebuild the
//! projection-dependent data, never these.

use crate::topology::{self, Topology, TopologyError};

/// A geographic coordinate in degrees, `(longitude, latitude)`.
pub type LonLat = (f64, f64);

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn empty() -> Self {
        Self {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    pub fn extend(&mut self, (lon, lat): LonLat) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    /// True when the box spans a non-degenerate area with finite corners.
    pub fn is_usable(&self) -> bool {
        self.min_lon.is_finite()
            && self.min_lat.is_finite()
            && self.max_lon.is_finite()
            && self.max_lat.is_finite()
            && self.max_lon > self.min_lon
            && self.max_lat > self.min_lat
    }

    pub fn mid(&self) -> LonLat {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

/// The combined landmass geometry: every ring strokeable as-is.
#[derive(Debug, Clone, Default)]
pub struct PolygonSet {
    pub rings: Vec<Vec<LonLat>>,
}

impl PolygonSet {
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn bounds(&self) -> GeoBounds {
        let mut bounds = GeoBounds::empty();
        for ring in &self.rings {
            for &point in ring {
                bounds.extend(point);
            }
        }
        bounds
    }
}

/// Country border lines. Edges shared by two countries appear once, as do
/// outer boundary edges — stroking the mesh never double-draws a border.
#[derive(Debug, Clone, Default)]
pub struct BorderMesh {
    pub lines: Vec<Vec<LonLat>>,
}

impl BorderMesh {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One polygon of a country: an exterior ring plus interior holes.
#[derive(Debug, Clone)]
pub struct CountryPolygon {
    pub exterior: Vec<LonLat>,
    pub holes: Vec<Vec<LonLat>>,
}

impl CountryPolygon {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        point_in_ring(lon, lat, &self.exterior)
            && !self.holes.iter().any(|hole| point_in_ring(lon, lat, hole))
    }

    /// Planar shoelace area in degrees², holes subtracted.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|hole| ring_area(hole).abs()).sum();
        (ring_area(&self.exterior).abs() - holes).max(0.0)
    }
}

/// A country feature keyed by its ISO-3166-1 numeric identifier.
#[derive(Debug, Clone)]
pub struct CountryFeature {
    pub numeric_id: u16,
    pub polygons: Vec<CountryPolygon>,
}

impl CountryFeature {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygons.iter().any(|polygon| polygon.contains(lon, lat))
    }

    pub fn area(&self) -> f64 {
        self.polygons.iter().map(CountryPolygon::area).sum()
    }
}

/// All country features of the topology.
#[derive(Debug, Clone, Default)]
pub struct CountrySet {
    pub features: Vec<CountryFeature>,
}

impl CountrySet {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Resolve the country containing a geographic point.
    ///
    /// Linear scan over all features; when more than one contains the point
    /// (enclave nested inside a host country), the smallest-area feature
    /// wins, so the enclave is always clickable.
    pub fn hit_test(&self, lon: f64, lat: f64) -> Option<u16> {
        self.features
            .iter()
            .filter(|feature| feature.contains(lon, lat))
            .min_by(|a, b| a.area().total_cmp(&b.area()))
            .map(|feature| feature.numeric_id)
    }
}

/// The full renderable world, built once from the two topology documents.
#[derive(Debug, Clone)]
pub struct WorldGeometry {
    pub land: PolygonSet,
    pub borders: BorderMesh,
    pub countries: CountrySet,
}

impl WorldGeometry {
    pub fn from_topologies(
        land: &Topology,
        land_object: &str,
        countries: &Topology,
        countries_object: &str,
    ) -> Result<Self, TopologyError> {
        Ok(Self {
            land: topology::land_polygons(land, land_object)?,
            borders: topology::border_mesh(countries, countries_object)?,
            countries: topology::country_features(countries, countries_object)?,
        })
    }
}

/// Ray-cast point-in-ring test (crossing number, half-open edges).
pub fn point_in_ring(lon: f64, lat: f64, ring: &[LonLat]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Signed shoelace area of a ring; the closing edge is implicit.
pub fn ring_area(ring: &[LonLat]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        sum += xj * yi - xi * yj;
        j = i;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, half: f64) -> Vec<LonLat> {
        vec![
            (cx - half, cy - half),
            (cx + half, cy - half),
            (cx + half, cy + half),
            (cx - half, cy + half),
            (cx - half, cy - half),
        ]
    }

    #[test]
    fn point_in_ring_inside_and_outside() {
        let ring = square(0.0, 0.0, 10.0);
        assert!(point_in_ring(0.0, 0.0, &ring));
        assert!(point_in_ring(-9.9, 9.9, &ring));
        assert!(!point_in_ring(10.5, 0.0, &ring));
        assert!(!point_in_ring(0.0, -11.0, &ring));
    }

    #[test]
    fn point_in_ring_degenerate_ring_is_outside() {
        assert!(!point_in_ring(0.0, 0.0, &[(0.0, 0.0), (1.0, 1.0)]));
    }

    #[test]
    fn ring_area_of_unit_square() {
        let ring = square(0.0, 0.0, 0.5);
        assert!((ring_area(&ring).abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn polygon_hole_excludes_interior_point() {
        let polygon = CountryPolygon {
            exterior: square(0.0, 0.0, 10.0),
            holes: vec![square(0.0, 0.0, 2.0)],
        };
        assert!(polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(0.0, 0.0));
        assert!(((polygon.area()) - (400.0 - 16.0)).abs() < 1e-9);
    }

    #[test]
    fn hit_test_prefers_smallest_area_enclave() {
        let host = CountryFeature {
            numeric_id: 100,
            polygons: vec![CountryPolygon {
                exterior: square(0.0, 0.0, 10.0),
                holes: Vec::new(),
            }],
        };
        let enclave = CountryFeature {
            numeric_id: 200,
            polygons: vec![CountryPolygon {
                exterior: square(1.0, 1.0, 1.0),
                holes: Vec::new(),
            }],
        };
        let set = CountrySet {
            features: vec![host, enclave],
        };
        assert_eq!(set.hit_test(1.0, 1.0), Some(200));
        assert_eq!(set.hit_test(8.0, 8.0), Some(100));
        assert_eq!(set.hit_test(50.0, 0.0), None);
    }

    #[test]
    fn bounds_of_polygon_set() {
        let set = PolygonSet {
            rings: vec![square(0.0, 0.0, 10.0), square(30.0, -5.0, 2.0)],
        };
        let bounds = set.bounds();
        assert_eq!(bounds.min_lon, -10.0);
        assert_eq!(bounds.max_lon, 32.0);
        assert_eq!(bounds.min_lat, -10.0);
        assert_eq!(bounds.max_lat, 10.0);
        assert!(bounds.is_usable());
        assert_eq!(bounds.mid(), (11.0, 0.0));
    }

    #[test]
    fn empty_bounds_are_unusable() {
        assert!(!PolygonSet::default().bounds().is_usable());
    }
}
