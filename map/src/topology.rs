//! Compact topology (TopoJSON) decoding.
//!
//! The wire format stores every arc once, shared between the polygons on
//! either side, with optional delta-encoded quantized coordinates. Decoding
//! runs in stages, each with its own checked type: the raw [`Topology`]
//! document, the decoded arc table, and the renderable stages in
//! [`crate::geometry`] built by the conversion functions below.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use thiserror::Error;

use crate::codes;
use crate::geometry::{
    BorderMesh, CountryFeature, CountryPolygon, CountrySet, LonLat, PolygonSet,
};

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to parse topology document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("topology has no object named {0:?}")]
    MissingObject(String),
    #[error("arc index {index} out of range ({count} arcs)")]
    ArcOutOfRange { index: i64, count: usize },
}

/// Quantization transform: stored coordinates are cumulative integer deltas
/// mapped back through `scale`/`translate`.
#[derive(Debug, Clone, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// A geometry object referencing rings into the shared arc table.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        #[serde(default)]
        id: Option<serde_json::Value>,
        arcs: Vec<Vec<i64>>,
    },
    MultiPolygon {
        #[serde(default)]
        id: Option<serde_json::Value>,
        arcs: Vec<Vec<Vec<i64>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// A raw topology document. Immutable for the session once parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub objects: HashMap<String, TopoGeometry>,
    pub arcs: Vec<Vec<Vec<f64>>>,
}

impl Topology {
    pub fn from_json(raw: &str) -> Result<Self, TopologyError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn object(&self, name: &str) -> Result<&TopoGeometry, TopologyError> {
        self.objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))
    }

    /// Decode the shared arc table into geographic polylines.
    pub fn decode_arcs(&self) -> Vec<Vec<LonLat>> {
        self.arcs.iter().map(|arc| self.decode_arc(arc)).collect()
    }

    fn decode_arc(&self, arc: &[Vec<f64>]) -> Vec<LonLat> {
        match &self.transform {
            Some(transform) => {
                let mut x = 0.0;
                let mut y = 0.0;
                arc.iter()
                    .filter_map(|point| {
                        let (dx, dy) = (*point.first()?, *point.get(1)?);
                        x += dx;
                        y += dy;
                        Some((
                            x * transform.scale[0] + transform.translate[0],
                            y * transform.scale[1] + transform.translate[1],
                        ))
                    })
                    .collect()
            }
            None => arc
                .iter()
                .filter_map(|point| Some((*point.first()?, *point.get(1)?)))
                .collect(),
        }
    }
}

/// One feature's worth of arc-indexed rings, before stitching.
struct RawFeature<'a> {
    id: Option<&'a serde_json::Value>,
    polygons: Vec<&'a [Vec<i64>]>,
}

fn collect_features<'a>(geometry: &'a TopoGeometry, out: &mut Vec<RawFeature<'a>>) {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for nested in geometries {
                collect_features(nested, out);
            }
        }
        TopoGeometry::Polygon { id, arcs } => out.push(RawFeature {
            id: id.as_ref(),
            polygons: vec![arcs.as_slice()],
        }),
        TopoGeometry::MultiPolygon { id, arcs } => out.push(RawFeature {
            id: id.as_ref(),
            polygons: arcs.iter().map(Vec::as_slice).collect(),
        }),
        TopoGeometry::Unsupported => {}
    }
}

/// Resolve an arc reference: negative `~i` means arc `i`, reversed.
fn resolve_arc_index(raw: i64, count: usize) -> Result<(usize, bool), TopologyError> {
    let reversed = raw < 0;
    let index = if reversed { !raw } else { raw };
    usize::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .map(|i| (i, reversed))
        .ok_or(TopologyError::ArcOutOfRange { index: raw, count })
}

/// Concatenate a ring's arcs into one closed ring. Adjacent arcs share their
/// join point, which is emitted once.
fn stitch_ring(ring: &[i64], arcs: &[Vec<LonLat>]) -> Result<Vec<LonLat>, TopologyError> {
    let mut out: Vec<LonLat> = Vec::new();
    for &raw in ring {
        let (index, reversed) = resolve_arc_index(raw, arcs.len())?;
        let arc = &arcs[index];
        let skip = usize::from(!out.is_empty());
        if reversed {
            out.extend(arc.iter().rev().skip(skip).copied());
        } else {
            out.extend(arc.iter().skip(skip).copied());
        }
    }
    if let (Some(&first), Some(&last)) = (out.first(), out.last())
        && first != last
    {
        out.push(first);
    }
    Ok(out)
}

/// All rings of the named object as one strokeable land geometry.
pub fn land_polygons(topology: &Topology, object: &str) -> Result<PolygonSet, TopologyError> {
    let geometry = topology.object(object)?;
    let arcs = topology.decode_arcs();
    let mut features = Vec::new();
    collect_features(geometry, &mut features);

    let mut rings = Vec::new();
    for feature in features {
        for polygon in feature.polygons {
            for ring in polygon {
                let stitched = stitch_ring(ring, &arcs)?;
                if stitched.len() >= 4 {
                    rings.push(stitched);
                }
            }
        }
    }
    Ok(PolygonSet { rings })
}

/// Every arc referenced by the named object, decoded exactly once. Shared
/// edges between adjacent countries and outer boundary edges alike come out
/// as single polylines.
pub fn border_mesh(topology: &Topology, object: &str) -> Result<BorderMesh, TopologyError> {
    let geometry = topology.object(object)?;
    let arcs = topology.decode_arcs();
    let mut features = Vec::new();
    collect_features(geometry, &mut features);

    let mut referenced = BTreeSet::new();
    for feature in &features {
        for polygon in &feature.polygons {
            for ring in polygon.iter() {
                for &raw in ring {
                    let (index, _) = resolve_arc_index(raw, arcs.len())?;
                    referenced.insert(index);
                }
            }
        }
    }
    let lines = referenced
        .into_iter()
        .map(|index| arcs[index].clone())
        .filter(|line| line.len() >= 2)
        .collect();
    Ok(BorderMesh { lines })
}

/// Per-country polygon features keyed by numeric id. Features whose id is
/// missing or not a valid numeric code are dropped, not errors — they can
/// never be selected or pinned anyway.
pub fn country_features(topology: &Topology, object: &str) -> Result<CountrySet, TopologyError> {
    let geometry = topology.object(object)?;
    let arcs = topology.decode_arcs();
    let mut raw_features = Vec::new();
    collect_features(geometry, &mut raw_features);

    let mut features = Vec::new();
    for raw in raw_features {
        let Some(numeric_id) = raw.id.and_then(numeric_id_of) else {
            continue;
        };
        let mut polygons = Vec::new();
        for rings in raw.polygons {
            let mut stitched = rings
                .iter()
                .map(|ring| stitch_ring(ring, &arcs))
                .collect::<Result<Vec<_>, _>>()?;
            if stitched.is_empty() {
                continue;
            }
            let exterior = stitched.remove(0);
            if exterior.len() < 4 {
                continue;
            }
            polygons.push(CountryPolygon {
                exterior,
                holes: stitched.into_iter().filter(|hole| hole.len() >= 4).collect(),
            });
        }
        if polygons.is_empty() {
            continue;
        }
        features.push(CountryFeature {
            numeric_id,
            polygons,
        });
    }
    Ok(CountrySet { features })
}

fn numeric_id_of(id: &serde_json::Value) -> Option<u16> {
    match id {
        serde_json::Value::Number(number) => {
            number.as_u64().and_then(|value| u16::try_from(value).ok())
        }
        serde_json::Value::String(raw) => codes::parse_numeric_id(raw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WorldGeometry;
    use crate::projection::Equirectangular;

    /// Two unit-quantized squares sharing their vertical middle edge:
    /// arc 0 walks around the left square except the shared edge, arc 1 is
    /// the shared edge, arc 2 walks around the right square.
    const TWO_COUNTRIES: &str = r#"{
        "type": "Topology",
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": 840, "arcs": [[0, 1]] },
                    { "type": "Polygon", "id": "124", "arcs": [[2, -2]] }
                ]
            }
        },
        "arcs": [
            [[5, 0], [0, 0], [0, 10], [5, 10]],
            [[5, 10], [5, 0]],
            [[5, 10], [10, 10], [10, 0], [5, 0]]
        ]
    }"#;

    #[test]
    fn decode_arcs_applies_quantization_transform() {
        let topology = Topology::from_json(
            r#"{
                "type": "Topology",
                "transform": { "scale": [0.5, 0.5], "translate": [-180, -90] },
                "objects": {},
                "arcs": [[[0, 0], [2, 0], [0, 2], [-2, 0]]]
            }"#,
        )
        .unwrap();
        let arcs = topology.decode_arcs();
        assert_eq!(
            arcs,
            vec![vec![
                (-180.0, -90.0),
                (-179.0, -90.0),
                (-179.0, -89.0),
                (-180.0, -89.0),
            ]]
        );
    }

    #[test]
    fn decode_arcs_without_transform_passes_through() {
        let topology = Topology::from_json(
            r#"{ "type": "Topology", "objects": {}, "arcs": [[[1.5, 2.5], [3.0, 4.0]]] }"#,
        )
        .unwrap();
        assert_eq!(topology.decode_arcs(), vec![vec![(1.5, 2.5), (3.0, 4.0)]]);
    }

    #[test]
    fn stitch_joins_arcs_without_duplicate_points_and_closes() {
        let arcs = vec![
            vec![(0.0, 0.0), (10.0, 0.0)],
            vec![(10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            vec![(0.0, 10.0), (0.0, 0.0)],
        ];
        let ring = stitch_ring(&[0, 1, 2], &arcs).unwrap();
        assert_eq!(
            ring,
            vec![
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
            ]
        );
    }

    #[test]
    fn stitch_reverses_complemented_arc_references() {
        let arcs = vec![vec![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]];
        let ring = stitch_ring(&[-1], &arcs).unwrap();
        assert_eq!(
            ring,
            vec![(5.0, 5.0), (5.0, 0.0), (0.0, 0.0), (5.0, 5.0)]
        );
    }

    #[test]
    fn stitch_rejects_out_of_range_arc() {
        let arcs = vec![vec![(0.0, 0.0), (1.0, 0.0)]];
        let err = stitch_ring(&[3], &arcs).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::ArcOutOfRange { index: 3, count: 1 }
        ));
    }

    #[test]
    fn country_features_accepts_numeric_and_string_ids() {
        let topology = Topology::from_json(TWO_COUNTRIES).unwrap();
        let countries = country_features(&topology, "countries").unwrap();
        let mut ids: Vec<u16> = countries.features.iter().map(|f| f.numeric_id).collect();
        ids.sort();
        assert_eq!(ids, vec![124, 840]);

        assert_eq!(countries.hit_test(2.0, 5.0), Some(840));
        assert_eq!(countries.hit_test(7.0, 5.0), Some(124));
        assert_eq!(countries.hit_test(20.0, 5.0), None);
    }

    #[test]
    fn country_features_drops_unparseable_ids() {
        let topology = Topology::from_json(
            r#"{
                "type": "Topology",
                "objects": {
                    "countries": {
                        "type": "GeometryCollection",
                        "geometries": [
                            { "type": "Polygon", "id": "-99", "arcs": [[0]] },
                            { "type": "Polygon", "arcs": [[0]] }
                        ]
                    }
                },
                "arcs": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]
            }"#,
        )
        .unwrap();
        let countries = country_features(&topology, "countries").unwrap();
        assert!(countries.is_empty());
    }

    #[test]
    fn border_mesh_emits_each_arc_once() {
        let topology = Topology::from_json(TWO_COUNTRIES).unwrap();
        let mesh = border_mesh(&topology, "countries").unwrap();
        // Two squares share one edge: three distinct polylines, with the
        // shared edge present exactly once.
        assert_eq!(mesh.lines.len(), 3);
        let shared: Vec<_> = mesh
            .lines
            .iter()
            .filter(|line| line.as_slice() == [(5.0, 10.0), (5.0, 0.0)])
            .collect();
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn missing_object_is_an_error() {
        let topology = Topology::from_json(TWO_COUNTRIES).unwrap();
        let err = land_polygons(&topology, "land").unwrap_err();
        assert!(matches!(err, TopologyError::MissingObject(name) if name == "land"));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        assert!(matches!(
            Topology::from_json("{ not json"),
            Err(TopologyError::Parse(_))
        ));
        // Valid JSON, wrong shape.
        assert!(matches!(
            Topology::from_json(r#"{ "objects": {} }"#),
            Err(TopologyError::Parse(_))
        ));
    }

    #[test]
    fn unsupported_geometry_types_are_ignored() {
        let topology = Topology::from_json(
            r#"{
                "type": "Topology",
                "objects": {
                    "countries": {
                        "type": "GeometryCollection",
                        "geometries": [
                            { "type": "Point", "coordinates": [0, 0] },
                            { "type": "Polygon", "id": 840, "arcs": [[0]] }
                        ]
                    }
                },
                "arcs": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]
            }"#,
        )
        .unwrap();
        let countries = country_features(&topology, "countries").unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries.features[0].numeric_id, 840);
    }

    /// A two-country world: one box on the equator, one deep in the south.
    /// The southern country's entire border projects below the −60° gate
    /// line while the equatorial one stays above it.
    #[test]
    fn south_gate_clips_polar_country_but_not_equatorial_one() {
        let land = Topology::from_json(
            r#"{
                "type": "Topology",
                "objects": {
                    "land": {
                        "type": "MultiPolygon",
                        "arcs": [[[0]], [[1]]]
                    }
                },
                "arcs": [
                    [[-20, -5], [20, -5], [20, 5], [-20, 5], [-20, -5]],
                    [[-20, -75], [20, -75], [20, -65], [-20, -65], [-20, -75]]
                ]
            }"#,
        )
        .unwrap();
        let countries = Topology::from_json(
            r#"{
                "type": "Topology",
                "objects": {
                    "countries": {
                        "type": "GeometryCollection",
                        "geometries": [
                            { "type": "Polygon", "id": 840, "arcs": [[0]] },
                            { "type": "Polygon", "id": 36, "arcs": [[1]] }
                        ]
                    }
                },
                "arcs": [
                    [[-20, -5], [20, -5], [20, 5], [-20, 5], [-20, -5]],
                    [[-20, -75], [20, -75], [20, -65], [-20, -65], [-20, -75]]
                ]
            }"#,
        )
        .unwrap();

        let world =
            WorldGeometry::from_topologies(&land, "land", &countries, "countries").unwrap();
        let projection =
            Equirectangular::fit_extent(world.land.bounds(), 800.0, 600.0).unwrap();
        let (_, gate_y) = projection.project(0.0, -60.0);

        for feature in &world.countries.features {
            for polygon in &feature.polygons {
                for &(lon, lat) in &polygon.exterior {
                    let (_, y) = projection.project(lon, lat);
                    if feature.numeric_id == 36 {
                        assert!(y > gate_y, "southern border point above the gate");
                    } else {
                        assert!(y < gate_y, "equatorial border point below the gate");
                    }
                }
            }
        }
    }
}
