pub mod blip;
pub mod centroid;
pub mod codes;
pub mod geometry;
pub mod projection;
pub mod topology;

pub use blip::{Blip, BlipFrame, BlipKind, BlipSchedule};
pub use centroid::CentroidIndex;
pub use codes::{CountryCode, alpha2_for_numeric};
pub use geometry::{
    BorderMesh, CountryFeature, CountryPolygon, CountrySet, GeoBounds, LonLat, PolygonSet,
    WorldGeometry,
};
pub use projection::Equirectangular;
pub use topology::{Topology, TopologyError};
