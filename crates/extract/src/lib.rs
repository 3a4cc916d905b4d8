mod assemble;
mod block_reader;
mod store;
mod tag_stats;

pub use assemble::GeomBatch;
pub use store::PrimitiveStore;

use anyhow::Result;
use geojson::{Feature, Geometry, JsonObject, Value};
use types::TagCounts;

/// Tallies every (key, value) tag pair in the file into per-kind occurrence
/// counts, one streaming pass, independent of geometry assembly.
pub fn count_tags(path: &str) -> Result<TagCounts> {
    tag_stats::count_blocks(path)
}

/// Decodes the file into a primitive store and returns a handle that can
/// resolve geometries for the given tag on demand.
pub fn extract_tag(path: &str, key: &str, value: &str) -> Result<TagExtract> {
    Ok(TagExtract {
        store: PrimitiveStore::from_path(path)?,
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

pub struct TagExtract {
    store: PrimitiveStore,
    key: String,
    value: String,
}

impl TagExtract {
    /// Runs geometry resolution over the decoded store. Coordinates come out
    /// in the coordinate system of the source file; nothing is reprojected.
    pub fn geoms(&self) -> GeomBatch {
        assemble::assemble(&self.store, &self.key, &self.value)
    }

    pub fn store(&self) -> &PrimitiveStore {
        &self.store
    }
}

/// Converts a batch into GeoJSON features, tags carried as string properties.
pub fn to_features(batch: &GeomBatch) -> Vec<Feature> {
    batch
        .geoms
        .iter()
        .map(|geom_tags| {
            let geometry = Geometry::new(Value::from(&geom_tags.geom));
            let properties: JsonObject = geom_tags
                .tags
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
                .collect();

            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry as Geo, Point};
    use types::{GeomTags, Node, TagMap};

    #[test]
    fn features_carry_geometry_and_tags() {
        let mut store = PrimitiveStore::new();
        let mut tags = TagMap::new();
        tags.insert("natural".to_string(), "tree".to_string());
        store.push_node(Node {
            id: 1,
            lon: -158.0,
            lat: 21.3,
            tags,
        });
        let query = TagExtract {
            store,
            key: "natural".to_string(),
            value: "tree".to_string(),
        };

        let batch = query.geoms();
        assert_eq!(
            batch.geoms[0].geom,
            Geo::Point(Point::new(-158.0, 21.3))
        );

        let features = to_features(&batch);
        assert_eq!(features.len(), 1);
        let properties = features[0].properties.as_ref().unwrap();
        assert_eq!(
            properties.get("natural"),
            Some(&serde_json::Value::String("tree".to_string()))
        );
        assert!(features[0].geometry.is_some());
    }

    #[test]
    fn to_features_handles_every_geometry_shape() {
        use geo::{coord, LineString, MultiLineString, MultiPolygon, Polygon};

        let shapes: Vec<Geo<f64>> = vec![
            Geo::Point(Point::new(0.0, 0.0)),
            Geo::LineString(LineString::new(vec![
                coord! { x: 0.0, y: 0.0 },
                coord! { x: 1.0, y: 1.0 },
            ])),
            Geo::Polygon(Polygon::new(
                LineString::new(vec![
                    coord! { x: 0.0, y: 0.0 },
                    coord! { x: 1.0, y: 0.0 },
                    coord! { x: 1.0, y: 1.0 },
                    coord! { x: 0.0, y: 0.0 },
                ]),
                vec![],
            )),
            Geo::MultiLineString(MultiLineString::new(vec![LineString::new(vec![
                coord! { x: 0.0, y: 0.0 },
                coord! { x: 1.0, y: 1.0 },
            ])])),
            Geo::MultiPolygon(MultiPolygon::new(vec![])),
        ];
        let batch = GeomBatch {
            geoms: shapes
                .into_iter()
                .map(|geom| GeomTags {
                    geom,
                    tags: TagMap::new(),
                })
                .collect(),
            skipped: 0,
        };
        assert_eq!(to_features(&batch).len(), 5);
    }
}
