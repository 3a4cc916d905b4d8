use geo::{coord, Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon, Within};
use types::{GeomTags, MemberKind, Relation, TagMap, Way};

use crate::store::PrimitiveStore;

/// The result of one extraction pass: resolved geometries in scan order plus
/// the number of matching primitives that could not be resolved.
#[derive(Debug)]
pub struct GeomBatch {
    pub geoms: Vec<GeomTags>,
    pub skipped: usize,
}

/// Resolves every primitive carrying the (key, value) tag into a geometry,
/// scanning nodes, then ways, then relations. A primitive whose references
/// cannot be resolved is skipped and counted, never silently dropped.
pub(crate) fn assemble(store: &PrimitiveStore, key: &str, value: &str) -> GeomBatch {
    let mut geoms = Vec::new();
    let mut skipped = 0usize;

    for node in store.nodes() {
        if tag_match(&node.tags, key, value) {
            geoms.push(GeomTags {
                geom: Geometry::Point(Point::new(node.lon, node.lat)),
                tags: node.tags.clone(),
            });
        }
    }

    for way in store.ways() {
        if !tag_match(&way.tags, key, value) {
            continue;
        }
        match way_geometry(store, way) {
            Some(geom) => geoms.push(GeomTags {
                geom,
                tags: way.tags.clone(),
            }),
            None => skipped += 1,
        }
    }

    for relation in store.relations() {
        if !tag_match(&relation.tags, key, value) {
            continue;
        }
        match relation_geometry(store, relation) {
            Some(geom) => geoms.push(GeomTags {
                geom,
                tags: relation.tags.clone(),
            }),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} primitives with unresolvable references");
    }
    GeomBatch { geoms, skipped }
}

fn tag_match(tags: &TagMap, key: &str, value: &str) -> bool {
    tags.get(key).is_some_and(|v| v == value)
}

/// Closed ways become a single-ring polygon, open ways a line string.
/// Closure vertices are kept exactly as referenced.
fn way_geometry(store: &PrimitiveStore, way: &Way) -> Option<Geometry<f64>> {
    let coords = resolve_coords(store, &way.node_ids)?;
    if coords.len() < 2 {
        return None;
    }
    let line = LineString::new(coords);
    if way.is_closed() {
        Some(Geometry::Polygon(Polygon::new(line, vec![])))
    } else {
        Some(Geometry::LineString(line))
    }
}

fn resolve_coords(store: &PrimitiveStore, node_ids: &[i64]) -> Option<Vec<Coord>> {
    node_ids
        .iter()
        .map(|id| store.node(*id).map(|n| coord! { x: n.lon, y: n.lat }))
        .collect()
}

/// Members carrying the outer/inner ring convention yield an area; anything
/// else (routes and the like) yields a multi-line. Members referencing other
/// relations are never followed.
fn relation_geometry(store: &PrimitiveStore, relation: &Relation) -> Option<Geometry<f64>> {
    let has_ring_roles = relation
        .members
        .iter()
        .any(|m| m.kind == MemberKind::Way && (m.role == "outer" || m.role == "inner"));
    if has_ring_roles {
        multipolygon_geometry(store, relation)
    } else {
        multiline_geometry(store, relation)
    }
}

fn multiline_geometry(store: &PrimitiveStore, relation: &Relation) -> Option<Geometry<f64>> {
    let lines: Vec<LineString> = relation
        .members
        .iter()
        .filter(|m| m.kind == MemberKind::Way)
        .filter_map(|m| store.way(m.id))
        .filter_map(|way| resolve_coords(store, &way.node_ids))
        .filter(|coords| coords.len() >= 2)
        .map(LineString::new)
        .collect();
    if lines.is_empty() {
        return None;
    }
    // Always a MultiLineString, even for a single member way.
    Some(Geometry::MultiLineString(MultiLineString::new(lines)))
}

fn multipolygon_geometry(store: &PrimitiveStore, relation: &Relation) -> Option<Geometry<f64>> {
    let mut outer_ways = Vec::new();
    let mut inner_ways = Vec::new();
    for member in &relation.members {
        if member.kind != MemberKind::Way {
            continue;
        }
        let Some(way) = store.way(member.id) else {
            continue;
        };
        if member.role == "inner" {
            inner_ways.push(way);
        } else {
            outer_ways.push(way);
        }
    }

    let outer_rings = stitch_rings(store, outer_ways);
    let inner_rings = stitch_rings(store, inner_ways);
    if outer_rings.is_empty() {
        return None;
    }

    let shells: Vec<Polygon> = outer_rings
        .iter()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
        .collect();
    let mut holes: Vec<Vec<LineString>> = vec![Vec::new(); shells.len()];
    for ring in inner_rings {
        let hole = Polygon::new(ring.clone(), vec![]);
        if let Some(i) = shells.iter().position(|shell| hole.is_within(shell)) {
            holes[i].push(ring);
        }
    }

    let mut polygons: Vec<Polygon> = shells
        .into_iter()
        .zip(holes)
        .map(|(shell, holes)| {
            let (exterior, _) = shell.into_inner();
            Polygon::new(exterior, holes)
        })
        .collect();

    if polygons.len() == 1 {
        Some(Geometry::Polygon(polygons.remove(0)))
    } else {
        Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
    }
}

/// Chains member ways into closed rings by matching endpoint node ids,
/// reversing a segment when only its tail adjoins. Chains that never close
/// and rings touching a missing node are dropped.
fn stitch_rings(store: &PrimitiveStore, ways: Vec<&Way>) -> Vec<LineString> {
    let mut pending: Vec<Vec<i64>> = ways
        .into_iter()
        .map(|way| way.node_ids.clone())
        .filter(|ids| ids.len() >= 2)
        .collect();
    let mut rings = Vec::new();

    while let Some(mut ids) = pending.pop() {
        while ids.first() != ids.last() {
            let tail = ids[ids.len() - 1];
            let Some(next) = take_adjoining(&mut pending, tail) else {
                break;
            };
            ids.extend(next.into_iter().skip(1));
        }
        if ids.first() != ids.last() {
            continue;
        }
        let Some(coords) = resolve_coords(store, &ids) else {
            continue;
        };
        rings.push(LineString::new(coords));
    }
    rings
}

fn take_adjoining(pending: &mut Vec<Vec<i64>>, node_id: i64) -> Option<Vec<i64>> {
    for (i, ids) in pending.iter().enumerate() {
        if ids.first() == Some(&node_id) {
            return Some(pending.swap_remove(i));
        }
        if ids.last() == Some(&node_id) {
            let mut ids = pending.swap_remove(i);
            ids.reverse();
            return Some(ids);
        }
    }
    None
}
