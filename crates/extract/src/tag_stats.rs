use std::collections::HashMap;

use anyhow::Result;
use osmpbf::{Element, PrimitiveBlock};
use types::{ObjectType, TagCount, TagCounts};

use crate::block_reader::map_blocks;

type TallyMap = HashMap<(String, String), Buckets>;

#[derive(Debug, Default, Clone, Copy)]
struct Buckets {
    node: u64,
    closed_way: u64,
    open_way: u64,
    relation: u64,
}

impl Buckets {
    fn bump(&mut self, kind: ObjectType) {
        match kind {
            ObjectType::Node => self.node += 1,
            ObjectType::ClosedWay => self.closed_way += 1,
            ObjectType::OpenWay => self.open_way += 1,
            ObjectType::Relation => self.relation += 1,
        }
    }

    fn merge(&mut self, other: Buckets) {
        self.node += other.node;
        self.closed_way += other.closed_way;
        self.open_way += other.open_way;
        self.relation += other.relation;
    }
}

/// One streaming pass over all primitives, tallying every (key, value) pair
/// into the bucket of the carrying primitive's kind. Per-block tallies are
/// merged in file order.
pub(crate) fn count_blocks(path: &str) -> Result<TagCounts> {
    let partials = map_blocks(path, tally_block)?;
    let mut merged = TallyMap::new();
    for partial in partials {
        for (pair, buckets) in partial {
            merged.entry(pair).or_default().merge(buckets);
        }
    }
    Ok(into_counts(merged))
}

fn tally_block(block: &PrimitiveBlock) -> TallyMap {
    let mut tally = TallyMap::new();
    for element in block.elements() {
        match element {
            Element::Node(node) => record(&mut tally, node.tags(), ObjectType::Node),
            Element::DenseNode(node) => record(&mut tally, node.tags(), ObjectType::Node),
            Element::Way(way) => {
                let kind = if way_is_closed(&way) {
                    ObjectType::ClosedWay
                } else {
                    ObjectType::OpenWay
                };
                record(&mut tally, way.tags(), kind);
            }
            Element::Relation(relation) => {
                record(&mut tally, relation.tags(), ObjectType::Relation)
            }
        }
    }
    tally
}

fn way_is_closed(way: &osmpbf::Way) -> bool {
    let mut refs = way.refs();
    let first = refs.next();
    // `last` consumes the remaining refs, so a single-ref way compares
    // against None and counts as open.
    first.is_some() && first == refs.last()
}

fn record<'a>(
    tally: &mut TallyMap,
    tags: impl Iterator<Item = (&'a str, &'a str)>,
    kind: ObjectType,
) {
    for (key, value) in tags {
        tally
            .entry((key.to_owned(), value.to_owned()))
            .or_default()
            .bump(kind);
    }
}

fn into_counts(merged: TallyMap) -> TagCounts {
    TagCounts::from_unordered(
        merged
            .into_iter()
            .map(|((key, value), buckets)| TagCount {
                key,
                value,
                node: buckets.node,
                closed_way: buckets.closed_way,
                open_way: buckets.open_way,
                relation: buckets.relation,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_pairs(tally: &mut TallyMap, pairs: &[(&str, &str)], kind: ObjectType) {
        record(tally, pairs.iter().copied(), kind);
    }

    #[test]
    fn buckets_follow_primitive_kind() {
        let mut tally = TallyMap::new();
        record_pairs(&mut tally, &[("highway", "residential")], ObjectType::OpenWay);
        record_pairs(&mut tally, &[("highway", "residential")], ObjectType::OpenWay);
        record_pairs(&mut tally, &[("highway", "residential")], ObjectType::ClosedWay);
        record_pairs(&mut tally, &[("natural", "tree")], ObjectType::Node);
        record_pairs(&mut tally, &[("route", "bus")], ObjectType::Relation);

        let counts = into_counts(tally);
        assert_eq!(counts.len(), 3);
        let highways = counts.filter(|t| t.key == "highway");
        let highway = &highways.0[0];
        assert_eq!(
            (highway.node, highway.closed_way, highway.open_way, highway.relation),
            (0, 1, 2, 0)
        );
    }

    #[test]
    fn total_invariant_holds_across_collection() {
        let mut tally = TallyMap::new();
        record_pairs(
            &mut tally,
            &[("a", "1"), ("b", "2"), ("c", "3")],
            ObjectType::Node,
        );
        record_pairs(&mut tally, &[("a", "1"), ("b", "2")], ObjectType::OpenWay);
        record_pairs(&mut tally, &[("a", "1")], ObjectType::Relation);

        let counts = into_counts(tally);
        for t in &counts.0 {
            assert_eq!(t.total(), t.node + t.closed_way + t.open_way + t.relation);
        }
        assert_eq!(counts.0[0].key, "a");
        assert_eq!(counts.0[0].total(), 3);
    }

    #[test]
    fn merge_adds_per_block_tallies() {
        let mut first = TallyMap::new();
        record_pairs(&mut first, &[("highway", "residential")], ObjectType::OpenWay);
        let mut second = TallyMap::new();
        record_pairs(&mut second, &[("highway", "residential")], ObjectType::OpenWay);
        record_pairs(&mut second, &[("highway", "service")], ObjectType::OpenWay);

        let mut merged = TallyMap::new();
        for partial in [first, second] {
            for (pair, buckets) in partial {
                merged.entry(pair).or_default().merge(buckets);
            }
        }
        let counts = into_counts(merged);
        let residentials = counts.filter(|t| t.value == "residential");
        let residential = &residentials.0[0];
        assert_eq!(residential.open_way, 2);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn every_tag_on_a_primitive_is_counted() {
        let mut tally = TallyMap::new();
        record_pairs(
            &mut tally,
            &[("highway", "path"), ("surface", "dirt")],
            ObjectType::OpenWay,
        );
        let counts = into_counts(tally);
        assert_eq!(counts.len(), 2);
        assert!(counts.0.iter().all(|t| t.open_way == 1));
    }
}
