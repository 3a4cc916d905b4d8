use std::collections::HashMap;

use geo::Geometry;
use serde::{Deserialize, Serialize};

pub type TagMap = HashMap<String, String>;

/// A point feature decoded from the source file. Leaf primitive, never
/// references anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
    pub tags: TagMap,
}

/// An ordered run of node references. The first and last reference being
/// equal marks the way as closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub node_ids: Vec<i64>,
    pub tags: TagMap,
}

impl Way {
    pub fn is_closed(&self) -> bool {
        self.node_ids.len() > 1 && self.node_ids.first() == self.node_ids.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub kind: MemberKind,
    pub id: i64,
    pub role: String,
}

/// An ordered list of members with roles. Members may reference other
/// relations; resolution never follows those references.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: TagMap,
}

/// The four counting buckets a tag occurrence can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    Node,
    ClosedWay,
    OpenWay,
    Relation,
}

/// Occurrence counts for one distinct (key, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCount {
    pub key: String,
    pub value: String,
    pub node: u64,
    pub closed_way: u64,
    pub open_way: u64,
    pub relation: u64,
}

impl TagCount {
    pub fn total(&self) -> u64 {
        self.node + self.closed_way + self.open_way + self.relation
    }

    /// The bucket with the largest count. Ties keep the earlier bucket in
    /// the order node, closed way, open way, relation.
    pub fn dominant_type(&self) -> ObjectType {
        let buckets = [
            (ObjectType::Node, self.node),
            (ObjectType::ClosedWay, self.closed_way),
            (ObjectType::OpenWay, self.open_way),
            (ObjectType::Relation, self.relation),
        ];
        let mut dominant = buckets[0];
        for bucket in &buckets[1..] {
            if bucket.1 > dominant.1 {
                dominant = *bucket;
            }
        }
        dominant.0
    }
}

/// Tag counts ordered by descending total, ties broken by key then value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCounts(pub Vec<TagCount>);

impl TagCounts {
    pub fn from_unordered(mut counts: Vec<TagCount>) -> TagCounts {
        counts.sort_by(|a, b| {
            b.total()
                .cmp(&a.total())
                .then_with(|| a.key.cmp(&b.key))
                .then_with(|| a.value.cmp(&b.value))
        });
        TagCounts(counts)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The matching subset, relative order preserved.
    pub fn filter<F>(&self, predicate: F) -> TagCounts
    where
        F: Fn(&TagCount) -> bool,
    {
        TagCounts(self.0.iter().filter(|t| predicate(t)).cloned().collect())
    }

    /// Header row plus one row of strings per count.
    pub fn table(&self) -> Vec<Vec<String>> {
        let header = ["Key", "Value", "Total", "Node", "Closed way", "Open way", "Relation"];
        let mut rows = vec![header.iter().map(|h| h.to_string()).collect::<Vec<String>>()];
        for t in &self.0 {
            rows.push(vec![
                t.key.clone(),
                t.value.clone(),
                t.total().to_string(),
                t.node.to_string(),
                t.closed_way.to_string(),
                t.open_way.to_string(),
                t.relation.to_string(),
            ]);
        }
        rows
    }
}

/// An assembled geometry together with the full tag map of the primitive it
/// came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeomTags {
    pub geom: Geometry<f64>,
    pub tags: TagMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(key: &str, value: &str, buckets: [u64; 4]) -> TagCount {
        TagCount {
            key: key.to_string(),
            value: value.to_string(),
            node: buckets[0],
            closed_way: buckets[1],
            open_way: buckets[2],
            relation: buckets[3],
        }
    }

    #[test]
    fn total_is_sum_of_buckets() {
        let t = count("highway", "residential", [1, 55, 6784, 3]);
        assert_eq!(t.total(), 1 + 55 + 6784 + 3);
    }

    #[test]
    fn way_closure() {
        let closed = Way {
            id: 1,
            node_ids: vec![10, 11, 12, 10],
            tags: TagMap::new(),
        };
        let open = Way {
            id: 2,
            node_ids: vec![10, 11, 12],
            tags: TagMap::new(),
        };
        let degenerate = Way {
            id: 3,
            node_ids: vec![10],
            tags: TagMap::new(),
        };
        assert!(closed.is_closed());
        assert!(!open.is_closed());
        assert!(!degenerate.is_closed());
    }

    #[test]
    fn dominant_type_picks_largest_bucket() {
        let t = count("highway", "residential", [0, 55, 6784, 0]);
        assert_eq!(t.dominant_type(), ObjectType::OpenWay);
        let t = count("highway", "residential", [0, 55, 12, 0]);
        assert_eq!(t.dominant_type(), ObjectType::ClosedWay);
    }

    #[test]
    fn dominant_type_tie_goes_to_earlier_bucket() {
        let t = count("amenity", "bench", [4, 4, 4, 4]);
        assert_eq!(t.dominant_type(), ObjectType::Node);
        let t = count("amenity", "bench", [0, 4, 4, 0]);
        assert_eq!(t.dominant_type(), ObjectType::ClosedWay);
    }

    #[test]
    fn ordering_by_total_then_key_then_value() {
        let counts = TagCounts::from_unordered(vec![
            count("b", "x", [1, 0, 0, 0]),
            count("a", "y", [1, 0, 0, 0]),
            count("a", "x", [1, 0, 0, 0]),
            count("z", "z", [9, 0, 0, 0]),
        ]);
        let order: Vec<(&str, &str)> = counts
            .0
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_str()))
            .collect();
        assert_eq!(order, vec![("z", "z"), ("a", "x"), ("a", "y"), ("b", "x")]);
    }

    #[test]
    fn filter_preserves_relative_order() {
        let counts = TagCounts::from_unordered(vec![
            count("highway", "residential", [0, 55, 6784, 0]),
            count("highway", "service", [0, 10, 900, 0]),
            count("natural", "tree", [588, 0, 0, 0]),
        ]);
        let highways = counts.filter(|t| t.key == "highway");
        assert_eq!(highways.len(), 2);
        assert_eq!(highways.0[0].value, "residential");
        assert_eq!(highways.0[1].value, "service");
    }

    #[test]
    fn table_layout() {
        let counts = TagCounts::from_unordered(vec![count(
            "highway",
            "residential",
            [0, 55, 6784, 0],
        )]);
        let table = counts.table();
        assert_eq!(
            table,
            vec![
                vec!["Key", "Value", "Total", "Node", "Closed way", "Open way", "Relation"],
                vec!["highway", "residential", "6839", "0", "55", "6784", "0"],
            ]
            .into_iter()
            .map(|row: Vec<&str>| row.into_iter().map(String::from).collect::<Vec<String>>())
            .collect::<Vec<Vec<String>>>()
        );
    }
}
