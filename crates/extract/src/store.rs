use std::collections::HashMap;
use std::time::Instant;

use anyhow::Result;
use osmpbf::{Element, PrimitiveBlock, RelMemberType};
use types::{Member, MemberKind, Node, Relation, TagMap, Way};

use crate::block_reader::map_blocks;

/// In-memory index of every decoded primitive, one arena per kind plus an
/// id lookup into it. Arena order is scan order: the container stores all
/// nodes, then all ways, then all relations, and blocks are absorbed in file
/// order. Read-only once built.
#[derive(Debug, Default)]
pub struct PrimitiveStore {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
    node_ids: HashMap<i64, usize>,
    way_ids: HashMap<i64, usize>,
    relation_ids: HashMap<i64, usize>,
}

impl PrimitiveStore {
    pub fn new() -> PrimitiveStore {
        PrimitiveStore::default()
    }

    pub fn from_path(path: &str) -> Result<PrimitiveStore> {
        let start = Instant::now();
        let blocks = map_blocks(path, scan_block)?;

        let mut store = PrimitiveStore::new();
        for block in blocks {
            for node in block.nodes {
                store.push_node(node);
            }
            for way in block.ways {
                store.push_way(way);
            }
            for relation in block.relations {
                store.push_relation(relation);
            }
        }
        log::info!(
            "indexed {} nodes, {} ways, {} relations in {:.2?}",
            store.nodes.len(),
            store.ways.len(),
            store.relations.len(),
            start.elapsed()
        );
        Ok(store)
    }

    pub fn push_node(&mut self, node: Node) {
        self.node_ids.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    pub fn push_way(&mut self, way: Way) {
        self.way_ids.insert(way.id, self.ways.len());
        self.ways.push(way);
    }

    pub fn push_relation(&mut self, relation: Relation) {
        self.relation_ids.insert(relation.id, self.relations.len());
        self.relations.push(relation);
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.node_ids.get(&id).map(|i| &self.nodes[*i])
    }

    pub fn way(&self, id: i64) -> Option<&Way> {
        self.way_ids.get(&id).map(|i| &self.ways[*i])
    }

    pub fn relation(&self, id: i64) -> Option<&Relation> {
        self.relation_ids.get(&id).map(|i| &self.relations[*i])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

#[derive(Default)]
struct ScannedBlock {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
}

fn scan_block(block: &PrimitiveBlock) -> ScannedBlock {
    let mut scanned = ScannedBlock::default();
    for element in block.elements() {
        match element {
            Element::Node(node) => scanned.nodes.push(Node {
                id: node.id(),
                lon: node.lon(),
                lat: node.lat(),
                tags: owned_tags(node.tags()),
            }),
            Element::DenseNode(node) => scanned.nodes.push(Node {
                id: node.id(),
                lon: node.lon(),
                lat: node.lat(),
                tags: owned_tags(node.tags()),
            }),
            Element::Way(way) => scanned.ways.push(Way {
                id: way.id(),
                node_ids: way.refs().collect(),
                tags: owned_tags(way.tags()),
            }),
            Element::Relation(relation) => scanned.relations.push(Relation {
                id: relation.id(),
                members: relation
                    .members()
                    .map(|member| Member {
                        id: member.member_id,
                        role: member.role().unwrap_or_default().to_owned(),
                        kind: member_kind(member.member_type),
                    })
                    .collect(),
                tags: owned_tags(relation.tags()),
            }),
        }
    }
    scanned
}

fn owned_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> TagMap {
    tags.map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn member_kind(member_type: RelMemberType) -> MemberKind {
    match member_type {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let mut store = PrimitiveStore::new();
        store.push_node(Node {
            id: 42,
            lon: -158.0,
            lat: 21.3,
            tags: TagMap::new(),
        });
        store.push_way(Way {
            id: 7,
            node_ids: vec![42],
            tags: TagMap::new(),
        });

        assert_eq!(store.node(42).map(|n| n.lon), Some(-158.0));
        assert_eq!(store.way(7).map(|w| w.node_ids.len()), Some(1));
        assert!(store.node(43).is_none());
        assert!(store.relation(7).is_none());
    }

    #[test]
    fn arena_keeps_insertion_order() {
        let mut store = PrimitiveStore::new();
        for id in [5, 3, 9] {
            store.push_node(Node {
                id,
                lon: 0.0,
                lat: 0.0,
                tags: TagMap::new(),
            });
        }
        let ids: Vec<i64> = store.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }
}
