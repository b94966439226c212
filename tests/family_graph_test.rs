mod common;

use common::person;
use family_graph::{
    Family, FamilyCollection, GraphStore, LayoutConfig, Link, MemoryCollection, NodeId, Person,
};
use std::sync::Arc;

fn family() -> (Family, Arc<MemoryCollection>) {
    let collection = Arc::new(MemoryCollection::new());
    (Family::new(collection.clone()), collection)
}

#[test]
fn test_parent_child_scenario() {
    let (mut family, _) = family();

    let a = family.add_member(person("A", 0), None).unwrap();
    let b = family
        .add_member(Person::new("B", "Costa"), Some(Link::new(a.id, 1)))
        .unwrap();

    assert_eq!(b.generation(), 1);
    let store = family.store();
    assert_eq!(store.get_edge(b.id, a.id).unwrap().relationship, 1);
    assert_eq!(store.get_edge(a.id, b.id).unwrap().relationship, -1);
}

#[test]
fn test_generation_inference() {
    let (mut family, _) = family();
    let elder = family.add_member(person("Elder", 5), None).unwrap();

    let inferred = family
        .add_member(Person::new("Inferred", "Costa"), Some(Link::new(elder.id, 1)))
        .unwrap();
    assert_eq!(inferred.generation(), 6);

    let supplied = family
        .add_member(person("Supplied", 9), Some(Link::new(elder.id, 1)))
        .unwrap();
    assert_eq!(supplied.generation(), 9);
}

#[test]
fn test_every_edge_has_its_inverse() {
    let (mut family, _) = family();
    let a = family.add_member(person("A", 0), None).unwrap().id;
    let b = family.add_member(person("B", 1), None).unwrap().id;
    let c = family.add_member(person("C", 1), None).unwrap().id;
    let d = family.add_member(person("D", 2), None).unwrap().id;

    for (source, target, code) in [(b, a, 1), (c, a, 1), (b, c, 0), (a, d, -2)] {
        family.add_relationship(source, target, code).unwrap();
    }

    for (source, target, code) in [(b, a, 1), (c, a, 1), (b, c, 0), (a, d, -2)] {
        let store = family.store();
        assert_eq!(store.get_edge(source, target).unwrap().relationship, code);
        assert_eq!(store.get_edge(target, source).unwrap().relationship, -code);
    }
    family.store().verify_integrity().unwrap();
}

#[test]
fn test_edge_direction_does_not_matter() {
    let stored = |forward: bool| {
        let collection = Arc::new(MemoryCollection::new());
        let mut store = GraphStore::new(collection.clone());
        let x = store.add_node(person("X", 0)).unwrap();
        let y = store.add_node(person("Y", 3)).unwrap();
        if forward {
            store.add_edge(x, y, 3).unwrap();
        } else {
            store.add_edge(y, x, -3).unwrap();
        }
        collection.find_edges().unwrap()
    };

    assert_eq!(stored(true), stored(false));
}

#[test]
fn test_remove_member_removes_its_relationships() {
    let (mut family, collection) = family();
    let a = family.add_member(person("A", 0), None).unwrap().id;
    let b = family.add_member(person("B", 1), Some(Link::new(a, 1))).unwrap().id;
    let c = family.add_member(person("C", 1), Some(Link::new(a, 1))).unwrap().id;

    assert!(family.remove_member(a).unwrap());

    for edge in collection.find_edges().unwrap() {
        assert!(!edge.touches(a));
    }
    assert!(family.relationships_of(b).unwrap().is_empty());
    assert!(family.relationships_of(c).unwrap().is_empty());
    assert!(family.get_member(a).unwrap().is_none());
}

#[test]
fn test_removing_missing_relationship_is_noop() {
    let (mut family, collection) = family();
    let a = family.add_member(person("A", 0), None).unwrap().id;
    let b = family.add_member(person("B", 0), None).unwrap().id;

    assert!(!family.remove_relationship(a, b).unwrap());
    assert!(!family.remove_relationship(a, NodeId::new(404)).unwrap());
    assert!(collection.find_edges().unwrap().is_empty());
}

#[test]
fn test_search_without_match_is_empty() {
    let (mut family, _) = family();
    family
        .add_member(person("Maria", 0).with_attribute("birthplace", "Braga"), None)
        .unwrap();

    assert!(family.get_members_by_attribute("first_name", "^zz").unwrap().is_empty());
    assert_eq!(
        family.get_members_by_attribute("birthplace", "braga").unwrap().len(),
        1
    );
}

#[test]
fn test_layout_rows() {
    let collection = Arc::new(MemoryCollection::new());
    let layout = LayoutConfig::default();
    let mut family = Family::with_layout(collection, layout.clone());

    let oldest = family.add_member(person("Oldest", -1), None).unwrap().id;
    let left = family.add_member(person("Left", 0), None).unwrap().id;
    let right = family.add_member(person("Right", 0), None).unwrap().id;
    let youngest = family.add_member(person("Youngest", 2), None).unwrap().id;

    let nodes = family.get_all_members().unwrap();
    let position = |id: NodeId| {
        nodes
            .iter()
            .find(|node| node.id() == id)
            .and_then(|node| node.position())
            .unwrap()
    };

    assert!(position(oldest).y < position(left).y);
    assert_eq!(position(left).y, position(right).y);
    assert!(position(left).y < position(youngest).y);
    assert_eq!(position(right).x - position(left).x, layout.x_step);
}

#[test]
fn test_layout_is_idempotent() {
    let (mut family, _) = family();
    let a = family.add_member(person("A", 0), None).unwrap().id;
    family.add_member(person("B", 1), Some(Link::new(a, 1))).unwrap();
    family.add_member(person("C", 1), Some(Link::new(a, 1))).unwrap();

    let first = family.get_all_members().unwrap();
    let second = family.get_all_members().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_new_session_sees_stored_graph() {
    let collection = Arc::new(MemoryCollection::new());
    let (a, b) = {
        let mut family = Family::new(collection.clone());
        let a = family.add_member(person("A", 0), None).unwrap().id;
        let b = family.add_member(person("B", 1), Some(Link::new(a, 1))).unwrap().id;
        (a, b)
    };

    let mut family = Family::new(collection);
    family.connect().unwrap();
    assert_eq!(family.member_count(), 2);
    assert_eq!(family.relationship_count(), 1);
    assert_eq!(family.store().get_edge(a, b).unwrap().relationship, -1);
}
