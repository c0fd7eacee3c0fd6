//! Tests for free-space computation inside a node

use ipam::domain::{DomainError, DomainTree, Network, NodeId, SchemaTemplate};
use ipam::util::testing;
use rstest::rstest;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn net(s: &str) -> Network {
    Network::parse(s).expect("valid network")
}

fn nets(list: &[&str]) -> Vec<Network> {
    list.iter().map(|s| net(s)).collect()
}

/// Australia 10.0.0.0/12 with City Brisbane 10.0.0.0/19
fn australia() -> (DomainTree, NodeId) {
    let schema = SchemaTemplate::new("Test", vec!["Region".into(), "City".into()]).unwrap();
    let mut tree = DomainTree::new("Sedgman", schema);
    let region = tree
        .add_node("Region", None, "Australia", "10.0.0.0/12")
        .unwrap();
    tree.add_node("City", Some(region), "Brisbane", "10.0.0.0/19")
        .unwrap();
    (tree, region)
}

#[test]
fn given_region_with_city_when_listing_slash20_then_ten_blocks_outside_city() {
    let (tree, region) = australia();
    let brisbane = net("10.0.0.0/19");
    let parent = net("10.0.0.0/12");

    let free = tree.available_networks(region, Some(20), 10).unwrap();

    assert_eq!(free.len(), 10);
    assert!(free.iter().all(|n| n.prefix() == 20));
    assert!(free.iter().all(|n| parent.contains(n)));
    assert!(free.iter().all(|n| !n.overlaps(&brisbane)));
    assert_eq!(free.first(), Some(&net("10.0.32.0/20")));
    assert_eq!(free.last(), Some(&net("10.0.176.0/20")));
    assert!(free.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn given_region_with_city_when_listing_without_prefix_then_maximal_blocks() {
    let (tree, region) = australia();

    let free = tree.available_networks(region, None, 10).unwrap();

    assert_eq!(
        free,
        nets(&[
            "10.0.32.0/19",
            "10.0.64.0/18",
            "10.0.128.0/17",
            "10.1.0.0/16",
            "10.2.0.0/15",
            "10.4.0.0/14",
            "10.8.0.0/13",
        ])
    );
}

#[rstest]
#[case::single(1, &["10.0.32.0/20"])]
#[case::three(3, &["10.0.32.0/20", "10.0.48.0/20", "10.0.64.0/20"])]
#[case::zero(0, &[])]
fn given_limit_when_listing_with_prefix_then_stops_at_limit(
    #[case] limit: usize,
    #[case] expected: &[&str],
) {
    let (tree, region) = australia();
    let free = tree.available_networks(region, Some(20), limit).unwrap();
    assert_eq!(free, nets(expected));
}

#[test]
fn given_prefix_wider_than_node_when_listing_then_empty() {
    let (tree, region) = australia();
    let free = tree.available_networks(region, Some(8), 10).unwrap();
    assert!(free.is_empty());
}

#[test]
fn given_prefix_beyond_32_when_listing_then_invalid_prefix_length() {
    let (tree, region) = australia();
    assert_eq!(
        tree.available_networks(region, Some(33), 10),
        Err(DomainError::InvalidPrefixLength(33))
    );
}

#[test]
fn given_leaf_node_when_listing_then_whole_block_free() {
    let (tree, _) = australia();
    let city = tree.find_path("Australia/Brisbane").unwrap();

    assert_eq!(
        tree.available_networks(city, None, 10).unwrap(),
        nets(&["10.0.0.0/19"])
    );
    assert_eq!(
        tree.available_networks(city, Some(21), 10).unwrap(),
        nets(&["10.0.0.0/21", "10.0.8.0/21", "10.0.16.0/21", "10.0.24.0/21"])
    );
}

#[test]
fn given_fully_used_node_when_listing_then_nothing_free() {
    let schema = SchemaTemplate::new("Test", vec!["Region".into(), "City".into()]).unwrap();
    let mut tree = DomainTree::new("Sedgman", schema);
    let region = tree.add_node("Region", None, "Europe", "172.16.0.0/24").unwrap();
    tree.add_node("City", Some(region), "Berlin", "172.16.0.0/25").unwrap();
    tree.add_node("City", Some(region), "Paris", "172.16.0.128/25").unwrap();

    assert!(tree.available_networks(region, None, 10).unwrap().is_empty());
    assert!(tree.available_networks(region, Some(26), 10).unwrap().is_empty());
}

#[test]
fn given_root_with_region_when_listing_then_excludes_region() {
    let (tree, _) = australia();

    let free = tree.available_networks(tree.root(), Some(12), 3).unwrap();

    assert_eq!(free, nets(&["0.0.0.0/12", "0.16.0.0/12", "0.32.0.0/12"]));
    let free = tree.available_networks(tree.root(), None, 10).unwrap();
    assert!(free.iter().all(|n| !n.overlaps(&net("10.0.0.0/12"))));
    let total: u64 = free.iter().map(Network::size).sum();
    assert_eq!(total, (1u64 << 32) - (1u64 << 20));
}
