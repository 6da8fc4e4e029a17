//! Tests for the allocation registry

mod common;

use std::sync::Arc;

use polycheck_core::registry::{AllocationInfo, AllocationRegistry};
use polycheck_core::types::{Address, Candidates};
use smallvec::smallvec;

fn candidates(names: &[&str]) -> Candidates
{
    let layouts = common::layouts();
    names
        .iter()
        .map(|name| Arc::new(common::site("/src/a.c", 1, 1, name, layouts.base)))
        .collect()
}

#[test]
fn test_allocation_info_requires_candidates()
{
    assert!(AllocationInfo::new(Address::new(0x10), Candidates::new()).is_none());
}

#[test]
fn test_allocation_info_accessors()
{
    let info = AllocationInfo::new(Address::new(0x10), candidates(&["Widget", "Gadget"])).unwrap();
    assert_eq!(info.address(), Address::new(0x10));
    assert!(info.is_ambiguous());
    assert_eq!(info.primary().type_name, "Widget");
    assert_eq!(info.type_names(), "Widget|Gadget");
}

#[test]
fn test_insert_and_lookup()
{
    let mut registry = AllocationRegistry::new();
    assert!(registry.is_empty());

    let info = AllocationInfo::new(Address::new(0x1000), candidates(&["Widget"])).unwrap();
    assert!(registry.insert(Arc::new(info)).is_none());

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup(Address::new(0x1000)).unwrap().type_names(), "Widget");
    assert!(registry.lookup(Address::new(0x2000)).is_none());
}

#[test]
fn test_insert_overwrites_same_address()
{
    let mut registry = AllocationRegistry::new();
    let first = AllocationInfo::new(Address::new(0x1000), candidates(&["Widget"])).unwrap();
    let second = AllocationInfo::new(Address::new(0x1000), candidates(&["Gadget"])).unwrap();

    registry.insert(Arc::new(first));
    let replaced = registry.insert(Arc::new(second)).unwrap();

    assert_eq!(replaced.type_names(), "Widget");
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup(Address::new(0x1000)).unwrap().type_names(), "Gadget");
}

#[test]
fn test_clone_is_independent()
{
    let mut registry = AllocationRegistry::new();
    let layouts = common::layouts();
    let single: Candidates = smallvec![Arc::new(common::site("/src/a.c", 1, 1, "Base", layouts.base))];
    registry.insert(Arc::new(AllocationInfo::new(Address::new(0x1), single.clone()).unwrap()));

    let mut fork = registry.clone();
    fork.insert(Arc::new(AllocationInfo::new(Address::new(0x2), single).unwrap()));

    assert_eq!(registry.len(), 1);
    assert_eq!(fork.len(), 2);
}
