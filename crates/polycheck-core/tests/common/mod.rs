//! Shared fixtures for checker tests

#![allow(dead_code)]

use std::sync::Arc;

use polycheck_core::prelude::*;

/// Pointer values understood by [`FakeSpace`]
#[derive(Debug, Clone)]
pub enum FakePointer
{
    /// A concrete address
    Concrete(u64),
    /// A symbolic pointer that may take any of these values
    Symbolic(Vec<u64>),
}

/// Flat memory model: a pointer denotes every object containing its value
#[derive(Debug, Default)]
pub struct FakeSpace
{
    objects: Vec<MemoryObject>,
}

impl FakeSpace
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_object(mut self, base: u64, size: u64) -> Self
    {
        self.objects.push(MemoryObject::new(Address::new(base), size));
        self
    }

    fn objects_at(&self, value: u64) -> impl Iterator<Item = MemoryObject> + '_
    {
        self.objects
            .iter()
            .copied()
            .filter(move |object| object.contains(Address::new(value)))
    }
}

impl AddressSpace for FakeSpace
{
    type Pointer = FakePointer;

    fn resolve(&self, pointer: &FakePointer) -> Vec<MemoryObject>
    {
        match pointer {
            FakePointer::Concrete(value) => self.objects_at(*value).collect(),
            FakePointer::Symbolic(values) => values.iter().flat_map(|value| self.objects_at(*value)).collect(),
        }
    }
}

/// Layouts used throughout the tests
///
/// `Derived` embeds `Base` at offset 8; `Other` is unrelated to both.
pub struct Layouts
{
    pub catalog: LayoutCatalog,
    pub base: TypeHandle,
    pub derived: TypeHandle,
    pub other: TypeHandle,
}

pub fn layouts() -> Layouts
{
    let mut catalog = LayoutCatalog::new();
    let int = catalog.declare_opaque("int");
    let base = catalog.declare("Base", [("id", 0, int)]);
    let derived = catalog.declare("Derived", [("vptr", 0, int), ("base", 8, base)]);
    let other = catalog.declare("Other", [("count", 0, int)]);
    Layouts {
        catalog,
        base,
        derived,
        other,
    }
}

/// Heap site for `type_name` covering `start..=end` of `file`
pub fn site(file: &str, start: u32, end: u32, type_name: &str, handle: TypeHandle) -> AllocSiteInfo
{
    AllocSiteInfo {
        type_handle: handle,
        type_name: type_name.to_string(),
        alloc_type: "heap".to_string(),
        alloc_loc: Location::new(file, start, end).expect("valid range"),
    }
}

/// Standard fixture map:
/// - `/src/shapes.c:5` allocates `Base`
/// - `/src/shapes.c:7` allocates `Derived`
/// - `/src/shapes.c:9` allocates `Other`
/// - `/src/foo.c:10-12` allocates `Widget` (handle of `Other`)
/// - `/src/off.c:20` allocates `Base` (reported one line early at runtime)
/// - `/src/off.c:30` allocates `Derived`
pub fn fixture_map(layouts: &Layouts) -> TypeMap
{
    let mut builder = TypeMap::builder();
    builder
        .insert(site("/src/shapes.c", 5, 5, "Base", layouts.base))
        .insert(site("/src/shapes.c", 7, 7, "Derived", layouts.derived))
        .insert(site("/src/shapes.c", 9, 9, "Other", layouts.other))
        .insert(site("/src/foo.c", 10, 12, "Widget", layouts.other))
        .insert(site("/src/off.c", 20, 20, "Base", layouts.base))
        .insert(site("/src/off.c", 30, 30, "Derived", layouts.derived));
    builder.build()
}

pub fn config() -> CheckerConfig
{
    CheckerConfig::new("/nonexistent/meta").with_source_root(None)
}

/// Session over [`fixture_map`] and [`layouts`] with `config`
pub fn session_with(config: CheckerConfig) -> Arc<Session>
{
    let layouts = layouts();
    let map = fixture_map(&layouts);
    Arc::new(Session::new(config, SharedTypeMap::prebuilt(map), Arc::new(layouts.catalog)))
}

pub fn session() -> Arc<Session>
{
    session_with(config())
}
