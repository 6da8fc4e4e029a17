//! Tests for the metadata table and the type map

mod common;

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use polycheck_core::error::PolycheckError;
use polycheck_core::metadata::{parse_record, parse_table, SharedTypeMap, SymbolTableLookup, TypeMap};
use polycheck_core::types::{Location, LocationKey, TypeHandle};
use tempfile::NamedTempFile;

fn lookup(name: &str) -> Option<TypeHandle>
{
    match name {
        "Widget" => Some(TypeHandle::from_raw(1)),
        "Gadget" => Some(TypeHandle::from_raw(2)),
        "Base" => Some(TypeHandle::from_raw(3)),
        _ => None,
    }
}

fn table(lines: &[&str]) -> NamedTempFile
{
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

#[test]
fn test_parse_record_fields()
{
    let record = parse_record("x\ty\tz\t/src/foo.c\t10\t12\theap\tWidget", 1).unwrap();
    assert_eq!(record.file, "/src/foo.c");
    assert_eq!(record.line_start, 10);
    assert_eq!(record.line_end, 12);
    assert_eq!(record.alloc_type, "heap");
    assert_eq!(record.type_name, "Widget");
}

#[test]
fn test_parse_record_allows_trailing_columns()
{
    let record = parse_record("x\ty\tz\tfoo.c\t1\t1\tstack\tBase\textra\tmore", 1).unwrap();
    assert_eq!(record.type_name, "Base");
}

#[test]
fn test_parse_record_keeps_file_field_verbatim()
{
    let record = parse_record("x\ty\tz\t src/a.c \t 1 \t1\theap\tWidget", 1).unwrap();
    assert_eq!(record.file, " src/a.c ");
    assert_eq!(record.line_start, 1);

    let record = parse_record("x\ty\tz\t \t1\t1\theap\tWidget", 2).unwrap();
    assert_eq!(record.file, " ");
}

#[test]
fn test_parse_record_rejects_short_line()
{
    let err = parse_record("x\ty\tz\tfoo.c\t1\t1\theap", 7).unwrap_err();
    assert!(matches!(err, PolycheckError::MalformedRecord { line: 7, .. }));
}

#[test]
fn test_parse_record_rejects_empty_file()
{
    let err = parse_record("x\ty\tz\t\t1\t1\theap\tWidget", 2).unwrap_err();
    assert!(matches!(err, PolycheckError::MalformedRecord { line: 2, ref reason } if reason.contains("file")));
}

#[test]
fn test_parse_record_rejects_non_numeric_line()
{
    let err = parse_record("x\ty\tz\tfoo.c\tten\t12\theap\tWidget", 3).unwrap_err();
    assert!(matches!(err, PolycheckError::MalformedRecord { line: 3, ref reason } if reason.contains("line_start")));
}

#[test]
fn test_parse_record_rejects_inverted_range()
{
    let err = parse_record("x\ty\tz\tfoo.c\t12\t10\theap\tWidget", 4).unwrap_err();
    assert!(matches!(err, PolycheckError::MalformedRecord { line: 4, .. }));
}

#[test]
fn test_parse_table_skips_blank_lines_and_numbers_lines()
{
    let records = parse_table("a\tb\tc\tfoo.c\t1\t1\theap\tWidget\n\n   \na\tb\tc\tbar.c\t2\t3\theap\tGadget\n").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].line, 1);
    assert_eq!(records[1].line, 4);
}

#[test]
fn test_parse_table_reports_first_bad_line()
{
    let err = parse_table("a\tb\tc\tfoo.c\t1\t1\theap\tWidget\nbroken\n").unwrap_err();
    assert!(matches!(err, PolycheckError::MalformedRecord { line: 2, .. }));
}

#[test]
fn test_type_map_indexes_every_line()
{
    let file = table(&["a\tb\tc\t/src/foo.c\t10\t12\theap\tWidget"]);
    let map = TypeMap::load(file.path(), &lookup).unwrap();

    assert_eq!(map.len(), 3);
    assert_eq!(map.record_count(), 1);
    for line in 10..=12 {
        let candidates = map.get(&LocationKey::new("/src/foo.c", line)).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].type_name, "Widget");
        assert_eq!(candidates[0].alloc_type, "heap");
    }
    assert!(map.get(&LocationKey::new("/src/foo.c", 13)).is_none());
}

#[test]
fn test_type_map_prefers_narrower_range()
{
    let file = table(&[
        "a\tb\tc\tfoo.c\t10\t14\theap\tWidget",
        "a\tb\tc\tfoo.c\t11\t13\theap\tGadget",
    ]);
    let map = TypeMap::load(file.path(), &lookup).unwrap();

    let at = |line| map.resolve(&Location::single("foo.c", line)).unwrap()[0].type_name.clone();
    assert_eq!(at(10), "Widget");
    assert_eq!(at(12), "Gadget");
    assert_eq!(at(14), "Widget");
}

#[test]
fn test_type_map_narrower_range_wins_regardless_of_order()
{
    let file = table(&[
        "a\tb\tc\tfoo.c\t11\t13\theap\tGadget",
        "a\tb\tc\tfoo.c\t10\t14\theap\tWidget",
    ]);
    let map = TypeMap::load(file.path(), &lookup).unwrap();
    assert_eq!(map.resolve(&Location::single("foo.c", 12)).unwrap()[0].type_name, "Gadget");
}

#[test]
fn test_type_map_equal_width_prefers_later_start()
{
    let file = table(&[
        "a\tb\tc\tfoo.c\t20\t22\theap\tWidget",
        "a\tb\tc\tfoo.c\t21\t23\theap\tGadget",
    ]);
    let map = TypeMap::load(file.path(), &lookup).unwrap();

    let at = |line| map.resolve(&Location::single("foo.c", line)).unwrap()[0].type_name.clone();
    assert_eq!(at(20), "Widget");
    assert_eq!(at(21), "Gadget");
    assert_eq!(at(22), "Gadget");
    assert_eq!(at(23), "Gadget");
}

#[test]
fn test_type_map_keeps_identical_ranges_as_candidates()
{
    let file = table(&[
        "a\tb\tc\tfoo.c\t5\t5\theap\tWidget",
        "a\tb\tc\tfoo.c\t5\t5\theap\tGadget",
        "a\tb\tc\tfoo.c\t5\t5\theap\tWidget",
    ]);
    let map = TypeMap::load(file.path(), &lookup).unwrap();

    let candidates = map.get(&LocationKey::new("foo.c", 5)).unwrap();
    let names: Vec<&str> = candidates.iter().map(|info| info.type_name.as_str()).collect();
    assert_eq!(names, vec!["Widget", "Gadget"]);
    assert_eq!(map.record_count(), 3);
}

#[test]
fn test_type_map_unresolved_type_is_fatal()
{
    let file = table(&["a\tb\tc\tfoo.c\t1\t1\theap\tWidget", "a\tb\tc\tfoo.c\t2\t2\theap\tMystery"]);
    let err = TypeMap::load(file.path(), &lookup).unwrap_err();
    assert!(matches!(err, PolycheckError::UnresolvedType { ref name, line: 2 } if name == "Mystery"));
    assert!(err.is_fatal());
}

#[test]
fn test_type_map_missing_table_is_fatal()
{
    let dir = tempfile::tempdir().unwrap();
    let err = TypeMap::load(&dir.path().join("missing.allocs"), &lookup).unwrap_err();
    assert!(matches!(err, PolycheckError::MetadataOpen { .. }));
}

#[test]
fn test_dump_is_sorted()
{
    let file = table(&["a\tb\tc\tb.c\t2\t2\theap\tWidget", "a\tb\tc\ta.c\t1\t1\theap\tBase"]);
    let map = TypeMap::load(file.path(), &lookup).unwrap();
    let keys: Vec<&str> = map.dump().into_iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["a.c:1", "b.c:2"]);
}

#[test]
fn test_shared_map_builds_once()
{
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let layouts = common::layouts();
    let shared = SharedTypeMap::lazy("fixture", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(common::fixture_map(&layouts))
    });

    assert!(!shared.is_initialized());
    let first = Arc::clone(shared.get().unwrap());
    let second = Arc::clone(shared.get().unwrap());

    assert!(shared.is_initialized());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shared_map_builds_once_across_threads()
{
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let layouts = common::layouts();
    let shared = Arc::new(SharedTypeMap::lazy("fixture", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(common::fixture_map(&layouts))
    }));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || shared.get().map(|map| map.len()).unwrap())
        })
        .collect();
    let sizes: Vec<usize> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert!(sizes.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shared_map_replays_failure()
{
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let shared = SharedTypeMap::lazy("broken", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(PolycheckError::MalformedRecord {
            line: 1,
            reason: "empty file field".to_string(),
        })
    });

    assert!(matches!(shared.get(), Err(PolycheckError::MalformedRecord { line: 1, .. })));
    assert!(matches!(shared.open(), Err(PolycheckError::MalformedRecord { line: 1, .. })));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shared_map_from_table()
{
    let file = table(&["a\tb\tc\tfoo.c\t1\t2\theap\tWidget"]);
    let shared = SharedTypeMap::from_table(file.path(), Arc::new(lookup));
    assert_eq!(shared.get().unwrap().len(), 2);
}

#[test]
fn test_symbol_table_lookup_rejects_non_object_file()
{
    let file = table(&["not an object file"]);
    let err = SymbolTableLookup::open(file.path()).unwrap_err();
    assert!(matches!(err, PolycheckError::DescriptorLoad { .. }));
}

#[test]
fn test_symbol_table_lookup_reads_test_binary()
{
    let exe = std::env::current_exe().unwrap();
    let lookup = SymbolTableLookup::open(&exe).unwrap();
    assert!(!lookup.is_empty());
    assert_eq!(lookup.path(), exe.as_path());
}
