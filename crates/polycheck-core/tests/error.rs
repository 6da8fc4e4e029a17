//! Tests for error handling

use std::path::PathBuf;

use polycheck_core::error::{PolycheckError, PolycheckResult};
use polycheck_core::host::MemoryObject;
use polycheck_core::report::TypecheckReport;
use polycheck_core::types::Address;

fn confusion(target: &str, examined: &str) -> PolycheckError
{
    PolycheckError::TypeConfusion {
        target: target.to_string(),
        examined: examined.to_string(),
        report: Box::new(TypecheckReport {
            target: MemoryObject::new(Address::new(0x1000), 16),
            target_info: None,
            outcomes: Vec::new(),
        }),
    }
}

#[test]
fn test_load_errors_are_fatal()
{
    let errors = [
        PolycheckError::MetadataOpen {
            path: PathBuf::from("/x.allocs"),
            reason: "No such file".to_string(),
        },
        PolycheckError::MalformedRecord {
            line: 3,
            reason: "empty file field".to_string(),
        },
        PolycheckError::UnresolvedType {
            name: "Widget".to_string(),
            line: 4,
        },
        PolycheckError::DescriptorLoad {
            path: PathBuf::from("/x-meta.so"),
            reason: "bad magic".to_string(),
        },
    ];
    assert!(errors.iter().all(PolycheckError::is_fatal));
}

#[test]
fn test_check_errors_are_not_fatal()
{
    assert!(!PolycheckError::UnresolvedPointer.is_fatal());
    assert!(!PolycheckError::AmbiguousPointer { count: 2 }.is_fatal());
    assert!(!confusion("Base", "Other").is_fatal());
    assert!(!PolycheckError::InvalidConfig("x".to_string()).is_fatal());
}

#[test]
fn test_error_messages()
{
    let message = PolycheckError::MalformedRecord {
        line: 12,
        reason: "invalid line_start 'x'".to_string(),
    }
    .to_string();
    assert!(message.contains("line 12"));
    assert!(message.contains("line_start"));

    let message = PolycheckError::UnresolvedType {
        name: "Widget".to_string(),
        line: 4,
    }
    .to_string();
    assert!(message.contains("Widget"));

    let message = PolycheckError::AmbiguousPointer { count: 3 }.to_string();
    assert!(message.contains('3'));

    let message = confusion("Base", "Other").to_string();
    assert_eq!(message, "Type confusion: Base is not contained in Other");
}

#[test]
fn test_missing_table_is_reported_as_metadata_open()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.allocs");
    let err = polycheck_core::metadata::read_table(&path).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, PolycheckError::MetadataOpen { path: ref reported, .. } if *reported == path));
}

#[test]
fn test_result_type_alias()
{
    fn returns_error() -> PolycheckResult<u32>
    {
        Err(PolycheckError::UnresolvedPointer)
    }
    assert!(returns_error().is_err());
}
