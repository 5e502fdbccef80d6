//! File deletion: the same precedence as directories, but absence is a no-op.

mod common;

use common::{kind_of, Fixture};
use iso_store::{ErrorKind, FileAccess, FileMode, PresetScope};

#[test]
fn missing_path_is_invalid_argument() {
    let fx = Fixture::new();
    let store = fx.store();
    assert_eq!(kind_of(store.delete_file("")), ErrorKind::InvalidArgument);
}

#[test]
fn disposed_handle_is_object_disposed() {
    let fx = Fixture::new();
    let store = fx.store();
    store.dispose();
    assert_eq!(kind_of(store.delete_file("foo")), ErrorKind::ObjectDisposed);
}

#[test]
fn removed_store_is_operation_failed() {
    let fx = Fixture::new();
    let store = fx.store();
    store.remove().unwrap();
    assert_eq!(kind_of(store.delete_file("foo")), ErrorKind::OperationFailed);
}

#[test]
fn closed_handle_is_invalid_operation() {
    let fx = Fixture::new();
    let store = fx.store();
    store.close();
    assert_eq!(kind_of(store.delete_file("foo")), ErrorKind::InvalidOperation);
}

#[test]
fn nul_in_path_is_invalid_path() {
    let fx = Fixture::new();
    let store = fx.store();
    assert_eq!(kind_of(store.delete_file("\0bad")), ErrorKind::InvalidPath);
}

#[test]
fn absent_file_is_a_no_op() {
    let fx = Fixture::new();
    let store = fx.store();
    store.delete_file("never-created").unwrap();
    store.delete_file("missing/dir/file").unwrap();
}

#[test]
fn directory_path_is_operation_failed() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("dir").unwrap();
    assert_eq!(kind_of(store.delete_file("dir")), ErrorKind::OperationFailed);
    assert!(store.directory_exists("dir").unwrap());
}

#[test]
fn delete_releases_quota() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("blob", &[7u8; 300]).unwrap();
    assert_eq!(store.used_size().unwrap(), 300);
    store.delete_file("blob").unwrap();
    assert_eq!(store.used_size().unwrap(), 0);
}

#[test]
fn deletes_file_in_every_preset() {
    let fx = Fixture::new();
    for preset in PresetScope::ALL {
        let store = fx.open(preset);
        drop(
            store
                .open_file("DeleteFile_DeletesFile", FileMode::Create, FileAccess::ReadWrite)
                .unwrap(),
        );
        assert!(store.file_exists("DeleteFile_DeletesFile").unwrap());
        store.delete_file("DeleteFile_DeletesFile").unwrap();
        assert!(!store.file_exists("DeleteFile_DeletesFile").unwrap(), "{preset}");
    }
}
