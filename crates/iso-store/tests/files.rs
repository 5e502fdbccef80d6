//! File operations: open modes, whole-file I/O, copy, move and enumeration.

mod common;

use std::io::{Read, Seek, SeekFrom, Write};

use common::{kind_of, Fixture};
use iso_store::{iso_error, ErrorKind, FileAccess, FileMode, IsoResult, IsolatedStore};

// ─── open_file ──────────────────────────────────────────────────────

#[test]
fn create_new_refuses_an_existing_file() {
    let fx = Fixture::new();
    let store = fx.store();
    drop(store.open_file("f", FileMode::CreateNew, FileAccess::Write).unwrap());
    assert_eq!(
        kind_of(store.open_file("f", FileMode::CreateNew, FileAccess::Write)),
        ErrorKind::OperationFailed
    );
}

#[test]
fn open_and_truncate_require_an_existing_file() {
    let fx = Fixture::new();
    let store = fx.store();
    for mode in [FileMode::Open, FileMode::Truncate] {
        assert_eq!(
            kind_of(store.open_file("absent", mode, FileAccess::ReadWrite)),
            ErrorKind::OperationFailed,
            "{mode:?}"
        );
    }
    assert!(!store.file_exists("absent").unwrap());
}

#[test]
fn open_or_create_read_only_creates_an_empty_file() {
    let fx = Fixture::new();
    let store = fx.store();
    let mut stream = store
        .open_file("fresh", FileMode::OpenOrCreate, FileAccess::Read)
        .unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).unwrap();
    assert!(buf.is_empty());
    assert!(store.file_exists("fresh").unwrap());
}

#[test]
fn writing_modes_reject_read_only_access_first() {
    let fx = Fixture::new();
    let store = fx.store();
    store.dispose();
    for mode in [FileMode::CreateNew, FileMode::Create, FileMode::Truncate, FileMode::Append] {
        assert_eq!(
            kind_of(store.open_file("f", mode, FileAccess::Read)),
            ErrorKind::InvalidArgument,
            "{mode:?}"
        );
    }
}

#[test]
fn create_truncates_existing_content() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("f", b"old content").unwrap();
    let mut stream = store.create_file("f").unwrap();
    stream.write_all(b"new").unwrap();
    drop(stream);
    assert_eq!(store.read_file("f").unwrap(), b"new");
}

#[test]
fn open_preserves_content_and_supports_seek() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("f", b"abcdef").unwrap();
    let mut stream = store.open_file("f", FileMode::Open, FileAccess::ReadWrite).unwrap();
    stream.seek(SeekFrom::Start(2)).unwrap();
    stream.write_all(b"XY").unwrap();
    stream.seek(SeekFrom::Start(0)).unwrap();
    let mut text = String::new();
    stream.read_to_string(&mut text).unwrap();
    assert_eq!(text, "abXYef");
    assert_eq!(stream.len().unwrap(), 6);
}

#[test]
fn access_is_enforced_on_the_stream() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("f", b"abc").unwrap();

    let mut reader = store.open_file("f", FileMode::Open, FileAccess::Read).unwrap();
    let err = reader.write(b"x").unwrap_err();
    assert_eq!(iso_error(&err).map(|e| e.kind()), Some(ErrorKind::InvalidOperation));
    assert!(reader.set_len(0).is_err());

    let mut writer = store.open_file("f", FileMode::Open, FileAccess::Write).unwrap();
    let mut buf = [0u8; 3];
    let err = writer.read(&mut buf).unwrap_err();
    assert_eq!(iso_error(&err).map(|e| e.kind()), Some(ErrorKind::InvalidOperation));
}

#[test]
fn opening_a_directory_or_the_root_fails() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("d").unwrap();
    assert_eq!(
        kind_of(store.open_file("d", FileMode::OpenOrCreate, FileAccess::ReadWrite)),
        ErrorKind::OperationFailed
    );
    assert_eq!(
        kind_of(store.open_file(".", FileMode::OpenOrCreate, FileAccess::ReadWrite)),
        ErrorKind::OperationFailed
    );
}

#[test]
fn files_need_an_existing_parent() {
    let fx = Fixture::new();
    let store = fx.store();
    assert_eq!(kind_of(store.create_file("missing/f")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.write_file("missing/f", b"x")), ErrorKind::OperationFailed);
    assert!(!store.directory_exists("missing").unwrap());
}

#[test]
fn escaping_paths_are_rejected() {
    let fx = Fixture::new();
    let store = fx.store();
    for raw in ["../outside", "a/../../outside", "/etc/passwd", "C:\\x", "a/C:\\x", "a/C:x"] {
        assert_eq!(kind_of(store.write_file(raw, b"x")), ErrorKind::InvalidPath, "{raw}");
    }
    assert!(!fx.dir.path().join("user").join("outside").exists());
}

type Mutation = fn(&IsolatedStore) -> IsoResult<()>;

#[test]
fn nul_paths_leave_the_store_unchanged() {
    let cases: [(&str, Mutation); 9] = [
        ("create_directory", |s| s.create_directory("d\0ir")),
        ("write_file", |s| s.write_file("f\0", b"payload")),
        ("create_file", |s| s.create_file("new\0").map(drop)),
        ("open_file", |s| {
            s.open_file("src\0", FileMode::OpenOrCreate, FileAccess::Write)
                .map(drop)
        }),
        ("copy_file source", |s| s.copy_file("src\0", "copy", false)),
        ("copy_file destination", |s| s.copy_file("src", "co\0py", true)),
        ("move_file", |s| s.move_file("src", "moved\0")),
        ("move_directory source", |s| s.move_directory("dir\0", "elsewhere")),
        ("move_directory destination", |s| s.move_directory("dir", "else\0where")),
    ];

    for (name, mutation) in cases {
        let fx = Fixture::new();
        let store = fx.store();
        store.create_directory("dir").unwrap();
        store.write_file("src", b"content").unwrap();
        let used = store.used_size().unwrap();
        let files = store.file_names("*").unwrap();
        let dirs = store.directory_names("*").unwrap();

        assert_eq!(kind_of(mutation(&store)), ErrorKind::InvalidPath, "{name}");
        assert_eq!(store.used_size().unwrap(), used, "{name}");
        assert_eq!(store.file_names("*").unwrap(), files, "{name}");
        assert_eq!(store.directory_names("*").unwrap(), dirs, "{name}");
    }
}

// ─── Whole-file I/O ─────────────────────────────────────────────────

#[test]
fn write_read_and_length() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("docs").unwrap();
    store.write_file("docs/readme", b"hello world").unwrap();
    assert_eq!(store.read_file("docs/readme").unwrap(), b"hello world");
    assert_eq!(store.file_length("docs/readme").unwrap(), 11);
    assert_eq!(store.file_length("./docs/../docs/readme").unwrap(), 11);
}

#[test]
fn reading_missing_or_directory_fails() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("d").unwrap();
    assert_eq!(kind_of(store.read_file("nope")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.read_file("d")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.file_length("d")), ErrorKind::OperationFailed);
}

#[test]
fn writing_over_a_directory_fails() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("d").unwrap();
    assert_eq!(kind_of(store.write_file("d", b"x")), ErrorKind::OperationFailed);
    assert!(store.directory_exists("d").unwrap());
}

#[test]
fn directories_cannot_be_created_under_files() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("f", b"x").unwrap();
    assert_eq!(kind_of(store.create_directory("f")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.create_directory("f/sub")), ErrorKind::OperationFailed);
}

// ─── Copy and move ──────────────────────────────────────────────────

#[test]
fn copy_respects_overwrite() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("a", b"first").unwrap();
    store.write_file("b", b"second!").unwrap();
    assert_eq!(kind_of(store.copy_file("a", "b", false)), ErrorKind::OperationFailed);
    assert_eq!(store.read_file("b").unwrap(), b"second!");

    store.copy_file("a", "b", true).unwrap();
    assert_eq!(store.read_file("b").unwrap(), b"first");
    assert_eq!(store.used_size().unwrap(), 10);
}

#[test]
fn copy_edge_cases() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("a", b"x").unwrap();
    store.create_directory("d").unwrap();
    assert_eq!(kind_of(store.copy_file("a", "./a", true)), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.copy_file("a", "d", true)), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.copy_file("missing", "c", false)), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.copy_file("", "c", false)), ErrorKind::InvalidArgument);
    assert_eq!(kind_of(store.copy_file("a", "", false)), ErrorKind::InvalidArgument);
    assert_eq!(kind_of(store.copy_file("a", "../c", false)), ErrorKind::InvalidPath);
    store.copy_file("a", "d/a", false).unwrap();
    assert_eq!(store.read_file("d/a").unwrap(), b"x");
}

#[test]
fn move_file_requires_a_vacant_destination() {
    let fx = Fixture::new();
    let store = fx.store();
    store.write_file("a", b"1").unwrap();
    store.write_file("b", b"2").unwrap();
    assert_eq!(kind_of(store.move_file("a", "b")), ErrorKind::OperationFailed);
    store.create_directory("d").unwrap();
    store.move_file("a", "d/a").unwrap();
    assert!(!store.file_exists("a").unwrap());
    assert_eq!(store.read_file("d/a").unwrap(), b"1");
    assert_eq!(kind_of(store.move_file("d", "e")), ErrorKind::OperationFailed);
}

#[test]
fn move_directory_carries_its_tree() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("src/inner").unwrap();
    store.write_file("src/inner/f", b"x").unwrap();
    store.move_directory("src", "dst").unwrap();
    assert!(!store.directory_exists("src").unwrap());
    assert_eq!(store.read_file("dst/inner/f").unwrap(), b"x");
}

#[test]
fn move_directory_rejects_bad_targets() {
    let fx = Fixture::new();
    let store = fx.store();
    store.create_directory("a/b").unwrap();
    store.create_directory("c").unwrap();
    store.write_file("f", b"x").unwrap();
    assert_eq!(kind_of(store.move_directory("a", "a/b/z")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.move_directory("a", "c")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.move_directory(".", "z")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.move_directory("f", "z")), ErrorKind::OperationFailed);
    assert_eq!(kind_of(store.move_directory("missing", "z")), ErrorKind::OperationFailed);
}

// ─── Enumeration ────────────────────────────────────────────────────

fn populated(fx: &Fixture) -> iso_store::IsolatedStore {
    let store = fx.store();
    store.create_directory("logs/old").unwrap();
    store.create_directory("cache").unwrap();
    for name in ["a.txt", "b.txt", "c.bin", "logs/1.log", "logs/2.log", "logs/notes.txt"] {
        store.write_file(name, b"-").unwrap();
    }
    store
}

#[test]
fn star_lists_every_file_at_the_root() {
    let fx = Fixture::new();
    let store = populated(&fx);
    assert_eq!(store.file_names("*").unwrap(), vec!["a.txt", "b.txt", "c.bin"]);
    assert_eq!(store.directory_names("*").unwrap(), vec!["cache", "logs"]);
}

#[test]
fn patterns_filter_the_last_segment() {
    let fx = Fixture::new();
    let store = populated(&fx);
    assert_eq!(store.file_names("*.txt").unwrap(), vec!["a.txt", "b.txt"]);
    assert_eq!(store.file_names("?.bin").unwrap(), vec!["c.bin"]);
    assert_eq!(store.file_names("logs/*.log").unwrap(), vec!["1.log", "2.log"]);
    assert_eq!(store.directory_names("logs/*").unwrap(), vec!["old"]);
    assert_eq!(store.file_names("a.txt").unwrap(), vec!["a.txt"]);
}

#[test]
fn matching_is_case_sensitive() {
    let fx = Fixture::new();
    let store = populated(&fx);
    assert!(store.file_names("*.TXT").unwrap().is_empty());
}

#[test]
fn missing_directory_lists_nothing() {
    let fx = Fixture::new();
    let store = populated(&fx);
    assert!(store.file_names("nowhere/*").unwrap().is_empty());
    assert!(store.file_names("a.txt/*").unwrap().is_empty());
}

#[test]
fn wildcards_before_the_last_segment_are_invalid() {
    let fx = Fixture::new();
    let store = populated(&fx);
    assert_eq!(kind_of(store.file_names("lo*/1.log")), ErrorKind::InvalidPath);
    assert_eq!(kind_of(store.directory_names("?/x")), ErrorKind::InvalidPath);
}

#[test]
fn enumeration_cannot_escape() {
    let fx = Fixture::new();
    let store = populated(&fx);
    assert_eq!(kind_of(store.file_names("../*")), ErrorKind::InvalidPath);
    assert_eq!(kind_of(store.file_names("")), ErrorKind::InvalidArgument);
}
