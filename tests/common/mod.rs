//! Common test utilities and fixtures.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// Declarations for libc functions present in every Unix process.
pub const LIBC_DECLARATIONS: &str = r#"
# integer helpers from <stdlib.h>
abs: (int) -> int
labs: (long) -> long
llabs: (long long) -> long long

# <string.h>
strlen: (const char *) -> size_t
"#;

/// Structs whose layout depends on the width of `long`.
pub const LAYOUT_DECLARATIONS: &str = r#"
struct header {
    tag: u8,
    length: unsigned long,
    checksum: u16
}

struct packet { head: struct header; payload: pointer; flags: i8 }
"#;

/// Write `contents` to a file inside a fresh temporary directory.
///
/// The directory is removed when the returned guard is dropped.
pub fn write_temp(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}
