//! Integration tests for configuration loading.

#![cfg(feature = "config")]

mod common;

use schism_ffi::call::Narrowing;
use schism_ffi::config::{ConfigError, FfiConfig};
use schism_ffi::platform::Platform;

use common::write_temp;

#[test]
fn load_config_from_file() {
    let (_dir, path) = write_temp(
        "schism.toml",
        r#"
[marshal]
narrowing = "wrap"

[memory_stack]
size = 65536
alignment = 16

[platform]
pointer_width = 8
long_width = 4
"#,
    );
    let config = FfiConfig::from_file(&path).unwrap();
    assert_eq!(config.marshal.narrowing, Narrowing::Wrap);
    assert_eq!(config.platform().unwrap(), Platform::LLP64);

    let stack = config.memory_stack().unwrap();
    assert_eq!(stack.size(), 65536);
    assert_eq!(stack.available(), 65536);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = FfiConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn config_errors_convert_into_the_unified_error() {
    let err: schism_ffi::Error = FfiConfig::from_str("[marshal\n").unwrap_err().into();
    assert!(err.is_config());
}
