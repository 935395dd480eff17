//! Unit file fixtures.

use std::io;
use std::path::{Path, PathBuf};

/// Body of the stock `hello.service` unit.
pub const HELLO_SERVICE: &str = "\
[Unit]
Description=Hello World

[Service]
ExecStart=/bin/bash -c \"while true; do echo Hello, World!; sleep 1; done\"
";

/// Write a unit file named `name` into `dir`.
pub fn write_unit(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, body)?;
    Ok(path)
}

/// Write `hello.service` into `dir`.
pub fn hello_unit(dir: &Path) -> io::Result<PathBuf> {
    write_unit(dir, "hello.service", HELLO_SERVICE)
}

/// Write the `hello@.service` template into `dir`.
pub fn hello_template(dir: &Path) -> io::Result<PathBuf> {
    write_unit(dir, "hello@.service", HELLO_SERVICE)
}

/// Copy a unit file verbatim.
pub fn copy_unit(dst: &Path, src: &Path) -> io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}

/// Copy a unit file, replacing every `old` with `new` on the way.
///
/// Used to produce a unit with the same name but different contents, which
/// only `--replace` may push over the existing one.
pub fn rewrite_unit(dst: &Path, src: &Path, new: &str, old: &str) -> io::Result<()> {
    let body = std::fs::read_to_string(src)?;
    if !body.contains(old) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} does not contain {old:?}", src.display()),
        ));
    }
    std::fs::write(dst, body.replace(old, new))
}

/// Paths `dir/{prefix}@{i}.service` for `i` in `1..=n`, zero padded to two digits.
pub fn instance_paths(dir: &Path, prefix: &str, n: usize) -> Vec<PathBuf> {
    (1..=n)
        .map(|i| dir.join(format!("{prefix}@{i:02}.service")))
        .collect()
}
