//! `RUSTFLAGS` for cross-compiling inside the build image.
//!
//! The build image carries Debian's cross gcc toolchains. Each supported
//! foreign target needs the matching linker and rpath-link directories so
//! that libraries from the sysroot resolve at link time.

use crate::consts::SYSROOT_DIR;

/// Return the `RUSTFLAGS` value for `target`.
///
/// Native and unrecognised targets get an empty string.
pub fn rust_flags(target: &str) -> String {
  let Some((linker, multiarch)) = cross_linker(target) else {
    return String::new();
  };

  [
    format!("-C linker={}", linker),
    format!("-C link-args=-Wl,-rpath-link,/usr/{}/lib", multiarch),
    format!("-C link-args=-Wl,-rpath-link,{}/usr/lib/{}", SYSROOT_DIR, multiarch),
  ]
  .join(" ")
}

/// Linker binary and Debian multiarch tuple for a cross target.
fn cross_linker(target: &str) -> Option<(&'static str, &'static str)> {
  match target {
    "aarch64-unknown-linux-gnu" => Some(("aarch64-linux-gnu-gcc", "aarch64-linux-gnu")),
    "armv7-unknown-linux-gnueabihf" | "arm-unknown-linux-gnueabihf" => {
      Some(("arm-linux-gnueabihf-gcc", "arm-linux-gnueabihf"))
    }
    "arm-unknown-linux-gnueabi" => Some(("arm-linux-gnueabi-gcc", "arm-linux-gnueabi")),
    _ => None,
  }
}
