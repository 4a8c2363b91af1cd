/// Base image for every stage.
pub const BASE_IMAGE: &str = "rust:1.89-bullseye";

/// Name of the binary produced by the build stage.
pub const BINARY_NAME: &str = "oh-my-droid";

/// Files packaged next to the binary in the release archive.
pub const PACKAGED_DOCS: &[&str] = &["README.md", "LICENSE"];

pub const DEFAULT_TARGET: &str = "x86_64-unknown-linux-gnu";
pub const DEFAULT_TAG: &str = "latest";

/// Environment variables read at invocation start.
pub const TARGET_ENV: &str = "TARGET";
pub const TAG_ENV: &str = "TAG";
pub const ENGINE_ENV: &str = "OMD_CI_ENGINE";

pub const DEFAULT_ENGINE: &str = "docker";

/// Where the source snapshot lands inside the container.
pub const WORKDIR: &str = "/app";

pub const SYSROOT_DIR: &str = "/build/sysroot";
pub const NATIVE_INCLUDE_PATH: &str = "/usr/include";
pub const CROSS_INCLUDE_PATH: &str = "/build/sysroot/usr/include";

/// Entries never uploaded into a container.
pub const CONTEXT_EXCLUDE: &[&str] = &["target", ".git", ".devbox", ".fluentci"];

// Named cache volumes and their mount points.
pub const TARGET_CACHE: &str = "target";
pub const TARGET_CACHE_PATH: &str = "/app/target";
pub const REGISTRY_CACHE: &str = "registry";
pub const REGISTRY_CACHE_PATH: &str = "/root/cargo/registry";
pub const ASSETS_CACHE: &str = "gh-release-assets";
pub const ASSETS_CACHE_PATH: &str = "/assets";

/// Extra dpkg architectures registered before installing cross toolchains.
pub const FOREIGN_ARCHITECTURES: &[&str] = &["armhf", "arm64"];

/// Cross-compilation toolchains and build libraries installed by the build stage.
pub const CROSS_PACKAGES: &[&str] = &[
  "gcc-arm-linux-gnueabihf",
  "libc6-armhf-cross",
  "libc6-dev-armhf-cross",
  "gcc-aarch64-linux-gnu",
  "libc6-arm64-cross",
  "libc6-dev-arm64-cross",
  "libc6-armel-cross",
  "libc6-dev-armel-cross",
  "binutils-arm-linux-gnueabi",
  "gcc-arm-linux-gnueabi",
  "libncurses5-dev",
  "bison",
  "flex",
  "libssl-dev",
  "bc",
  "pkg-config",
  "libudev-dev",
];
