//! Build Script for SensorSphere
//!
//! Protobuf stubs are checked in under `packages/schema-gen/rust/sensorsphere/`
//! so the build only has to emit the coverage cfg.

use std::env;

fn main() {
    // Rerun build script if it changes
    println!("cargo:rerun-if-changed=build.rs");

    // Rerun if the checked-in stubs change
    println!("cargo:rerun-if-changed=../../packages/schema-gen/rust/sensorsphere/");

    // Emit cfg for coverage detection
    // Usage: #[cfg(coverage)] or #[cfg(not(coverage))]
    if env::var("CARGO_LLVM_COV").is_ok()
        || env::var("LLVM_PROFILE_FILE").is_ok()
        || env::var("RUSTFLAGS")
            .map(|f| f.contains("instrument-coverage"))
            .unwrap_or(false)
    {
        println!("cargo:rustc-cfg=coverage");
    }
}
