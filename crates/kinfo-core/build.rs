//! Build script for kinfo-core
//!
//! Checks the minimum Rust version before compilation. The crate uses
//! `let`-`else` and `usize::div_ceil`, which need Rust 1.73.0.

fn main()
{
    let Ok(rustc_version) = rustc_version::version() else {
        // Some build environments hide the compiler version; don't fail there
        println!("cargo:warning=could not verify Rust version");
        return;
    };

    let min_rust_version = rustc_version::Version::new(1, 73, 0);
    assert!(
        rustc_version >= min_rust_version,
        "kinfo-core requires Rust {min_rust_version} or newer, found {rustc_version}"
    );
}
