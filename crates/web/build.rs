//! Build script for the web crate.
//!
//! Fingerprints the static stylesheet and script so templates can append a
//! cache-busting version to their URLs.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Assets covered by the fingerprint, relative to the manifest directory.
const ASSETS: &[&str] = &["static/css/main.css", "static/js/forum.js"];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");

    let mut hasher = Sha256::new();
    for asset in ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());

        match fs::read(&path) {
            Ok(content) => hasher.update(&content),
            Err(e) => {
                println!("cargo:warning=Could not read {asset}: {e}");
                println!("cargo:rustc-env=ASSET_HASH=dev");
                return;
            }
        }
    }

    let hash = format!("{:x}", hasher.finalize());
    let short_hash = hash.get(..8).unwrap_or("dev");

    println!("cargo:rustc-env=ASSET_HASH={short_hash}");
}
