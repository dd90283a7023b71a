//! Build script for the storefront crate.
//!
//! Hashes the bundled CSS and scripts so templates can version asset URLs.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Assets covered by the hash, relative to the crate root.
const ASSETS: &[&str] = &[
    "static/css/main.css",
    "static/js/player.js",
    "static/js/checkout.js",
    "static/js/toast.js",
];

fn main() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:rustc-env=ASSET_HASH=dev");
        return;
    };

    let mut hasher = Sha256::new();
    for asset in ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());
        match fs::read(&path) {
            Ok(content) => hasher.update(&content),
            Err(e) => println!("cargo:warning=Could not read {asset}: {e}"),
        }
    }

    let hash = format!("{:x}", hasher.finalize());
    let short_hash = hash.get(..8).unwrap_or("dev");
    println!("cargo:rustc-env=ASSET_HASH={short_hash}");
}
