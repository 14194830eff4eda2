use std::env;
use std::path::PathBuf;

fn main() {
    // OUT_DIR is target/<profile>/build/<pkg>/out; the header goes next to the library
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_default());
    let header_src = "include/lifecycle_core.h";

    if let Some(target_dir) = out_dir.ancestors().nth(3) {
        if std::path::Path::new(header_src).exists() {
            if let Err(e) = std::fs::copy(header_src, target_dir.join("lifecycle_core.h")) {
                println!("cargo:warning=Failed to copy header file: {}", e);
            }
        }
    }

    println!("cargo:rerun-if-changed={}", header_src);
    println!("cargo:rerun-if-changed=migrations/");
}
