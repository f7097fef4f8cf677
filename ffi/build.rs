//! Renders `sfrest.h` for C callers into `OUT_DIR`.

use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SFREST_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("sfrest.h"));
        }
        Err(err) => println!("cargo:warning=could not generate sfrest.h: {err}"),
    }
}
