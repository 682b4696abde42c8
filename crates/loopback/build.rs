use std::env;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR");
    cbindgen::generate(crate_dir)
        .expect("loopback header")
        .write_to_file("include/powsybl_loopback.h");
}
