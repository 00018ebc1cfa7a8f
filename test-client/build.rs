use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=schema.graphql");

    let schema = std::fs::read_to_string("schema.graphql").expect("read schema.graphql");
    let client = chainql::codegen::generate_from_str(&schema).expect("generate client");
    let out = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR")).join("client.rs");
    std::fs::write(out, client).expect("write client");
}
