// Build script for miraictl - embeds version at compile time

fn main() {
    // Release pipelines may override the crate version
    let version =
        std::env::var("MIRAI_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=MIRAI_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=MIRAI_VERSION");
}
