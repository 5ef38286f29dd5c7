use std::fs;

fn main() {
    // The compiled-in defaults must always parse, so check them before building
    let config_path = "src/default_config.toml";
    println!("cargo:rerun-if-changed={}", config_path);

    let content = fs::read_to_string(config_path).expect("Failed to read src/default_config.toml");

    if let Err(e) = toml::from_str::<toml::Table>(&content) {
        panic!("Invalid src/default_config.toml: {}", e);
    }
}
