pub const TARGET: &str = "thumbv7em-none-eabihf";
pub const CHIP: &str = "nRF52840_xxAA";
pub const APP_MANIFEST: &str = "crates/psx-pad-app/Cargo.toml";
pub const APP_NAME: &str = "psx-pad-app";
/// Features every firmware build needs.
pub const BASE_FEATURES: &str = "critical-section";

pub fn app_elf(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/{APP_NAME}")
}
