use crate::cli::FirmwareOpts;
use crate::constants::{APP_MANIFEST, BASE_FEATURES, TARGET};
use anyhow::{Context, Result};
use std::process::Command;

pub fn build_firmware(firmware: &FirmwareOpts) -> Result<()> {
    let mut cargo_build = Command::new("cargo");
    cargo_build
        .arg("build")
        .arg("--no-default-features")
        .arg("--manifest-path")
        .arg(APP_MANIFEST)
        .arg("--target")
        .arg(TARGET)
        .args(["--features", &feature_list(firmware)]);

    if firmware.release {
        cargo_build.arg("--release");
    }
    if let Some(level) = firmware.log_level {
        cargo_build.env("DEFMT_LOG", level.as_str());
    }

    let status = cargo_build
        .status()
        .with_context(|| format!("Failed to build {}", APP_MANIFEST))?;

    if !status.success() {
        anyhow::bail!("Build failed for {}", APP_MANIFEST);
    }

    Ok(())
}

fn feature_list(firmware: &FirmwareOpts) -> String {
    let mut features = vec![BASE_FEATURES, firmware.board.feature()];
    if firmware.usb {
        features.push("usb");
    }
    if firmware.defmt {
        features.push("defmt");
    }
    let extra = firmware.features.as_deref().unwrap_or_default();
    features.extend(extra.split(',').map(str::trim).filter(|f| !f.is_empty()));
    features.dedup();
    features.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Board;

    #[test]
    fn base_and_board_features_are_always_enabled() {
        let firmware = FirmwareOpts::default();
        assert_eq!(firmware.board, Board::R1);
        assert_eq!(feature_list(&firmware), "critical-section,r1");
    }

    #[test]
    fn switches_and_extra_features_are_appended() {
        let firmware = FirmwareOpts {
            usb: true,
            defmt: true,
            features: Some(" foo, ,bar".to_owned()),
            ..FirmwareOpts::default()
        };
        assert_eq!(
            feature_list(&firmware),
            "critical-section,r1,usb,defmt,foo,bar"
        );
    }
}
