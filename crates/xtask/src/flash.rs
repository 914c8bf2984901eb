use anyhow::{Context, Result};
use std::process::Command;

use crate::cli::FirmwareOpts;
use crate::constants::{app_elf, CHIP};

pub fn flash_firmware(firmware: &FirmwareOpts, force: bool) -> Result<()> {
    // First build the firmware
    crate::build::build_firmware(firmware)?;

    if force {
        println!("Erasing chip...");
        let mut cmd = Command::new("probe-rs");
        cmd.args(["erase", "--chip", CHIP, "--allow-erase-all"]);
        let status = cmd.status().context("Failed to erase chip")?;
        if !status.success() {
            anyhow::bail!("Failed to erase chip");
        }
    }

    // The settings partition is left alone unless the chip was erased.
    println!("Checking/Flashing App...");
    let mut cmd = Command::new("probe-rs");
    cmd.args([
        "download",
        "--chip",
        CHIP,
        &app_elf(firmware.release),
        "--preverify",
        "--restore-unwritten",
    ]);

    let status = cmd.status().context("Failed to flash application")?;
    if !status.success() {
        anyhow::bail!("Failed to flash application");
    }

    Ok(())
}
