use anyhow::{Context, Result};
use std::process::Command;

use crate::constants::CHIP;

/// Uptime, level and message of every defmt frame.
const LOG_FORMAT: &str = "{t} {[{L}]%bold} {s}";

fn attach_args(elf_path: &str) -> Vec<&str> {
    vec!["attach", "--chip", CHIP, "--log-format", LOG_FORMAT, elf_path]
}

pub fn run(elf_path: &str) -> Result<()> {
    let mut cmd = Command::new("probe-rs");
    cmd.args(attach_args(elf_path));

    let status = cmd.status().context("Failed to attach probe-rs")?;

    if !status.success() {
        anyhow::bail!("probe-rs attach failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_names_chip_and_image_last() {
        let args = attach_args("target/app");
        assert_eq!(&args[..3], ["attach", "--chip", "nRF52840_xxAA"]);
        assert_eq!(args.last(), Some(&"target/app"));
    }
}
