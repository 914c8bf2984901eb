mod build;
mod cli;
mod constants;
mod flash;
mod rtt;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, FirmwareOpts};
use constants::app_elf;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { firmware } => {
            println!("Building firmware...");
            build::build_firmware(&firmware)?;
            println!("Build complete!");
        }
        Commands::Flash { firmware, force } => {
            flash::flash_firmware(&firmware, force)?;
        }
        Commands::Run { firmware } => {
            let firmware = FirmwareOpts { defmt: true, ..firmware };
            flash::flash_firmware(&firmware, false)?;

            println!("Attaching RTT...");
            rtt::run(&app_elf(firmware.release))?;
        }
        Commands::Attach { release } => {
            rtt::run(&app_elf(release))?;
        }
    }

    Ok(())
}
