use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about = "psx-pad firmware tasks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the firmware
    Build {
        #[command(flatten)]
        firmware: FirmwareOpts,
    },
    /// Build and flash the firmware
    Flash {
        #[command(flatten)]
        firmware: FirmwareOpts,

        /// Erase the whole chip first, settings included
        #[arg(long)]
        force: bool,
    },
    /// Build with defmt logging, flash, and show the RTT log
    Run {
        #[command(flatten)]
        firmware: FirmwareOpts,
    },
    /// Attach to a running adapter and show its RTT log
    Attach {
        #[arg(long)]
        release: bool,
    },
}

/// How the firmware image is built.
#[derive(Args, Clone, Debug, Default)]
pub struct FirmwareOpts {
    /// Board revision
    #[arg(long, value_enum, default_value_t = Board::R1)]
    pub board: Board,

    /// Serve the USB debug console
    #[arg(long)]
    pub usb: bool,

    /// Log over RTT
    #[arg(long)]
    pub defmt: bool,

    /// defmt filter compiled into the image (DEFMT_LOG)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Further comma-separated app features
    #[arg(long)]
    pub features: Option<String>,

    #[arg(long)]
    pub release: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Board {
    #[default]
    R1,
}

impl Board {
    pub fn feature(self) -> &'static str {
        match self {
            Self::R1 => "r1",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
