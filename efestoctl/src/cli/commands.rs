//! CLI argument and command definitions

use clap::Parser;
use efesto_core::{EfestoError, Result};

/// Efesto heater control CLI
#[derive(Parser, Debug)]
#[command(name = "efestoctl")]
#[command(version, about = "Efesto heater control CLI", long_about = None)]
pub struct Cli {
    /// Command to execute: set_power, set_heater_on_off or get_state
    pub command: String,

    /// Command argument: power level for set_power, "on"/"off" for
    /// set_heater_on_off; ignored by get_state
    pub argument: Option<String>,

    /// Portal URL (overrides config file)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/efesto/cli.toml)
    #[arg(long)]
    pub config: Option<String>,
}

/// Heater power switch argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// A validated device operation.
///
/// The command name is kept as a free-form positional so an unsupported name
/// turns into an error outcome here, before any network activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the heater power level
    SetPower { level: u32 },
    /// Switch the heater on or off
    SetHeaterOnOff { state: OnOff },
    /// Query the current device state
    GetState,
}

impl Command {
    /// Map a command name and optional argument to an operation.
    ///
    /// `get_state` ignores a supplied argument; the other two require one.
    pub fn parse(name: &str, argument: Option<&str>) -> Result<Self> {
        match name {
            "set_power" => {
                let arg = argument.ok_or_else(|| {
                    EfestoError::InvalidInput("set_power requires a power level".to_string())
                })?;
                let level = arg.parse::<u32>().map_err(|_| {
                    EfestoError::InvalidInput(format!("invalid power level '{}'", arg))
                })?;
                Ok(Self::SetPower { level })
            }
            "set_heater_on_off" => match argument {
                Some("on") => Ok(Self::SetHeaterOnOff { state: OnOff::On }),
                Some("off") => Ok(Self::SetHeaterOnOff { state: OnOff::Off }),
                Some(other) => Err(EfestoError::InvalidInput(format!(
                    "set_heater_on_off requires \"on\" or \"off\", got '{}'",
                    other
                ))),
                None => Err(EfestoError::InvalidInput(
                    "set_heater_on_off requires \"on\" or \"off\"".to_string(),
                )),
            },
            "get_state" => Ok(Self::GetState),
            other => Err(EfestoError::UnsupportedCommand(other.to_string())),
        }
    }

    /// Command name as spelled on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPower { .. } => "set_power",
            Self::SetHeaterOnOff { .. } => "set_heater_on_off",
            Self::GetState => "get_state",
        }
    }

    /// Uppercase label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::SetPower { .. } => "SET POWER",
            Self::SetHeaterOnOff { .. } => "SET HEATER ON/OFF",
            Self::GetState => "GET STATE",
        }
    }

    /// Value of the `method` form field for the action endpoint
    pub fn method(&self) -> String {
        match self {
            Self::SetPower { .. } => "write-parameters-queue".to_string(),
            Self::SetHeaterOnOff { state } => format!("heater-{}", state.as_str()),
            Self::GetState => "get-state".to_string(),
        }
    }

    /// Value of the `params` form field for the action endpoint
    pub fn params(&self) -> String {
        match self {
            Self::SetPower { level } => format!("set-power={}", level),
            Self::SetHeaterOnOff { .. } | Self::GetState => "1".to_string(),
        }
    }

    /// Whether this operation returns a device-state payload on success
    pub fn has_payload(&self) -> bool {
        matches!(self, Self::GetState)
    }
}
