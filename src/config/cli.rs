//! Command-line argument parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[clap(name = "ble-provision", version, author)]
#[clap(about = "Provision Wi-Fi credentials onto BLE devices")]
pub struct CliArgs {
    /// Emit machine-readable JSON instead of human-readable text
    #[clap(long, global = true)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan for provisionable BLE devices
    Scan {
        /// Scan window in seconds
        #[clap(short, long, default_value = "5")]
        duration: u64,
    },

    /// List Wi-Fi networks visible to a device
    Networks {
        /// Device address, e.g. AA:BB:CC:DD:EE:FF
        #[clap(short, long)]
        device: String,

        /// Proof-of-possession secret
        #[clap(short, long)]
        pop: String,
    },

    /// Send Wi-Fi credentials and wait for the device to connect
    Provision {
        /// Device address, e.g. AA:BB:CC:DD:EE:FF
        #[clap(short, long)]
        device: String,

        /// Proof-of-possession secret
        #[clap(short, long)]
        pop: String,

        /// Network SSID
        #[clap(short, long)]
        ssid: String,

        /// Network passphrase (empty for open networks)
        #[clap(short = 'P', long, default_value = "")]
        passphrase: String,

        /// MQTT broker URI to hand to the device after provisioning
        #[clap(long)]
        mqtt_uri: Option<String>,

        /// Hub API URL to hand to the device after provisioning
        #[clap(long)]
        hub_url: Option<String>,

        /// Connection wait budget in milliseconds
        #[clap(long = "timeout", value_name = "MS", default_value = "30000")]
        timeout_ms: u64,

        /// Connection poll interval in milliseconds
        #[clap(long = "interval", value_name = "MS", default_value = "1000")]
        interval_ms: u64,
    },

    /// Read a device's current Wi-Fi status once
    Status {
        /// Device address, e.g. AA:BB:CC:DD:EE:FF
        #[clap(short, long)]
        device: String,

        /// Proof-of-possession secret
        #[clap(short, long)]
        pop: String,
    },
}
