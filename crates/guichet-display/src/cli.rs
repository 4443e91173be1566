use clap::Parser;

use crate::config::{get_config_dir, get_data_dir};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Display identifier, as found in the display's public URL
    #[arg(value_name = "DISPLAY_ID")]
    pub display: String,

    /// Tenant slug; persisted so subsequent launches can omit it
    #[arg(short = 'T', long, value_name = "SLUG")]
    pub tenant: Option<String>,

    /// Server URL
    #[arg(
        short,
        long,
        value_name = "URL",
        default_value = "http://127.0.0.1:3000"
    )]
    pub server: String,

    /// Tick rate, i.e. number of ticks per second (drives the wall clock)
    #[arg(short, long, value_name = "FLOAT", default_value_t = 1.0)]
    pub tick_rate: f64,

    /// Frame rate, i.e. number of frames per second
    #[arg(short, long, value_name = "FLOAT", default_value_t = 4.0)]
    pub frame_rate: f64,
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = get_config_dir().display().to_string();
    let data_dir_path = get_data_dir().display().to_string();

    format!(
        "\
guichet-display

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
