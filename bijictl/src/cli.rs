use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        help = "Config file to use instead of the default one"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "List shared locations")]
    List {
        #[arg(long, help = "Only show locations with the given text in the name or description")]
        filter: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    #[command(about = "Share a new location")]
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "lat", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long = "long", allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    #[command(
        about="Modify properties of a location",
        group(
            clap::ArgGroup::new("modify")
                .required(true)
                .multiple(true)
                .args(&["name", "description", "latitude", "longitude"]),
        ))]
    Modify {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "lat", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long = "long", allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    #[command(about = "Remove a location")]
    Remove { id: String },
    #[command(about = "Show the marker color for location names")]
    Color {
        #[arg(required = true)]
        names: Vec<String>,
    },
    #[command(about = "Print the markers of all locations as GeoJSON")]
    Geojson,
    #[command(about = "Open an interactive map session")]
    Map,
    #[command(about = "Show the current configuration")]
    Status,
    #[command(about = "Generate shell completions")]
    Completions { shell: Shell },
}
