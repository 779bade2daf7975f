use ansi_term::Color;
use anyhow::Error;
use chrono::Local;
use clap::{Parser, Subcommand};
use hyperview::{
    config, export, init_logging,
    hyperview::{AssetQuery, Client, EntityQuery, Hyperview},
    table,
    upload::{self, Outcome},
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// List and upload assets and sensors through the Hyperview API.
///
/// Credentials are read from CLIENT_ID, CLIENT_SECRET and INSTANCE_URL, which may be set in the
/// environment or in a `.env` file.
#[derive(Parser)]
#[clap(author, version)]
struct Options {
    #[clap(flatten)]
    config: config::Options,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List assets of one type and the sensors attached to each.
    Assets {
        /// Only list assets of type TYPE.
        #[clap(short = 't', long, value_name = "TYPE", default_value = "crac")]
        asset_type: String,

        /// List at most N assets.
        #[clap(short, long, value_name = "N", default_value = "10")]
        limit: u64,

        /// Skip the first N assets.
        #[clap(long, value_name = "N", default_value = "0")]
        after: u64,

        /// Sort order, as a field name prefixed with + or -.
        #[clap(long, default_value = "+Id", allow_hyphen_values = true)]
        sort: String,

        /// Include asset dimensions in the response.
        #[clap(long)]
        include_dimensions: bool,

        /// Don't fetch the sensors of each asset.
        #[clap(long)]
        no_sensors: bool,

        /// Print the response metadata.
        #[clap(long)]
        metadata: bool,
    },
    /// List business entities.
    BusinessEntities {
        /// Skip the first N entities.
        #[clap(long, value_name = "N", default_value = "0")]
        skip: u64,

        /// List at most N entities.
        #[clap(long, value_name = "N", default_value = "100")]
        take: u64,

        /// Print the raw JSON rather than a table.
        #[clap(long)]
        json: bool,
    },
    /// Print and export the sensors of the assets listed in a CSV file.
    ///
    /// The file must have a header row with an AssetId column.
    Sensors {
        /// The CSV file listing assets.
        input: PathBuf,

        /// Write the export file to DIR.
        #[clap(short, long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Create the assets described in a CSV file.
    Upload {
        /// The CSV file describing assets.
        #[clap(short, long)]
        filename: PathBuf,

        /// Look up parents and print payloads without creating anything.
        #[clap(long)]
        dry_run: bool,
    },
}

#[async_std::main]
async fn main() -> ExitCode {
    let opt = Options::parse();
    match run(opt).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", Color::Red.paint("Error:"));
            ExitCode::FAILURE
        }
    }
}

async fn run(opt: Options) -> Result<(), Error> {
    opt.config.load_env()?;
    let level = opt.config.log_level()?;
    init_logging(level);
    tracing::info!("starting application with log level {level}");

    let config = opt.config.config()?;
    let client = Client::connect(&config).await?;

    match opt.command {
        Command::Assets {
            asset_type,
            limit,
            after,
            sort,
            include_dimensions,
            no_sensors,
            metadata,
        } => {
            let query = AssetQuery {
                asset_type,
                include_dimensions,
                after,
                limit,
                sort,
            };
            let page = client.list_assets(&query).await?;
            if metadata {
                println!(
                    "Asset response metadata: {}",
                    serde_json::to_string_pretty(&page.metadata)?
                );
            }
            println!("{}", table::assets(&page.data));

            if !no_sensors {
                for asset in &page.data {
                    tracing::debug!("asset ID: {}, name: {:?}", asset.id, asset.name);
                    let sensors = client.asset_sensors(&asset.id).await?;
                    println!("{}", table::asset_sensors(&asset.id, &sensors));
                }
            }
        }
        Command::BusinessEntities { skip, take, json } => {
            let page = client
                .list_business_entities(&EntityQuery { skip, take })
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page.data)?);
            } else {
                println!("{}", table::business_entities(&page.data));
            }
        }
        Command::Sensors { input, out_dir } => {
            tracing::info!("input filename: {}", input.display());
            let ids = export::read_asset_ids(&input)?;
            let sensors = export::collect_sensors(&client, &ids).await?;
            println!("{}", table::sensors(&sensors));
            let path = export::write_sensor_csv(&out_dir, &sensors, Local::now().naive_local())?;
            println!("Output file written to: {}", path.display());
        }
        Command::Upload { filename, dry_run } => {
            let summary = upload::upload(&client, &filename, dry_run, print_outcome).await?;
            println!(
                "{} created, {} planned, {} failed, {} skipped",
                summary.created, summary.planned, summary.failed, summary.skipped
            );
            if summary.failed > 0 || summary.skipped > 0 {
                return Err(Error::msg("some assets were not created"));
            }
        }
    }

    Ok(())
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("<unprintable: {err}>"))
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Created { payload, response } => {
            println!("-------------------------\nPayload: {}\n", pretty(payload));
            println!("Server Response: {}\n", pretty(response));
        }
        Outcome::Planned { payload } => {
            println!("-------------------------\nPayload: {}\n", pretty(payload));
        }
        Outcome::Failed { name, error } => {
            println!(
                "-------------------------\n{} {name}: {error:#}\n",
                Color::Red.paint("Failed to create asset")
            );
        }
        Outcome::Skipped { row, error } => {
            println!(
                "-------------------------\n{} {row}: {error:#}\n",
                Color::Yellow.paint("Skipped row")
            );
        }
    }
}
