use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fitconvert_core::{
    cli::{ActivityCommand, CliArgs, Command, DecodeArgs, OutputArgs, ProjectCommand, ReduceCommand},
    config::{load_settings, Settings},
    convert::{convert, ConvertRequest},
    delivery::DeliveryClient,
    filter::MessageFilter,
    metrics,
    project::{project, ProjectOptions},
    reduce::reduce_json,
    source::{open_path, DecodeOptions},
    units::UnitsMode,
};
use log::{info, warn};

// Eksempel:
// cargo run --bin fitconvert -- activity data/ride.jsonl --uuid 42 -f session record -o out.json

fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();
    let print_metrics = args.print_metrics;

    let result = run(args);
    if print_metrics {
        eprint!("{}", metrics::render());
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref()).context("loading settings")?;
    match args.command {
        Command::Project(cmd) => run_project(&settings, cmd),
        Command::Activity(cmd) => run_activity(&settings, cmd),
        Command::Reduce(cmd) => run_reduce(&settings, cmd),
    }
}

/// CLI-flagg overstyrer innstillingene.
fn decode_options(settings: &Settings, args: &DecodeArgs) -> DecodeOptions {
    let mut opts = settings.decode_options();
    if let Some(crc) = args.crc_check {
        opts.crc_check = crc;
    }
    if args.raw_units {
        opts.units = UnitsMode::Raw;
    }
    opts
}

fn project_options(settings: &Settings, args: &DecodeArgs) -> ProjectOptions {
    let mut opts = settings.project_options();
    if !args.filter.is_empty() {
        opts.filter = args.filter.iter().cloned().collect::<MessageFilter>();
    }
    opts
}

fn write_output(output: &OutputArgs, json: &str) -> Result<()> {
    match &output.out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn run_project(settings: &Settings, cmd: ProjectCommand) -> Result<()> {
    let frames = open_path(&cmd.decode.input, decode_options(settings, &cmd.decode))
        .with_context(|| format!("opening {}", cmd.decode.input.display()))?;
    let mut opts = project_options(settings, &cmd.decode);
    if cmd.keep_definitions {
        opts.suppress_definitions = false;
    }

    let projection = project(frames, &opts);
    if let Some(diag) = &projection.diagnostic {
        warn!("output is truncated: {diag}");
    }
    write_output(&cmd.output, &to_json(&projection.frames, cmd.output.pretty)?)
}

fn run_activity(settings: &Settings, cmd: ActivityCommand) -> Result<()> {
    let frames = open_path(&cmd.decode.input, decode_options(settings, &cmd.decode))
        .with_context(|| format!("opening {}", cmd.decode.input.display()))?;
    let converter = cmd.converter.as_deref().unwrap_or(&settings.converter);
    let request = ConvertRequest {
        activity_id: &cmd.uuid,
        converter,
        project: project_options(settings, &cmd.decode),
    };

    let conversion = convert(frames, &request)?;
    if let Some(diag) = &conversion.diagnostic {
        warn!("activity built from a truncated stream: {diag}");
    }
    write_output(&cmd.output, &to_json(&conversion.summary, cmd.output.pretty)?)?;

    if cmd.deliver {
        let Some(url) = settings.delivery_url.as_deref() else {
            bail!("--deliver needs a delivery URL (settings file or {})", fitconvert_core::config::DELIVERY_URL_ENV);
        };
        DeliveryClient::new(url).post_activity(&conversion.summary)?;
    }
    Ok(())
}

fn run_reduce(settings: &Settings, cmd: ReduceCommand) -> Result<()> {
    if cmd.uuid.trim().is_empty() {
        bail!("--uuid must not be empty");
    }
    let projected = read_to_string(&cmd.input)?;
    let converter = cmd.converter.as_deref().unwrap_or(&settings.converter);
    let summary = reduce_json(&projected, &cmd.uuid, converter)?;
    write_output(&cmd.output, &to_json(&summary, cmd.output.pretty)?)
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
