use anyhow::Context;
use clap::Parser;
use log::info;
use sundials::dataset::{DataLayout, Dataset, LatitudeTable};
use sundials::provision::{provision, Provisioned};
use sundials::{evaluate, ExperimentConfig, PlsConfig, ProcrustesConfig};

mod args;
mod svg;

fn provision_command(args: args::ProvisionArgs) -> anyhow::Result<()> {
    let result = provision(&args.url, &args.data, args.sha256.as_deref())
        .with_context(|| format!("failed to provision {}", args.data.display()))?;
    match result {
        Provisioned::AlreadyPresent => info!("{} already provisioned", args.data.display()),
        Provisioned::Extracted { files } => {
            info!("provisioned {} files in {}", files, args.data.display())
        }
    }
    Ok(())
}

fn evaluate_command(args: args::EvaluateArgs) -> anyhow::Result<()> {
    let mut layout = DataLayout::new(&args.data);
    if let Some(samples) = args.samples {
        layout.samples = samples;
    }
    if let Some(reference) = args.reference {
        layout.reference = reference;
    }
    let table = match &args.latitudes {
        Some(path) => LatitudeTable::read(path)
            .with_context(|| format!("failed to read latitudes from {}", path.display()))?,
        None => LatitudeTable::roman(),
    };

    let dataset = Dataset::load(&layout, &table)
        .with_context(|| format!("failed to load dataset from {}", layout.samples.display()))?;

    let config = ExperimentConfig {
        procrustes: ProcrustesConfig {
            scaling: args.procrustes_scaling,
            ..Default::default()
        },
        pls: PlsConfig {
            components: args.pls_components,
            ..Default::default()
        },
        ..Default::default()
    };
    let evaluation = evaluate(&dataset, &config)?;
    println!("{}", evaluation.report);

    if let Some(chart) = args.chart {
        svg::save_chart(&chart, &evaluation.ids, &evaluation.report)
            .with_context(|| format!("failed to write {}", chart.display()))?;
        info!("wrote {}", chart.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = args::Args::parse();
    match args.command {
        args::Commands::Provision(args) => provision_command(args),
        args::Commands::Evaluate(args) => evaluate_command(args),
    }
}
