use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(clap::Args, Debug)]
pub struct ProvisionArgs {
    /// Location of the zipped mesh archive.
    #[arg(long)]
    pub url: String,

    /// Expected SHA-256 digest of the archive, in hex.
    #[arg(long)]
    pub sha256: Option<String>,

    /// Directory to unpack the dataset into.
    #[arg(short, long, default_value = "meshes")]
    pub data: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct EvaluateArgs {
    /// Root of a provisioned dataset.
    #[arg(short, long, default_value = "meshes")]
    pub data: PathBuf,

    /// Directory of sample meshes. Defaults to `<data>/Roman`.
    #[arg(long)]
    pub samples: Option<PathBuf>,

    /// Reference mesh. Defaults to `<data>/mean.ply`.
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// `id,latitude` table keyed by sample file stem. Without it the built-in
    /// Roman latitudes are assigned in file name order.
    #[arg(short, long)]
    pub latitudes: Option<PathBuf>,

    /// Write a bar chart of the errors to this SVG file.
    #[arg(short, long)]
    pub chart: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    pub pls_components: usize,

    /// Also remove scale during Procrustes alignment.
    #[arg(long)]
    pub procrustes_scaling: bool,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download and unpack the mesh dataset.
    Provision(ProvisionArgs),
    /// Run the leave-one-out latitude experiment.
    Evaluate(EvaluateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_defaults() {
        let args = Args::try_parse_from(["sundials", "evaluate"]).unwrap();
        let Commands::Evaluate(args) = args.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.data, PathBuf::from("meshes"));
        assert_eq!(args.pls_components, 1);
        assert!(!args.procrustes_scaling);
        assert!(args.chart.is_none());
    }

    #[test]
    fn provision_needs_url() {
        assert!(Args::try_parse_from(["sundials", "provision"]).is_err());
        let args =
            Args::try_parse_from(["sundials", "provision", "--url", "https://host/m.zip"]).unwrap();
        let Commands::Provision(args) = args.command else {
            panic!("expected provision");
        };
        assert_eq!(args.url, "https://host/m.zip");
        assert!(args.sha256.is_none());
    }
}
