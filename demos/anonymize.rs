use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::Result;
use fm_rs::format::FeatureModelFormat;
use fm_rs::model::FeatureModel;
use fm_rs::obfuscator::{random_salt, FeatureModelObfuscator, ObfuscatorConfig};
use fm_rs::uvl::UvlFormat;

#[derive(Parser)]
#[command(author, version, about = "Read UVL feature models and anonymize them")]
struct Cli {
    /// More logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the feature tree and constraints of a model
    Show {
        /// UVL file
        input: PathBuf,
    },

    /// Print the anonymized feature tree and constraints of a model
    Anonymize {
        /// UVL file
        input: PathBuf,

        /// Salt for the pseudonyms
        #[arg(long, conflicts_with = "random_salt")]
        salt: Option<String>,

        /// Draw a fresh salt from the OS random number generator
        #[arg(long)]
        random_salt: bool,

        /// Pseudonyms have 4 * FACTOR characters after the tag
        #[arg(long, value_name = "FACTOR", default_value_t = 8)]
        length_factor: usize,
    },

    /// Print a fresh random salt
    Salt,
}

/// Imports `a.b.C` are looked up as `<dir>/a/b/C.uvl`.
fn load_import(namespace: &str, base_dir: &Path) -> Option<String> {
    let mut path = base_dir.join(namespace.replace('.', "/"));
    path.set_extension("uvl");
    match std::fs::read_to_string(&path) {
        Ok(source) => Some(source),
        Err(e) => {
            log::warn!("Cannot read import {}: {}", path.display(), e);
            None
        }
    }
}

fn read_model(input: &Path) -> Result<FeatureModel> {
    log::info!("Loading feature model from {:?}", input);
    let source = std::fs::read_to_string(input)?;
    let mut model = FeatureModel::new();
    let problems = UvlFormat::new()
        .with_loader(load_import)
        .read_with_path(&mut model, &source, input);
    for problem in &problems {
        eprintln!("{}", problem);
    }
    if problems.contains_error() {
        return Err(color_eyre::eyre::eyre!("{} has errors", input.display()));
    }
    log::info!(
        "Loaded model with {} features and {} constraints",
        model.num_features(),
        model.num_constraints()
    );
    Ok(model)
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    match cli.command {
        Commands::Show { input } => {
            let model = read_model(&input)?;
            print!("{}", model.debug_string());
        }

        Commands::Anonymize {
            input,
            salt,
            random_salt: use_random,
            length_factor,
        } => {
            let model = read_model(&input)?;
            let salt = match (salt, use_random) {
                (Some(salt), _) => salt,
                (None, true) => random_salt(),
                (None, false) => {
                    log::warn!("No salt given; pseudonyms can be guessed from common feature names");
                    String::new()
                }
            };
            let config = ObfuscatorConfig::default().with_salt(salt).with_length_factor(length_factor);
            let anonymized = FeatureModelObfuscator::new(&model).with_config(config).execute()?;
            print!("{}", anonymized.debug_string());
        }

        Commands::Salt => {
            println!("{}", random_salt());
        }
    }

    Ok(())
}
