use clap::{Parser, Subcommand};
use image_chain::config::{self, Config};
use image_chain::output;
use image_chain::plugin::PluginRegistry;
use image_chain::process::{self, Recipe};
use image_chain::recipe::Step;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

/// Steps given on the command line.
#[derive(clap::Args, Clone)]
struct StepArgs {
    /// Operation to apply, repeatable, in order. Replaces the config's [[steps]].
    #[arg(long = "step", value_name = "STEP")]
    steps: Vec<Step>,
}

impl StepArgs {
    fn or_config(self, config: &Config) -> Vec<Step> {
        if self.steps.is_empty() {
            config.steps.clone()
        } else {
            self.steps
        }
    }
}

#[derive(Parser)]
#[command(name = "image-chain")]
#[command(about = "Chainable resize, crop and effect pipeline for JPEG, PNG and GIF")]
#[command(long_about = "\
Chainable resize, crop and effect pipeline for JPEG, PNG and GIF

Images keep their format: a PNG is written as a PNG whatever the output name.

Steps:

  resize=100x45                    # keep ratio; landscape: width governs
  resize=200x   resize=x90         # one bound
  crop=100x100@tl                  # exact size, anchored by gravity
  adaptive-resize=200x200@mc       # resize then crop to exactly 200x200
  reflection=40,40,80,true,#a4a4a4 # any other name runs a plugin

Gravity codes: tl tc tr ml mc mr bl bc br (default mc).

Steps come from --step (repeatable) or from [[steps]] in image-chain.toml.
Run 'image-chain gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file [default: ./image-chain.toml when present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every pipeline operation to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the format and size of an image
    Identify {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the steps on one image
    Apply {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        steps: StepArgs,
    },
    /// Run the steps on every image under a directory, in parallel
    Batch {
        source: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        steps: StepArgs,
        /// Print the summary as JSON instead of progress lines
        #[arg(long)]
        json: bool,
    },
    /// List the registered plugins
    Plugins,
    /// Print a stock image-chain.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = PluginRegistry::with_builtins();

    match cli.command {
        Command::Identify { file, json } => {
            let config = load_config(cli.config.as_deref())?;
            let info = process::identify(config.backend(), &file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                output::print_identify(&info);
            }
        }
        Command::Apply {
            input,
            output: destination,
            steps,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let steps = steps.or_config(&config);
            let recipe = Recipe::from_config(&config, &steps, &registry);
            let report = process::process_file(&input, &destination, &recipe)?;
            output::print_apply(&report, &steps);
        }
        Command::Batch {
            source,
            output: destination,
            steps,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let steps = steps.or_config(&config);
            let recipe = Recipe::from_config(&config, &steps, &registry);
            init_thread_pool(&config.processing);

            let summary = if json {
                process::process_dir(&source, &destination, &recipe, None)?
            } else {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_process_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let summary = process::process_dir(&source, &destination, &recipe, Some(tx))?;
                printer
                    .join()
                    .map_err(|_| "progress printer thread panicked")?;
                summary
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_batch_summary(&summary);
            }
            if !summary.failed.is_empty() {
                return Err(format!(
                    "{} of {} images failed",
                    summary.failed.len(),
                    summary.total()
                )
                .into());
            }
        }
        Command::Plugins => {
            output::print_plugins(&registry.names());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `--config` must exist; the default file is optional.
fn load_config(explicit: Option<&Path>) -> Result<Config, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Log to stderr. `RUST_LOG` wins unless `--verbose` is given.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("image_chain=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "image_chain=warn".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
