//! telar - minimal-pair benchmark compilation CLI
//!
//! Usage:
//!   telar templates --contexts-dir config/contexts \
//!       --concepts-dir config/concepts --targets-dir config/targets \
//!       --templates-dir output/templates
//!   telar dataset --templates-dir output/templates \
//!       --fillers-dir config/fillers --dataset-dir output/dataset \
//!       --fix-fillers --version 0

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use telar::metatemplate::{merge_context_target, MetaTemplateCompiler};
use telar::sampler::SampleOptions;
use telar::suite::{compile_filter, compile_slot_transforms, Dataset};

mod fingerprint;
mod loader;

use fingerprint::DatasetConfig;

/// telar - compile minimal-pair benchmark templates and datasets.
#[derive(Parser)]
#[command(name = "telar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile concepts, targets, and contexts into template tables
    Templates {
        /// Directory of `context-<domain>-<subdomain>.yml` files
        #[arg(long, value_name = "DIR")]
        contexts_dir: PathBuf,

        /// Directory of `concept-<domain>-<subdomain>.yml` files
        #[arg(long, value_name = "DIR")]
        concepts_dir: PathBuf,

        /// Directory of `target-<domain>-<subdomain>.yml` files
        #[arg(long, value_name = "DIR")]
        targets_dir: PathBuf,

        /// Output directory for compiled template tables
        #[arg(long, value_name = "DIR")]
        templates_dir: PathBuf,

        /// Only process domains whose file stem contains this substring
        #[arg(long)]
        domain: Option<String>,

        /// Also write the merged long-format view under `assembled/`
        #[arg(long)]
        assembled: bool,
    },

    /// Resolve template tables against filler lexicons into test suites
    Dataset {
        /// Directory of compiled `template-*.csv` files
        #[arg(long, value_name = "DIR")]
        templates_dir: PathBuf,

        /// Directory of `filler-*.csv` lexicon files
        #[arg(long, value_name = "DIR")]
        fillers_dir: PathBuf,

        /// Output directory root for resolved datasets
        #[arg(long, value_name = "DIR")]
        dataset_dir: PathBuf,

        /// Substitution combinations per template row
        #[arg(long, default_value_t = 1)]
        num_fillers: usize,

        /// Use one fixed substitution per slot across all templates
        /// (requires --num-fillers 1)
        #[arg(long)]
        fix_fillers: bool,

        /// Comma-separated slot transforms, e.g. `agent->profession`
        #[arg(long, default_value = "")]
        swap_fillers: String,

        /// Regular expression filtering resolved rows by ItemTags
        #[arg(long, default_value = "")]
        filter: String,

        /// Dataset version: skip window in fixed mode, RNG seed otherwise
        #[arg(long, default_value_t = 0)]
        version: u64,

        /// Name of the dataset under the output root
        #[arg(long, default_value = "telar_custom")]
        custom_id: String,

        /// Output encoding for suite tables
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Templates {
            contexts_dir,
            concepts_dir,
            targets_dir,
            templates_dir,
            domain,
            assembled,
        } => run_templates(
            &contexts_dir,
            &concepts_dir,
            &targets_dir,
            &templates_dir,
            domain.as_deref(),
            assembled,
        ),
        Commands::Dataset {
            templates_dir,
            fillers_dir,
            dataset_dir,
            num_fillers,
            fix_fillers,
            swap_fillers,
            filter,
            version,
            custom_id,
            format,
        } => run_dataset(
            &templates_dir,
            &fillers_dir,
            &dataset_dir,
            &DatasetConfig {
                num_fillers,
                fix_fillers,
                swap_fillers,
                filter,
                version,
            },
            &custom_id,
            format,
        ),
    }
}

/// Compile every domain's meta-templates into template tables.
///
/// A domain with a structurally missing concept or target file fails alone;
/// unrelated domains proceed. Per-meta-template specification errors are
/// aggregated and reported at the end.
fn run_templates(
    contexts_dir: &Path,
    concepts_dir: &Path,
    targets_dir: &Path,
    templates_dir: &Path,
    domain_filter: Option<&str>,
    assembled: bool,
) -> Result<()> {
    let context_files = loader::list_files(contexts_dir, "context-")?;
    if context_files.is_empty() {
        bail!("no context files found in {}", contexts_dir.display());
    }
    fs::create_dir_all(templates_dir)
        .with_context(|| format!("creating {}", templates_dir.display()))?;

    let mut processed = 0usize;
    let mut failed_domains: BTreeSet<String> = BTreeSet::new();
    let mut metatemplate_errors = 0usize;

    for context_file in context_files {
        let stem = context_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        if domain_filter.is_some_and(|d| !stem.contains(d)) {
            continue;
        }
        processed += 1;
        info!(file = %context_file.display(), "processing domain");

        match compile_domain(&context_file, &stem, concepts_dir, targets_dir) {
            Ok((table, assembled_table, errors)) => {
                metatemplate_errors += errors;
                if table.is_empty() {
                    warn!(domain = stem.as_str(), "no output generated");
                    continue;
                }
                let out = templates_dir.join(format!("{}.csv", table.identifier()));
                fs::write(&out, table.to_csv_string())
                    .with_context(|| format!("writing {}", out.display()))?;
                info!(rows = table.len(), file = %out.display(), "templates written");

                if assembled {
                    let dir = templates_dir.join("assembled");
                    fs::create_dir_all(&dir)
                        .with_context(|| format!("creating {}", dir.display()))?;
                    let table = assembled_table;
                    let out = dir.join(format!("{}.csv", table.identifier()));
                    fs::write(&out, table.to_csv_string())
                        .with_context(|| format!("writing {}", out.display()))?;
                    info!(rows = table.len(), file = %out.display(), "assembled view written");
                }
            }
            Err(e) => {
                error!(domain = stem.as_str(), "failed to process domain: {e:#}");
                failed_domains.insert(stem);
            }
        }
    }

    info!(
        processed,
        failed = failed_domains.len(),
        skipped_metatemplates = metatemplate_errors,
        ?failed_domains,
        "template compilation finished"
    );
    Ok(())
}

fn compile_domain(
    context_file: &Path,
    stem: &str,
    concepts_dir: &Path,
    targets_dir: &Path,
) -> Result<(telar::table::Table, telar::table::Table, usize)> {
    let (domain, subdomain) = loader::domain_of_stem(stem)?;
    let domain_key = format!("{domain}-{subdomain}");

    let concepts =
        loader::load_concepts(&concepts_dir.join(format!("concept-{domain_key}.yml")))?;
    let targets = loader::load_targets(
        &targets_dir.join(format!("target-{domain_key}.yml")),
        &domain_key,
    )?;
    let specs = loader::load_metatemplates(context_file)?;

    let mut compiler = MetaTemplateCompiler::new(domain, subdomain);
    let outcome = compiler.compile(&specs, &concepts, &targets);
    for e in &outcome.errors {
        warn!(domain = domain_key.as_str(), "{e}");
    }
    let assembled = merge_context_target(&outcome.table);
    Ok((outcome.table, assembled, outcome.errors.len()))
}

/// Resolve compiled templates against filler lexicons and persist the
/// resulting suites under a configuration-fingerprinted directory.
fn run_dataset(
    templates_dir: &Path,
    fillers_dir: &Path,
    dataset_dir: &Path,
    config: &DatasetConfig,
    custom_id: &str,
    format: OutputFormat,
) -> Result<()> {
    if config.fix_fillers && config.num_fillers != 1 {
        bail!("if --fix-fillers is enabled, --num-fillers must be 1");
    }

    let template_files = loader::list_files(templates_dir, "template-")?;
    if template_files.is_empty() {
        bail!("no template files found in {}", templates_dir.display());
    }
    let filler_files = loader::list_files(fillers_dir, "filler-")?;
    if filler_files.is_empty() {
        bail!("no filler files found in {}", fillers_dir.display());
    }

    let templates = template_files
        .iter()
        .map(|p| loader::load_template_table(p))
        .collect::<Result<Vec<_>>>()?;
    let mut fillers = BTreeMap::new();
    for path in &filler_files {
        let table = loader::load_filler_table(path)?;
        fillers.insert(table.name().to_string(), table);
    }

    let transforms = compile_slot_transforms(&config.swap_fillers)?;
    let filter = compile_filter(&config.filter)?;
    let options = SampleOptions {
        num_fillers: config.num_fillers,
        fix_fillers: config.fix_fillers,
        version: config.version,
    };

    let dataset = Dataset::compile(templates, &fillers, &options, &transforms, filter.as_ref());
    for e in &dataset.errors {
        warn!("{e}");
    }

    let outdir = dataset_dir.join(custom_id).join(config.id());
    fs::create_dir_all(&outdir).with_context(|| format!("creating {}", outdir.display()))?;
    for suite in &dataset.suites {
        let (file, contents) = match format {
            OutputFormat::Csv => (
                outdir.join(format!("{}.csv", suite.identifier())),
                suite.to_csv_string(),
            ),
            OutputFormat::Json => (
                outdir.join(format!("{}.json", suite.identifier())),
                serde_json::to_string_pretty(&loader::suite_to_json(suite))
                    .context("serializing suite to JSON")?,
            ),
        };
        fs::write(&file, contents).with_context(|| format!("writing {}", file.display()))?;
        info!(rows = suite.len(), file = %file.display(), "suite written");
    }
    info!(
        suites = dataset.suites.len(),
        skipped = dataset.errors.len(),
        dir = %outdir.display(),
        "dataset saved"
    );
    Ok(())
}
