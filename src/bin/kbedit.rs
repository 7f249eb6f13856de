// Kbedit CLI
// Import, inspect, edit and export Karabiner-Elements configurations from the shell

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use anyhow::{bail, Context};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use kbedit_core::display::{describe_actions, describe_trigger};
#[cfg(feature = "cli")]
use kbedit_core::karabiner::parse_rule_groups;
#[cfg(feature = "cli")]
use kbedit_core::validate::validate_configuration_patch;
#[cfg(feature = "cli")]
use kbedit_core::{
    export_configuration, groups_to_rules, import_configuration, parse_snippet,
    validate_karabiner_json, Assistant, ConfigurationId, ConfigurationPatch, EditSession,
    HeuristicAssistant, ImportOutcome, MemoryStore, Rule, RuleId, Settings, Store,
    ValidationReport,
};

/// Karabiner-Elements configuration editor
#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "kbedit")]
#[command(version)]
#[command(about = "Karabiner-Elements configuration editor", long_about = None)]
struct Args {
    /// Settings file (default: ~/.config/kbedit/settings.toml)
    #[arg(short, long, value_name = "SETTINGS", global = true)]
    settings: Option<PathBuf>,

    /// Store snapshot file (overrides the settings file)
    #[arg(long, value_name = "STORE", global = true)]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List stored configurations
    List,

    /// Import a Karabiner JSON file
    Import {
        file: PathBuf,

        /// Name used when the document carries no title
        #[arg(short, long)]
        name: Option<String>,

        /// Replace the rules of a near-duplicate configuration
        #[arg(long)]
        replace: bool,
    },

    /// Export a configuration as Karabiner JSON
    Export {
        id: ConfigurationId,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the rules of a configuration
    Rules { id: ConfigurationId },

    /// Show key conflicts among enabled rules
    Conflicts { id: ConfigurationId },

    /// Check a Karabiner JSON file without importing it
    Check { file: PathBuf },

    /// Rename a configuration
    Rename { id: ConfigurationId, name: String },

    /// Delete a configuration and its rules
    Delete { id: ConfigurationId },

    /// Renumber rules by the given id order
    Reorder {
        id: ConfigurationId,
        #[arg(required = true)]
        rule_ids: Vec<RuleId>,
    },

    /// Suggest unused key combinations for a task
    Suggest {
        id: ConfigurationId,
        message: String,

        /// Add the suggestion with this index (starting at 1) as a rule
        #[arg(long, value_name = "N")]
        accept: Option<usize>,
    },

    /// Add rules from a JSON snippet (document, rule-group or manipulator)
    AddJson { id: ConfigurationId, file: PathBuf },
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

#[cfg(feature = "cli")]
fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(Settings::load_default()?),
    }
}

#[cfg(feature = "cli")]
fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

#[cfg(feature = "cli")]
fn print_rules(rules: &[Rule]) {
    for rule in rules {
        println!(
            "{:>5} {:>6} {} {}: {} -> {}",
            rule.id,
            rule.order,
            if rule.enabled { "on " } else { "off" },
            rule.description,
            describe_trigger(rule.from_key.as_ref()),
            describe_actions(&rule.to_actions)
        );
    }
}

#[cfg(feature = "cli")]
fn print_report(report: &ValidationReport) {
    println!("{} rules, {} enabled", report.total, report.enabled);
    for conflict in &report.conflicts {
        println!(
            "  conflict: {} bound by {} rules {:?}",
            conflict.key, conflict.count, conflict.rule_ids
        );
    }
    for issue in &report.issues {
        println!("  rule {}: {:?}", issue.rule_id, issue.problem);
    }
    if report.is_clean() {
        println!("No problems found");
    }
}

/// Run one command; returns whether the store changed
#[cfg(feature = "cli")]
fn run(command: Command, store: &MemoryStore, settings: &Settings) -> anyhow::Result<bool> {
    match command {
        Command::List => {
            for configuration in store.all_configurations()? {
                let count = store.rules_for_configuration(configuration.id)?.len();
                println!("{:>5} {} ({} rules)", configuration.id, configuration.name, count);
            }
            Ok(false)
        }

        Command::Import {
            file,
            name,
            replace,
        } => {
            let document = read_json(&file)?;
            let name = name.unwrap_or_else(|| {
                file.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Imported configuration".to_string())
            });

            let options = settings.import_options();
            match import_configuration(store, &name, &document, replace, &options)? {
                ImportOutcome::Imported {
                    configuration,
                    rules,
                    replaced,
                } => {
                    let verb = if replaced { "Replaced" } else { "Imported" };
                    println!(
                        "{} configuration {} ({}) with {} rules",
                        verb,
                        configuration.id,
                        configuration.name,
                        rules.len()
                    );
                    Ok(true)
                }
                ImportOutcome::Conflict { existing } => bail!(
                    "configuration {} ({}) looks like the same configuration; pass --replace to overwrite it",
                    existing.id,
                    existing.name
                ),
            }
        }

        Command::Export { id, output } => {
            let document = export_configuration(store, id)?;
            let text = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported configuration {} to {}", id, path.display());
                }
                None => println!("{}", text),
            }
            Ok(false)
        }

        Command::Rules { id } => {
            let mut session = EditSession::new(store);
            session.select(id)?;
            print_rules(&session.rules()?);
            Ok(false)
        }

        Command::Conflicts { id } => {
            let mut session = EditSession::new(store);
            session.select(id)?;
            print_report(&session.report()?);
            Ok(false)
        }

        Command::Check { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let document = validate_karabiner_json(&text)?;
            let raw = document
                .get("rules")
                .and_then(serde_json::Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let groups = parse_rule_groups(raw);
            println!("{} rule-groups", groups.len());

            // number the flattened rules so issues can point at them
            let rules: Vec<Rule> = groups_to_rules(0, &groups)
                .into_iter()
                .zip(1..)
                .map(|(new, id)| Rule::from_new(id, new))
                .collect();
            print_report(&ValidationReport::build(&rules));
            Ok(false)
        }

        Command::Rename { id, name } => {
            let patch = ConfigurationPatch::rename(name);
            validate_configuration_patch(&patch)?;
            let Some(configuration) = store.update_configuration(id, patch)? else {
                bail!("configuration {} not found", id);
            };
            println!("Renamed configuration {} to {}", id, configuration.name);
            Ok(true)
        }

        Command::Delete { id } => {
            if !store.delete_configuration(id)? {
                bail!("configuration {} not found", id);
            }
            println!("Deleted configuration {}", id);
            Ok(true)
        }

        Command::Reorder { id, rule_ids } => {
            let mut session = EditSession::new(store);
            session.select(id)?;
            session.reorder(&rule_ids)?;
            print_rules(&session.rules()?);
            Ok(true)
        }

        Command::Suggest {
            id,
            message,
            accept,
        } => {
            let mut session = EditSession::new(store);
            session.select(id)?;
            let reply = HeuristicAssistant::new().suggest(&message, &session.rules()?)?;

            println!("{}", reply.text);
            for (index, suggestion) in reply.suggestions.iter().enumerate() {
                println!(
                    "  {}. {} - {}",
                    index + 1,
                    suggestion.combination,
                    suggestion.reasoning
                );
            }

            let Some(index) = accept else {
                return Ok(false);
            };
            let Some(suggestion) = index.checked_sub(1).and_then(|i| reply.suggestions.get(i))
            else {
                bail!("no suggestion number {}", index);
            };
            let rule = session.accept_suggestion(suggestion)?;
            println!("Added rule {} for {}", rule.id, suggestion.combination);
            Ok(true)
        }

        Command::AddJson { id, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let groups = parse_snippet(&text)?;

            let mut session = EditSession::new(store);
            session.select(id)?;
            let added = session.accept_groups(&groups)?;
            println!("Added {} rules to configuration {}", added.len(), id);
            Ok(true)
        }
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = load_settings(args.settings.as_deref())?;
    let store_path = args
        .store
        .clone()
        .or_else(|| settings.store_path())
        .context("no store path configured and no data directory available")?;

    let store = MemoryStore::load_or_default(&store_path)
        .with_context(|| format!("failed to load store from {}", store_path.display()))?;

    if run(args.command, &store, &settings)? {
        store
            .save(&store_path)
            .with_context(|| format!("failed to save store to {}", store_path.display()))?;
        log::info!("saved store to {}", store_path.display());
    }
    Ok(())
}

// Stub for when the cli feature is not enabled
#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("Error: kbedit binary requires the 'cli' feature to be enabled.");
    eprintln!("Please build with: cargo build --release --features cli --bin kbedit");
    std::process::exit(1);
}
