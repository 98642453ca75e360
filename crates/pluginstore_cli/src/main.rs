//! Inspect plugin manifests through the extension registry.
//!
//! # Responsibility
//! - Load manifest files into one registry and list what was admitted.
//! - Report skipped declarations and the flags that gate the listed set.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::info;
use pluginstore_core::{
    default_log_level, gating_flag_names, init_logging, read_plugin, CodeRefTable, Extension,
    ExtensionKind, ExtensionRegistry, FlagSnapshot, LoadReport, RegistryConfig,
};
use std::path::PathBuf;

/// Command-line arguments accepted by the `pluginstore` binary.
#[derive(Parser, Debug)]
#[command(
    name = "pluginstore",
    version,
    about = "List extensions declared by console plugin manifests"
)]
struct CliArgs {
    #[arg(
        value_name = "MANIFEST",
        required = true,
        help = "Plugin manifest files, loaded in the given order"
    )]
    manifests: Vec<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Registry configuration file (default: lenient, nothing disabled)"
    )]
    config: Option<PathBuf>,
    #[arg(
        short,
        long = "kind",
        value_name = "TAG",
        action = ArgAction::Append,
        help = "Only list extensions with this type tag (repeatable)"
    )]
    kinds: Vec<String>,
    #[arg(
        short,
        long = "flag",
        value_name = "NAME=BOOL",
        action = ArgAction::Append,
        value_parser = parse_flag,
        help = "Feature flag value; when given, gated-off extensions are hidden"
    )]
    flags: Vec<(String, bool)>,
    #[arg(long, help = "Print the flag names that gate the listed extensions")]
    gating_flags: bool,
    #[arg(
        long,
        value_name = "LEVEL",
        requires = "log_dir",
        help = "File log level (default: build dependent)"
    )]
    log_level: Option<String>,
    #[arg(long, value_name = "DIR", help = "Enable file logging under DIR")]
    log_dir: Option<PathBuf>,
}

fn parse_flag(raw: &str) -> Result<(String, bool), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=BOOL, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("flag name is empty in `{raw}`"));
    }
    let enabled = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => true,
        "false" | "0" | "off" => false,
        other => return Err(format!("flag `{name}` has non-boolean value `{other}`")),
    };
    Ok((name.to_string(), enabled))
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    if let Some(dir) = &args.log_dir {
        let level = args.log_level.as_deref().unwrap_or_else(|| default_log_level());
        init_logging(level, dir).context("failed to start logging")?;
    }

    let kinds = args
        .kinds
        .iter()
        .map(|tag| {
            ExtensionKind::from_tag(tag).with_context(|| format!("unknown extension type `{tag}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    let config = match &args.config {
        Some(path) => RegistryConfig::from_path(path)?,
        None => RegistryConfig::default(),
    };

    let code_refs = CodeRefTable::new();
    let plugins = args
        .manifests
        .iter()
        .map(|path| read_plugin(path, &code_refs))
        .collect::<Result<Vec<_>, _>>()?;

    let mut registry = ExtensionRegistry::with_config(config);
    let report = registry.load(plugins);
    print_skipped(&report);

    let matches_kind =
        |extension: &Extension| kinds.is_empty() || kinds.contains(&extension.kind());
    let listed = if args.flags.is_empty() {
        registry.query(matches_kind)
    } else {
        let snapshot: FlagSnapshot = args.flags.iter().cloned().collect();
        registry.query_in_use(matches_kind, &snapshot)
    };

    for extension in &listed {
        println!(
            "{}\t{}\t{}",
            extension.plugin(),
            extension.kind(),
            extension.id().unwrap_or("-")
        );
    }

    if args.gating_flags {
        for name in gating_flag_names(listed.iter().copied()) {
            println!("flag\t{name}");
        }
    }

    info!(
        "event=cli_list module=cli status=ok manifests={} listed={} skipped={}",
        args.manifests.len(),
        listed.len(),
        report.skipped.len()
    );

    if report.loaded == 0 && !report.skipped.is_empty() {
        bail!("no extension could be registered");
    }
    Ok(())
}

fn print_skipped(report: &LoadReport) {
    for skipped in &report.skipped {
        eprintln!(
            "skipped {}[{}]: {:?}",
            skipped.plugin, skipped.index, skipped.reason
        );
    }
}
