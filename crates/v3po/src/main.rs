//! v3po-agent: applies a configuration change set to VPP.
//!
//! The change set is a JSON object keyed by configuration path, each value
//! holding optional `before` and `after` data. Calls go to a simulated VPP,
//! so the agent doubles as a dry-run tool for change sets and for the
//! naming context store.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use v3po::{build_registry, declare_naming_contexts, INTERFACE_CONTEXT};
use vpp_api::{ControlPlane, SimulatedVpp};
use vpp_translate_common::store::open_store;
use vpp_translate_common::{AgentConfig, ChangeSet, HandleContext, Orchestrator, ReplyBridge};

/// VPP configuration translation agent
#[derive(Parser, Debug)]
#[command(name = "v3po-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON change set to apply
    changes: PathBuf,

    /// Agent configuration file
    #[arg(short = 'c', long, default_value = "/etc/v3po/agent.toml")]
    config: PathBuf,

    /// Remove the configuration in the change set (deletes only)
    #[arg(long)]
    teardown: bool,

    /// Hardware interface present in the simulated VPP (repeatable)
    #[arg(long = "hardware-interface", value_name = "NAME")]
    hardware_interfaces: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AgentConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.validate()?;
    info!(store = ?config.mapping_store.kind, "configuration loaded");

    let store = open_store(&config.mapping_store).await?;
    let handles = Arc::new(HandleContext::restore(store, config.floors()).await?);
    declare_naming_contexts(&handles).await;

    let vpp = Arc::new(SimulatedVpp::new());
    for name in &args.hardware_interfaces {
        let index = vpp.add_hardware_interface(name.as_str());
        handles
            .add_name(INTERFACE_CONTEXT.namespace(), index.as_raw(), name)
            .await
            .with_context(|| format!("registering hardware interface {}", name))?;
    }

    let bridge = Arc::new(ReplyBridge::new(
        vpp as Arc<dyn ControlPlane>,
        config.call_timeout(),
    ));
    let registry = build_registry()?;
    info!(writers = registry.len(), "writer registry built");
    let orchestrator = Orchestrator::new(registry, Arc::clone(&handles), bridge);

    let raw = tokio::fs::read_to_string(&args.changes)
        .await
        .with_context(|| format!("reading {}", args.changes.display()))?;
    let changes: ChangeSet = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.changes.display()))?;

    let report = if args.teardown {
        orchestrator.teardown(&changes).await?
    } else {
        orchestrator.apply(&changes).await?
    };
    for invocation in &report.invocations {
        info!(
            node = %invocation.node,
            path = %invocation.path,
            operation = %invocation.operation,
            "done"
        );
    }

    let mut mappings = BTreeMap::new();
    for namespace in handles.namespaces() {
        let entries: BTreeMap<String, u32> = handles.mappings(&namespace).await.into_iter().collect();
        mappings.insert(namespace, entries);
    }
    println!("{}", serde_json::to_string_pretty(&mappings)?);
    Ok(())
}
