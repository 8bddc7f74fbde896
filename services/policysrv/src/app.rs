//! Service startup and run loop

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use signal_policy::{
    create_transport, load_initial_state, load_rules, Dispatcher, RuleSet, StateStore, Transport,
};
use tracing::info;

use crate::cli::Args;
use crate::config::{PolicyConfig, SERVICE_NAME};

/// Compile rules and seed state from the documents named on the command line
pub fn prepare(args: &Args) -> Result<(RuleSet, StateStore)> {
    let rules = load_rules(&args.rules)
        .with_context(|| format!("Failed to load rules from {}", args.rules.display()))?;

    let state = match &args.state {
        Some(path) => load_initial_state(path)
            .with_context(|| format!("Failed to load initial state from {}", path.display()))?,
        None => StateStore::new(),
    };
    Ok((rules, state))
}

/// Human-readable compile summary printed by `--check`
pub fn summary(rules: &RuleSet) -> String {
    let mut out = format!(
        "{} rules OK, watching {} signals\n",
        rules.len(),
        rules.watched_signals().len()
    );
    for signal in rules.watched_signals() {
        let ids: Vec<String> = rules
            .index()
            .get(signal)
            .iter()
            .map(|id| format!("#{}", id))
            .collect();
        let _ = writeln!(out, "  {} -> {}", signal, ids.join(", "));
    }
    out
}

/// Run the dispatcher until the transport terminates or a shutdown signal
/// arrives; either way the close handshake is sent once.
pub async fn serve(dispatcher: &mut Dispatcher) -> Result<()> {
    let stopped_by = tokio::select! {
        result = dispatcher.run() => {
            result.context("Signal transport failed")?;
            None
        },
        signal = common::shutdown::wait_for_shutdown() => Some(signal),
    };

    if let Some(signal) = stopped_by {
        info!("{} received, stopping", signal);
        dispatcher.close();
    }
    Ok(())
}

/// Full service lifecycle
pub async fn run(args: Args) -> Result<()> {
    let config = PolicyConfig::from_args(&args).context("Failed to load configuration")?;
    let _log_guard =
        common::logging::init_with_config(&config.log).context("Failed to initialize logging")?;

    info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    let (rules, state) = prepare(&args)?;

    if args.check {
        print!("{}", summary(&rules));
        return Ok(());
    }

    let transport: Arc<dyn Transport> = create_transport(&config.transport.selector)
        .with_context(|| format!("Cannot start transport '{}'", config.transport.selector))?;

    let mut dispatcher = Dispatcher::new(rules, state, transport);
    serve(&mut dispatcher).await?;

    info!("{} stopped", SERVICE_NAME);
    Ok(())
}
