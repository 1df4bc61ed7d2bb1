//! fnflow demo: runs the reference pipelines and reports what happened.
use anyhow::Result;
use clap::ValueEnum;
use fnflow_core::FlowConfig;
use tracing::info;

pub mod scenarios;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Orders,
    Profile,
    Balances,
    Tax,
    Notify,
    Logging,
    Ledger,
    Async,
}

impl Scenario {
    pub const ALL: [Scenario; 8] = [
        Self::Orders,
        Self::Profile,
        Self::Balances,
        Self::Tax,
        Self::Notify,
        Self::Logging,
        Self::Ledger,
        Self::Async,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Profile => "profile",
            Self::Balances => "balances",
            Self::Tax => "tax",
            Self::Notify => "notify",
            Self::Logging => "logging",
            Self::Ledger => "ledger",
            Self::Async => "async",
        }
    }

    pub async fn run(&self, config: &FlowConfig) -> Result<Vec<String>> {
        match self {
            Self::Orders => scenarios::orders(config),
            Self::Profile => scenarios::profile(),
            Self::Balances => Ok(scenarios::balances()),
            Self::Tax => Ok(scenarios::tax()),
            Self::Notify => Ok(scenarios::notify(config)),
            Self::Logging => Ok(scenarios::logging()),
            Self::Ledger => scenarios::ledger(),
            Self::Async => scenarios::async_checkout(config).await,
        }
    }
}

/// Loads the config file if one is given, defaults otherwise.
pub fn load_config(path: Option<&std::path::Path>) -> Result<FlowConfig> {
    match path {
        Some(path) => {
            let config = FlowConfig::load(path)?;
            info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(FlowConfig::default()),
    }
}

/// Runs `selected` (every scenario when empty) and returns their output,
/// grouped by scenario.
pub async fn run(
    selected: &[Scenario],
    config: &FlowConfig,
) -> Result<Vec<(Scenario, Vec<String>)>> {
    let selected = if selected.is_empty() {
        &Scenario::ALL[..]
    } else {
        selected
    };

    let mut results = Vec::with_capacity(selected.len());
    for scenario in selected {
        info!(scenario = scenario.name(), "running scenario");
        let lines = scenario.run(config).await?;
        results.push((*scenario, lines));
    }
    Ok(results)
}
