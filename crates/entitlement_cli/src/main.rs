//! Build-pass probe for deployments.
//!
//! # Responsibility
//! - Run one build pass with the built-in extension types.
//! - Print the resulting holder summary as JSON on stdout.
//! - Exit non-zero with the full error chain on failure.

use entitlement_core::{
    init_logging, BuildOutcome, BuilderSettings, EntitlementConfigHolder,
    EntitlementExtensionBuilder, ExtensionFactory, LoggingConfig,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut cause = err.source();
            while let Some(inner) = cause {
                eprintln!("  caused by: {inner}");
                cause = inner.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Some(config) = LoggingConfig::from_env()? {
        init_logging(&config)?;
    }

    let settings = BuilderSettings::from_env()?;
    let builder = EntitlementExtensionBuilder::new(settings, ExtensionFactory::with_builtins()?);
    let mut holder = EntitlementConfigHolder::new();
    let outcome = builder.build(&mut holder)?;

    match &outcome {
        BuildOutcome::NoConfiguration => {
            eprintln!(
                "entitlement_core version={} config=not_found",
                entitlement_core::core_version()
            );
        }
        BuildOutcome::Configured { source, .. } => {
            info!("event=cli_build module=cli status=ok source={}", source);
            eprintln!(
                "entitlement_core version={} config={}",
                entitlement_core::core_version(),
                source
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&holder.summary())?);
    Ok(())
}
