#![deny(clippy::all)]

use atty::Stream;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use rpmrepo_core::{CommandStatus, ExecutionOutcome, GlobalOptions};
use serde_json::{json, Value};

mod cli;
mod dispatch;
mod style;

use cli::RpmrepoCli;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = RpmrepoCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };

    let outcome = dispatch::run(&cli).map_err(|err| eyre!("{err:?}"))?;
    let code = emit_output(&global, cli.no_color, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!(
        "rpmrepo={level},rpmrepo_core={level},rpmrepo_store={level},rpmrepo_domain={level}"
    );
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(global: &GlobalOptions, no_color: bool, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let style = Style::new(no_color, atty::is(Stream::Stdout));

    if is_passthrough(&outcome.details) {
        println!("{}", outcome.message);
    } else if global.json {
        let payload = json!({
            "status": outcome.status,
            "message": outcome.message,
            "details": outcome.details,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !global.quiet {
        println!("{}", style.status(&outcome.status, &outcome.message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            println!("{}", style.info(&format!("Hint: {hint}")));
        }
    } else if outcome.status != CommandStatus::Ok {
        eprintln!("{}", outcome.message);
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
