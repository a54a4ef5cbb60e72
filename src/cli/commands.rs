use crate::config::{load_listener_file, ListenerFile};
use crate::converter::{
    BytesMessageConverter, ConverterChain, MessageConverter, StringMessageConverter,
};
use crate::dispatcher::Dispatcher;
use crate::echo::EchoListener;
use crate::listener::MappingInformation;
use crate::message::{InboundMessage, QUEUE_NAME};
use crate::registry::MappingRegistry;
use crate::typed::typed;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line interface for rqueue listener declarations
#[derive(Parser)]
#[command(name = "rqueue-cli")]
#[command(about = "Validate, inspect and exercise queue listener declarations", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build the registry from a declaration file and report problems
    Validate {
        /// Path to the declaration file (YAML)
        #[arg(short, long)]
        file: PathBuf,

        /// Resolve unknown placeholders from the process environment
        #[arg(long, default_value_t = false)]
        env: bool,
    },
    /// Print the destination table, selected listener first
    Inspect {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, default_value_t = false)]
        env: bool,
    },
    /// Dispatch one payload through echo listeners and print the outcome
    Dispatch {
        #[arg(short, long)]
        file: PathBuf,

        /// Destination queue; omit to send a message without a destination
        #[arg(short, long)]
        queue: Option<String>,

        /// Message payload as a JSON document
        #[arg(short, long)]
        payload: String,

        /// Extra headers as KEY=VALUE, repeatable
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        #[arg(long, default_value_t = false)]
        env: bool,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

#[derive(Serialize)]
struct DispatchReport<'a> {
    status: &'static str,
    message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    converter: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mapping: Option<&'a MappingInformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Parse arguments from the process and run
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

/// Run an already parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate { file, env } => {
            let registry = build_registry(&file, env)?;
            println!(
                "OK: {} listener(s), {} queue(s), {} skipped",
                registry.len(),
                registry.destinations().len(),
                registry.skipped().len()
            );
            for skipped in registry.skipped() {
                println!(
                    "skipped {}::{}: no queue names ({})",
                    skipped.component, skipped.method, skipped.mapping
                );
            }
            Ok(())
        }
        Commands::Inspect { file, env } => {
            let registry = build_registry(&file, env)?;
            print_table(&registry);
            Ok(())
        }
        Commands::Dispatch {
            file,
            queue,
            payload,
            headers,
            env,
        } => {
            let registry = build_registry(&file, env)?;
            let custom: Vec<Arc<dyn MessageConverter>> = vec![
                Arc::new(BytesMessageConverter),
                Arc::new(StringMessageConverter),
            ];
            let converters = ConverterChain::with_converters(custom)?;
            let dispatcher = Dispatcher::new(registry, converters);

            let mut message = InboundMessage::new(Default::default(), payload.into_bytes());
            if let Some(queue) = queue {
                message.set_header(QUEUE_NAME, queue);
            }
            for (name, value) in headers {
                message.set_header(&name, value);
            }

            let result = dispatcher.dispatch(&message);
            let report = match &result {
                Ok(outcome) => DispatchReport {
                    status: "dispatched",
                    message_id: outcome.message_id.to_string(),
                    queue: Some(outcome.queue.clone()),
                    handler: Some(outcome.handler.clone()),
                    converter: Some(outcome.converter),
                    mapping: Some(outcome.mapping.as_ref()),
                    error_kind: None,
                    error: None,
                },
                Err(err) => DispatchReport {
                    status: "failed",
                    message_id: message.id.to_string(),
                    queue: message.destination().map(str::to_string),
                    handler: None,
                    converter: None,
                    mapping: err.mapping(),
                    error_kind: Some(err.kind()),
                    error: Some(error_chain(err)),
                },
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            result.map(|_| ()).context("Dispatch failed")
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Build a registry from `file` with an [`EchoListener`] bound to every entry.
pub fn build_registry(file: &Path, use_env: bool) -> Result<MappingRegistry> {
    let listeners: ListenerFile = load_listener_file(file)?;
    let resolver = listeners.resolver(use_env);
    let registry = listeners
        .registry_builder(|entry| {
            typed(EchoListener::new(format!(
                "{}::{}",
                entry.component, entry.method
            )))
        })
        .build(&resolver)
        .with_context(|| format!("Invalid listener declarations in {}", file.display()))?;
    Ok(registry)
}

fn print_table(registry: &MappingRegistry) {
    for queue in registry.destinations() {
        println!("{queue}");
        for (idx, registration) in registry.candidates(queue).iter().enumerate() {
            let marker = if idx == 0 { '*' } else { ' ' };
            println!(
                "  {marker} {} {}",
                registration.handler_name(),
                registration.mapping()
            );
        }
    }
    for skipped in registry.skipped() {
        println!("(skipped) {}::{}", skipped.component, skipped.method);
    }
}
