//! # classlink
//!
//! Command-line front end for the link resolver: loads a JSON manifest of
//! loaders and classes, resolves each listed reference, and prints the
//! resulting linkage.
//!
//! ## Environment
//!
//! - `RUST_LOG`: tracing filter, e.g. `classlink_vm=debug`.
//! - `CLASSLINK_CHECK_ACCESS`, `CLASSLINK_ALLOW_NON_VIRTUAL_CALLS`,
//!   `CLASSLINK_ENABLE_INVOKE_DYNAMIC`, `CLASSLINK_TRACE_METHOD_HANDLES`:
//!   see [`LinkerConfig`].
use classlink_types::{TypeHandle, TypeRegistry, error::TypeResolutionError, table::ClassTable};
use classlink_vm::{
    CallSiteEntry, DispatchKind, FieldAccessKind, InvokeKind, LinkError, LinkResolver,
    LinkerConfig, MemberRef, SharedLinkState,
};
use clap::Parser;
use serde::Serialize;
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

pub mod manifest;

use manifest::{LoaderNames, Manifest, Request, RequestKind};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Resolve symbolic member references against a class manifest"
)]
pub struct Args {
    /// JSON manifest describing loaders, classes, and references to resolve
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
    /// Emit one JSON object per reference instead of text
    #[arg(long)]
    pub json: bool,
    /// Print resolver cache statistics afterwards
    #[arg(long)]
    pub stats: bool,
    /// Skip access and loader-constraint checks
    #[arg(long)]
    pub no_access_checks: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown loader {0}")]
    UnknownLoader(String),
    #[error("unknown flag {0}")]
    UnknownFlag(String),
    #[error(transparent)]
    Type(#[from] TypeResolutionError),
}

/// Outcome of resolving one manifest reference.
#[derive(Debug, Serialize, PartialEq)]
pub struct Outcome {
    pub request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_cli() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.manifest) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error loading manifest: {}", CliError::from(e));
            return ExitCode::from(2);
        }
    };
    let mut config = LinkerConfig::from_env();
    if args.no_access_checks {
        config.check_access = false;
    }

    let (outcomes, resolver) = match run_manifest(&text, config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error building class table: {}", e);
            return ExitCode::from(2);
        }
    };

    let mut failed = false;
    for outcome in &outcomes {
        failed |= outcome.error.is_some();
        if args.json {
            match serde_json::to_string(outcome) {
                Ok(line) => println!("{}", line),
                Err(e) => error!(error = %e, "could not serialize outcome"),
            }
        } else {
            match (&outcome.linked, &outcome.error) {
                (Some(linked), _) => println!("ok    {} -> {}", outcome.request, linked),
                (None, Some(err)) => println!("error {}: {}", outcome.request, err),
                (None, None) => println!("?     {}", outcome.request),
            }
        }
    }
    if args.stats {
        print!("{}", resolver.shared().get_cache_stats());
    }

    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Build the manifest's class table and resolve every reference in order.
pub fn run_manifest(
    text: &str,
    config: LinkerConfig,
) -> Result<(Vec<Outcome>, LinkResolver), CliError> {
    let manifest = Manifest::from_json(text)?;
    let (table, loaders) = manifest.build()?;
    let table = Arc::new(table);
    let resolver = LinkResolver::new(Arc::new(SharedLinkState::with_config(
        table.clone(),
        config,
    )));

    let mut outcomes = Vec::with_capacity(manifest.resolve.len());
    for (index, request) in manifest.resolve.iter().enumerate() {
        let label = format!(
            "{:?} {}.{}{}",
            request.kind, request.owner, request.name, request.descriptor
        );
        debug!(request = %label, "resolving");
        let outcome = match resolve_request(&resolver, &table, &loaders, request, index as u32) {
            Ok(linked) => Outcome {
                request: label,
                linked: Some(linked),
                error: None,
                error_kind: None,
            },
            Err(RequestError::Link(e)) => Outcome {
                request: label,
                linked: None,
                error: Some(e.to_string()),
                error_kind: Some(format!("{:?}", e.kind())),
            },
            Err(RequestError::Cli(e)) => Outcome {
                request: label,
                linked: None,
                error: Some(e.to_string()),
                error_kind: None,
            },
        };
        outcomes.push(outcome);
    }
    Ok((outcomes, resolver))
}

enum RequestError {
    Link(LinkError),
    Cli(CliError),
}

impl From<LinkError> for RequestError {
    fn from(e: LinkError) -> Self {
        RequestError::Link(e)
    }
}

impl From<CliError> for RequestError {
    fn from(e: CliError) -> Self {
        RequestError::Cli(e)
    }
}

fn find_type(
    table: &ClassTable,
    loaders: &LoaderNames,
    loader: Option<&str>,
    name: Option<&str>,
) -> Result<Option<TypeHandle>, RequestError> {
    let Some(name) = name else {
        return Ok(None);
    };
    let loader = loaders.get(loader)?;
    table
        .lookup_name(name, loader)
        .map(Some)
        .ok_or_else(|| CliError::Type(TypeResolutionError::TypeNotFound(name.to_string())).into())
}

fn resolve_request(
    resolver: &LinkResolver,
    table: &ClassTable,
    loaders: &LoaderNames,
    request: &Request,
    index: u32,
) -> Result<String, RequestError> {
    let loader = request.loader.as_deref();
    let caller = find_type(table, loaders, loader, request.caller.as_deref())?;
    let receiver = find_type(table, loaders, loader, request.receiver.as_deref())?;
    let reference = MemberRef::new(
        table.symbols(),
        &request.owner,
        &request.name,
        &request.descriptor,
    );
    let site_owner = caller
        .as_ref()
        .map(TypeHandle::id)
        .unwrap_or_else(|| table.root_type().id());
    let site = resolver.call_site(site_owner, index);

    let invoke = match request.kind {
        RequestKind::Static => Some(InvokeKind::Static),
        RequestKind::Special => Some(InvokeKind::Special),
        RequestKind::Virtual => Some(InvokeKind::Virtual),
        RequestKind::Interface => Some(InvokeKind::Interface),
        RequestKind::Handle => Some(InvokeKind::Handle),
        _ => None,
    };
    let entry = match invoke {
        Some(kind) => resolver.resolve_invoke(
            &site,
            kind,
            &reference,
            caller.as_ref(),
            receiver.as_ref(),
        )?,
        None => {
            let kind = match request.kind {
                RequestKind::GetStatic => FieldAccessKind::GetStatic,
                RequestKind::PutStatic => FieldAccessKind::PutStatic,
                RequestKind::PutField => FieldAccessKind::PutField,
                _ => FieldAccessKind::GetField,
            };
            resolver.resolve_field_site(&site, &reference, caller.as_ref(), kind)?
        }
    };
    Ok(render(table, &entry))
}

fn render(table: &ClassTable, entry: &CallSiteEntry) -> String {
    match entry {
        CallSiteEntry::Call(call) => {
            let dispatch = match call.dispatch() {
                DispatchKind::Static => "static".to_string(),
                DispatchKind::Direct => "direct".to_string(),
                DispatchKind::Vtable(index) => format!("vtable[{}]", index),
                DispatchKind::Itable => "itable".to_string(),
                DispatchKind::Handle { appendix, .. } => match appendix {
                    Some(a) => format!("handle +{}", a),
                    None => "handle".to_string(),
                },
            };
            format!(
                "{} ({})",
                table.describe_method(call.selected_method()),
                dispatch
            )
        }
        CallSiteEntry::Dynamic(target) => table.describe_method(&target.method),
        CallSiteEntry::Field(field) => format!(
            "{}.{} {} @{}",
            table.type_name(field.holder),
            table.symbols().display(field.name),
            field.field_type,
            field.offset
        ),
    }
}
