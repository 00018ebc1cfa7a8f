//! generate a typed chainql client from a schema
//!
//! the schema comes from a file (introspection json or sdl) or from a live
//! backend via introspection. the output is a single module, or a
//! standalone crate wrapping it when `--crate-name` is given.
//!
//! command help reference (kept in sync with `chainql-codegen --help`):
#[doc = concat!("```text\n", include_str!("chainql-codegen-help.txt"), "\n```")]
pub const CLI_HELP: &str = include_str!("chainql-codegen-help.txt");

use chainql::codegen::{self, Schema};
use chainql::{ClientConfig, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
struct Args {
    schema_path: Option<PathBuf>,
    url: Option<String>,
    token: Option<String>,
    session: bool,
    out: PathBuf,
    crate_name: Option<String>,
    chainql_path: Option<String>,
}

#[derive(Debug, PartialEq)]
enum ParseArgsError {
    Help,
    Message(String),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().collect()) {
        Ok(args) => args,
        Err(ParseArgsError::Help) => {
            print!("{CLI_HELP}");
            return;
        }
        Err(ParseArgsError::Message(err)) => {
            eprintln!("{err}\n\n{CLI_HELP}");
            std::process::exit(1);
        }
    };

    let schema = match load_schema(&args).await {
        Ok(schema) => schema,
        Err(err) => {
            eprintln!("failed to load schema: {err}");
            std::process::exit(1);
        }
    };

    let client = match codegen::generate(&schema) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("codegen failed: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = write_output(&args, &client) {
        eprintln!("failed to write output: {err}");
        std::process::exit(1);
    }
    tracing::info!(out = %args.out.display(), "client generated");
}

fn parse_args(args: Vec<String>) -> Result<Args, ParseArgsError> {
    let mut schema_path = None;
    let mut url = None;
    let mut token = None;
    let mut session = false;
    let mut out = None;
    let mut crate_name = None;
    let mut chainql_path = None;

    let mut iter = args.into_iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--schema" => schema_path = iter.next().map(PathBuf::from),
            "--url" => url = iter.next(),
            "--token" => token = iter.next(),
            "--session" => session = true,
            "--out" => out = iter.next().map(PathBuf::from),
            "--crate-name" => crate_name = iter.next(),
            "--chainql-path" => chainql_path = iter.next(),
            "--help" | "-h" => return Err(ParseArgsError::Help),
            _ => return Err(ParseArgsError::Message(format!("unknown argument: {arg}"))),
        }
    }

    let out = out.ok_or_else(|| ParseArgsError::Message("--out is required".to_string()))?;

    let sources = [schema_path.is_some(), url.is_some(), session]
        .iter()
        .filter(|set| **set)
        .count();
    if sources != 1 {
        return Err(ParseArgsError::Message(
            "exactly one of --schema, --url, or --session is required".to_string(),
        ));
    }
    if url.is_some() && token.is_none() {
        return Err(ParseArgsError::Message(
            "--token is required with --url".to_string(),
        ));
    }

    Ok(Args {
        schema_path,
        url,
        token,
        session,
        out,
        crate_name,
        chainql_path,
    })
}

async fn load_schema(args: &Args) -> Result<Schema, String> {
    if let Some(schema_path) = &args.schema_path {
        let text = fs::read_to_string(schema_path)
            .map_err(|err| format!("failed to read {}: {err}", schema_path.display()))?;
        return Schema::parse(&text).map_err(|err| err.to_string());
    }

    let connection = match (&args.url, &args.token) {
        (Some(url), Some(token)) => Connection::connect(ClientConfig::new(url, token)),
        _ => Connection::from_env(),
    }
    .map_err(|err| err.to_string())?;

    tracing::debug!("introspecting schema");
    let introspection = connection
        .introspect()
        .await
        .map_err(|err| format!("introspection failed: {err}"))?;
    Schema::from_introspection_value(introspection).map_err(|err| err.to_string())
}

fn write_output(args: &Args, client: &str) -> Result<(), String> {
    let Some(crate_name) = &args.crate_name else {
        return write_file(&args.out, client);
    };

    let src_dir = args.out.join("src");
    fs::create_dir_all(&src_dir).map_err(|err| err.to_string())?;
    write_file(
        &args.out.join("Cargo.toml"),
        &render_cargo_toml(crate_name, args.chainql_path.as_deref()),
    )?;
    write_file(&src_dir.join("lib.rs"), &render_lib())?;
    write_file(&src_dir.join("client.rs"), client)
}

fn write_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    fs::write(path, content).map_err(|err| format!("failed to write {}: {err}", path.display()))
}

fn render_cargo_toml(crate_name: &str, chainql_path: Option<&str>) -> String {
    let mut cargo = String::new();
    cargo.push_str("[package]\n");
    cargo.push_str(&format!("name = \"{crate_name}\"\n"));
    cargo.push_str("version = \"0.1.0\"\n");
    cargo.push_str("edition = \"2021\"\n\n");
    cargo.push_str("[dependencies]\n");
    match chainql_path {
        Some(path) => cargo.push_str(&format!("chainql = {{ path = \"{path}\" }}\n")),
        None => cargo.push_str(&format!("chainql = \"{}\"\n", env!("CARGO_PKG_VERSION"))),
    }
    cargo.push_str("serde = { version = \"1\", features = [\"derive\"] }\n");
    cargo.push_str("serde_json = \"1\"\n");
    cargo
}

fn render_lib() -> String {
    let mut out = String::new();
    out.push_str("//! generated chainql client\n\n");
    out.push_str("#![allow(clippy::too_many_arguments)]\n\n");
    out.push_str("mod client;\n\n");
    out.push_str("pub use client::*;\n");
    out
}
