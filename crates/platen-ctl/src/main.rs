//! platen-ctl — command-line interface for the Platen daemon.

use std::path::Path;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use platen_client::backend::BackendClient;
use platen_client::{EnvelopeBuilder, TransferSession};
use platen_core::order::{Material, ModifyOrderRequest, OrderStatus, Process};

const DEFAULT_PORT: u16 = 8080;

fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_status(port: u16) -> Result<()> {
    let client = BackendClient::new(base_url(port));
    let status = client.probe().await?;

    println!("═══════════════════════════════════════");
    println!("  Platen Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Status           : {}", status.status);
    println!("  Uptime           : {}s", status.uptime_secs);
    println!("  Active transfers : {}", status.active_transfers);
    println!("  Orders placed    : {}", status.orders);

    Ok(())
}

async fn cmd_orders(port: u16) -> Result<()> {
    let client = BackendClient::new(base_url(port));
    let orders = client.orders().await?;

    if orders.is_empty() {
        println!("No orders placed yet.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Orders ({})", orders.len());
    println!("═══════════════════════════════════════");

    for order in &orders {
        println!("  ┌─ {}", order.created_at.to_rfc3339());
        println!("  │  submitter : {} <{}>", order.submitter_name, order.submitter_email);
        println!("  │  file      : {}", order.source_file_name);
        println!("  │  copies    : {}", order.copies_requested);
        println!(
            "  │  job       : {} / {}",
            order.material_type.as_str(),
            order.process_type.as_str()
        );
        println!("  │  price     : {:.2}", order.computed_price);
        println!("  └─ status    : {}", order.status.as_str());
    }

    Ok(())
}

async fn cmd_modify(port: u16, datetime: &str, status: &str) -> Result<()> {
    let datetime: DateTime<Utc> = datetime
        .parse()
        .context("datetime must be RFC3339, e.g. 2024-01-01T00:00:00Z")?;
    let new_status = OrderStatus::from_name(status)
        .with_context(|| format!("unknown status `{status}` — use New, InProgress, Completed, or Canceled"))?;

    let client = BackendClient::new(base_url(port));
    client
        .modify_order(&ModifyOrderRequest {
            datetime,
            new_status,
        })
        .await?;

    println!("Order {} is now {}.", datetime.to_rfc3339(), new_status.as_str());
    Ok(())
}

struct SubmitArgs {
    file: String,
    name: String,
    email: String,
    copies: String,
    material: Material,
    process: Process,
}

async fn cmd_submit(port: u16, args: SubmitArgs) -> Result<()> {
    let client = BackendClient::new(base_url(port));

    // The probe gates the session — a down backend blocks the submission
    // before any connection is opened.
    client
        .probe()
        .await
        .context("backend health check failed, not submitting")?;

    let data = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file))?;
    let file_name = Path::new(&args.file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.clone());

    let metadata = EnvelopeBuilder::new()
        .submitter(&args.name, &args.email)
        .copies(&args.copies)
        .file(&file_name, data.len() as u64)
        .material(args.material)
        .process(args.process)
        .build()?;

    println!(
        "Submitting {} ({} bytes, {} chunks)...",
        file_name,
        data.len(),
        metadata.total_chunk_count
    );

    let session = TransferSession::new(client.evaluate_endpoint());
    let result = session.submit(metadata, Bytes::from(data)).await?;

    println!("═══════════════════════════════════════");
    println!("  Evaluation Result");
    println!("═══════════════════════════════════════");
    println!("  File   : {}", result.source_file_name);
    println!("  Copies : {}", result.copies_requested);
    println!(
        "  Job    : {} / {}",
        result.material_type.as_str(),
        result.process_type.as_str()
    );
    println!("  Price  : {:.2}", result.computed_price);

    Ok(())
}

fn parse_submit_args(rest: &[&str]) -> Result<SubmitArgs> {
    let mut file = None;
    let mut name = None;
    let mut email = None;
    let mut copies = "1".to_string();
    let mut material = Material::PLA;
    let mut process = Process::Standard;

    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            "--name" => {
                i += 1;
                name = Some(rest.get(i).context("--name requires a value")?.to_string());
            }
            "--email" => {
                i += 1;
                email = Some(rest.get(i).context("--email requires a value")?.to_string());
            }
            "--copies" => {
                i += 1;
                copies = rest.get(i).context("--copies requires a value")?.to_string();
            }
            "--material" => {
                i += 1;
                let raw = rest.get(i).context("--material requires a value")?;
                material = Material::from_name(raw)
                    .with_context(|| format!("unknown material `{raw}` — use PLA, PET, or ASA"))?;
            }
            "--process" => {
                i += 1;
                let raw = rest.get(i).context("--process requires a value")?;
                process = Process::from_name(raw).with_context(|| {
                    format!("unknown process `{raw}` — use Standard, Precise, ThickLayer, or FullFill")
                })?;
            }
            positional if !positional.starts_with("--") && file.is_none() => {
                file = Some(positional.to_string());
            }
            other => bail!("unknown submit option: {other}"),
        }
        i += 1;
    }

    Ok(SubmitArgs {
        file: file.context("submit requires a file path")?,
        name: name.context("submit requires --name")?,
        email: email.context("submit requires --email")?,
        copies,
        material,
        process,
    })
}

fn print_usage() {
    println!("Usage: platen-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                  Show daemon health and counters");
    println!("  orders                                  List placed orders");
    println!("  orders modify <datetime> <status>       Change one order's status");
    println!("  submit <file> --name <n> --email <e>    Submit a job for price evaluation");
    println!("         [--copies <n>] [--material PLA|PET|ASA]");
    println!("         [--process Standard|Precise|ThickLayer|FullFill]");
    println!();
    println!("Options:");
    println!("  --port <port>   Daemon API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | []                        => cmd_status(port).await,
        ["orders"]                             => cmd_orders(port).await,
        ["orders", "modify", datetime, status] => cmd_modify(port, datetime, status).await,
        ["submit", rest @ ..]                  => cmd_submit(port, parse_submit_args(rest)?).await,
        ["help"] | ["--help"] | ["-h"]         => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
