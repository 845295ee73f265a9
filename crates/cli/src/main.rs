//! SalonQ CLI - Operator command line for the SalonQ daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "salonq")]
#[command(about = "SalonQ queue engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "SALONQ_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List providers with their queue length
    Providers,

    /// Show one provider and its queue
    Show { provider_id: String },

    /// Create a provider (opens immediately)
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        address: String,

        #[arg(long)]
        phone: Option<String>,

        /// e.g. "09:00"
        #[arg(long)]
        opening_hour: Option<String>,
    },

    /// Accept new customers again
    Open { provider_id: String },

    /// Stop accepting new customers (the current queue is kept)
    Close { provider_id: String },

    /// Put a registered customer in a provider's queue
    Join {
        provider_id: String,
        customer_id: String,
    },

    /// Take a customer out of a queue
    Leave {
        provider_id: String,
        customer_id: String,
    },

    /// Mark a customer as served
    Serve {
        provider_id: String,
        customer_id: String,
    },

    /// Admit an unregistered walk-in customer
    WalkIn { provider_id: String },

    /// Find the queue a customer is in
    WhereIs { customer_id: String },

    /// Register a customer
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,
    },

    /// Show daemon statistics
    Stats,

    /// Empty every queue now
    Reset {
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Tabled)]
struct ProviderRow {
    id: String,
    name: String,
    address: String,
    status: String,
    waiting: usize,
}

#[derive(Tabled)]
struct OccupantRow {
    #[tabled(rename = "#")]
    position: u64,
    customer_id: String,
    name: String,
    kind: String,
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        match error.data {
            Some(data) => anyhow::bail!("RPC error ({}): {} {}", error.code, error.message, data),
            None => anyhow::bail!("RPC error ({}): {}", error.code, error.message),
        }
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn status_label(is_open: bool) -> String {
    if is_open {
        "OPEN".green().to_string()
    } else {
        "CLOSED".red().to_string()
    }
}

fn occupant_rows(queue: &Value) -> Vec<OccupantRow> {
    queue
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|o| OccupantRow {
                    position: o["position"].as_u64().unwrap_or(0),
                    customer_id: o["customer_id"].as_str().unwrap_or("").to_string(),
                    name: o["display_name"].as_str().unwrap_or("").to_string(),
                    kind: o["kind"].as_str().unwrap_or("").to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Print a queue snapshot (also used for mutation results)
fn print_queue(snapshot: &Value) {
    let rows = occupant_rows(&snapshot["queue"]);
    println!(
        "  {} {}   {} {}   {} {}",
        "Provider:".bold(),
        snapshot["provider_id"].as_str().unwrap_or("?"),
        "Status:".bold(),
        status_label(snapshot["is_open"].as_bool().unwrap_or(false)),
        "Revision:".bold(),
        snapshot["revision"]
    );
    println!();
    if rows.is_empty() {
        println!("  {}", "Queue is empty".yellow());
    } else {
        println!("{}", Table::new(rows));
    }
}

async fn set_open(url: &str, provider_id: &str, is_open: bool) -> Result<()> {
    let params = json!({ "provider_id": provider_id, "is_open": is_open });
    let snapshot = call_rpc(url, "providers.open_status.v1", params).await?;

    println!("{} {} is now {}", "✓".green(), provider_id.bold(), status_label(is_open));
    print_queue(&snapshot);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Providers => {
            let result = call_rpc(url, "providers.list.v1", json!({})).await?;
            let rows: Vec<ProviderRow> = result["providers"]
                .as_array()
                .map(|views| {
                    views
                        .iter()
                        .map(|p| ProviderRow {
                            id: p["id"].as_str().unwrap_or("").to_string(),
                            name: p["name"].as_str().unwrap_or("").to_string(),
                            address: p["address"].as_str().unwrap_or("").to_string(),
                            status: status_label(p["is_open"].as_bool().unwrap_or(false)),
                            waiting: p["queue"].as_array().map_or(0, |q| q.len()),
                        })
                        .collect()
                })
                .unwrap_or_default();

            if rows.is_empty() {
                println!("{}", "No providers yet".yellow());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Show { provider_id } => {
            let view = call_rpc(url, "providers.get.v1", json!({ "provider_id": provider_id })).await?;

            println!("{}", view["name"].as_str().unwrap_or("?").cyan().bold());
            println!("  {} {}", "Address:".bold(), view["address"].as_str().unwrap_or("-"));
            println!("  {} {}", "Phone:".bold(), view["phone"].as_str().unwrap_or("-"));
            println!(
                "  {} {}",
                "Opens:".bold(),
                view["opening_hour"].as_str().unwrap_or("-")
            );
            println!();
            let snapshot = json!({
                "provider_id": view["id"],
                "is_open": view["is_open"],
                "revision": view["revision"],
                "queue": view["queue"],
            });
            print_queue(&snapshot);
        }

        Commands::Create {
            name,
            address,
            phone,
            opening_hour,
        } => {
            let params = json!({
                "name": name,
                "address": address,
                "phone": phone,
                "opening_hour": opening_hour,
            });
            let result = call_rpc(url, "providers.create.v1", params).await?;

            println!("{}", "✓ Provider created".green().bold());
            println!("  {} {}", "ID:".bold(), result["provider"]["id"].as_str().unwrap_or("?"));
        }

        Commands::Open { provider_id } => set_open(url, &provider_id, true).await?,

        Commands::Close { provider_id } => set_open(url, &provider_id, false).await?,

        Commands::Join {
            provider_id,
            customer_id,
        } => {
            let params = json!({ "provider_id": provider_id, "customer_id": customer_id });
            let snapshot = call_rpc(url, "queue.join.v1", params).await?;

            println!("{}", format!("✓ {} joined the queue", customer_id).green().bold());
            print_queue(&snapshot);
        }

        Commands::Leave {
            provider_id,
            customer_id,
        } => {
            let params = json!({ "provider_id": provider_id, "customer_id": customer_id });
            let snapshot = call_rpc(url, "queue.leave.v1", params).await?;

            println!("{}", format!("✓ {} left the queue", customer_id).green().bold());
            print_queue(&snapshot);
        }

        Commands::Serve {
            provider_id,
            customer_id,
        } => {
            let params = json!({ "provider_id": provider_id, "customer_id": customer_id });
            let snapshot = call_rpc(url, "queue.advance.v1", params).await?;

            println!("{}", format!("✓ {} served", customer_id).green().bold());
            print_queue(&snapshot);
        }

        Commands::WalkIn { provider_id } => {
            let result = call_rpc(url, "queue.walkin.v1", json!({ "provider_id": provider_id })).await?;

            println!(
                "{}",
                format!(
                    "✓ Walk-in {} admitted",
                    result["customer"]["id"].as_str().unwrap_or("?")
                )
                .green()
                .bold()
            );
            print_queue(&result);
        }

        Commands::WhereIs { customer_id } => {
            let result = call_rpc(
                url,
                "customers.current_queue.v1",
                json!({ "customer_id": customer_id }),
            )
            .await?;

            if result["in_queue"].as_bool() == Some(true) {
                println!(
                    "{} is #{} at {} ({})",
                    customer_id.bold(),
                    result["position"],
                    result["provider_name"].as_str().unwrap_or("?").cyan(),
                    result["provider_id"].as_str().unwrap_or("?")
                );
            } else {
                println!("{}", format!("{} is not in any queue", customer_id).yellow());
            }
        }

        Commands::Register { name, email } => {
            let params = json!({ "display_name": name, "contact_email": email });
            let result = call_rpc(url, "customers.register.v1", params).await?;

            println!("{}", "✓ Customer registered".green().bold());
            println!("  {} {}", "ID:".bold(), result["customer"]["id"].as_str().unwrap_or("?"));
        }

        Commands::Stats => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match call_rpc(url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Providers:".bold(), stats["providers"]);
                    println!("  {} {}", "Open:".bold(), stats["open_providers"]);
                    println!("  {} {}", "Customers:".bold(), stats["customers"]);
                    println!("  {} {}", "Queued:".bold(), stats["queued"]);
                    println!("  {} {}", "Walk-ins:".bold(), stats["walk_ins"]);
                    println!();
                    println!("  {} {}", "Rooms:".bold(), stats["rooms"]);
                    println!("  {} {}", "Watchers:".bold(), stats["watchers"]);
                    println!(
                        "  {} {}",
                        "Nightly reset:".bold(),
                        stats["reset_at"].as_str().unwrap_or("?")
                    );
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("Refusing to empty every queue without --yes");
            }

            println!("{}", "Resetting queues...".cyan().bold());
            match call_rpc(url, "admin.reset.v1", json!({})).await {
                Ok(result) => {
                    println!("  {} {} providers reset", "✓".green(), result["providers_reset"]);
                    println!("  {} {} entries cleared", "✓".green(), result["entries_cleared"]);
                    println!(
                        "  {} {} walk-ins deleted",
                        "✓".green(),
                        result["walk_ins_deleted"]
                    );
                }
                Err(e) => {
                    println!("  {} Reset failed: {}", "✗".red(), e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupant_rows() {
        let queue = json!([
            {"customer_id": "c1", "display_name": "Ana", "kind": "REGISTERED", "position": 1},
            {"customer_id": "w1", "display_name": "Walk-in", "kind": "WALK_IN", "position": 2}
        ]);
        let rows = occupant_rows(&queue);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].position, 2);
        assert_eq!(rows[1].kind, "WALK_IN");
        assert!(occupant_rows(&Value::Null).is_empty());
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["salonq", "join", "p1", "c1"]).unwrap();
        assert!(matches!(cli.command, Commands::Join { .. }));
        assert_eq!(cli.rpc_url, DEFAULT_RPC_URL);

        let cli = Cli::try_parse_from(["salonq", "where-is", "c1"]).unwrap();
        assert!(matches!(cli.command, Commands::WhereIs { .. }));
    }
}
