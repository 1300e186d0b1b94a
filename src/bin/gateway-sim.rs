//! Gateway simulation binary.
//!
//! Drives a simulated flaky dependency through the gateway and prints the
//! live metrics event stream, one JSON object per line. Useful for watching
//! the circuit open, cool down, probe, and close.

use std::time::Duration;

use clap::Parser;

use circuit_gateway::config::schema::{CircuitConfig, GatewayConfig};
use circuit_gateway::observability::{logging, metrics};
use circuit_gateway::Gateway;

#[derive(Parser)]
#[command(name = "gateway-sim")]
#[command(about = "Drive a simulated flaky dependency through the gateway", long_about = None)]
struct Cli {
    /// Number of calls to issue.
    #[arg(short, long, default_value_t = 60)]
    calls: u64,

    /// Failures per 100 calls while the dependency is unhealthy.
    #[arg(short, long, default_value_t = 80)]
    failure_percent: u64,

    /// Delay between calls in milliseconds.
    #[arg(short, long, default_value_t = 50)]
    interval_ms: u64,

    /// Circuit cool-down in milliseconds.
    #[arg(long, default_value_t = 500)]
    cool_down_ms: u64,

    /// Call index after which the dependency recovers.
    #[arg(long, default_value_t = 30)]
    recover_after: u64,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init_logging("gateway_sim=info,circuit_gateway=info");

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    let config = GatewayConfig {
        circuit: CircuitConfig {
            minimum_volume: 5,
            cool_down_ms: cli.cool_down_ms,
            ..CircuitConfig::default()
        },
        ..GatewayConfig::default()
    };
    let gateway = Gateway::new(config)?;

    // Print the event stream the way a dashboard aggregator would see it.
    let mut subscription = gateway.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
            }
        }
    });

    for n in 0..cli.calls {
        let unhealthy = n < cli.recover_after && n % 100 < cli.failure_percent;
        let result = gateway
            .execute(
                "city-service",
                move || async move {
                    if unhealthy {
                        Err::<&str, String>("dependency unavailable".to_string())
                    } else {
                        Ok("city payload")
                    }
                },
                || async { Ok::<_, String>("cached payload") },
            )
            .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "Fatal gateway error");
        }
        tokio::time::sleep(Duration::from_millis(cli.interval_ms)).await;
    }

    for snapshot in gateway.snapshot() {
        tracing::info!(
            operation = %snapshot.operation,
            state = %snapshot.state,
            request_count = snapshot.request_count,
            failure_rate = snapshot.failure_rate,
            "Final operation state"
        );
    }

    // Dropping the gateway closes the event stream and ends the printer.
    drop(gateway);
    printer.await?;

    Ok(())
}
