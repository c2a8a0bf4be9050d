use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tokio::time::{interval, Duration};

use windsock_cli::WindsockClient;
use windsock_core::Severity;

#[derive(Parser, Debug)]
#[command(author, version, about = "Re-evaluate a launch periodically and report changes")]
struct Args {
    /// Windsock server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Launch id or name
    launch: String,

    /// Seconds between evaluations
    #[arg(long, default_value_t = 60)]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = WindsockClient::new(args.url);

    let launch = client.resolve_launch(&args.launch).await?;
    println!("watching {} every {}s", launch.name, args.interval);

    let mut ticker = interval(Duration::from_secs(args.interval.max(1)));
    let mut previous: Option<Severity> = None;

    loop {
        ticker.tick().await;
        let now = Local::now().format("%H:%M:%S");
        match client.decide(&launch.id).await {
            Ok(decision) => {
                let changed = previous.is_some_and(|p| p != decision.severity);
                if changed {
                    println!("{} {} <- was {}", now, decision.severity, previous.unwrap_or_default());
                    println!("    {}", decision.message);
                } else {
                    println!("{} {}", now, decision.severity);
                }
                previous = Some(decision.severity);
            }
            Err(err) => {
                eprintln!("{} evaluation failed: {}", now, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_parse() {
        Args::command().debug_assert();
        let args = Args::parse_from(["watch", "Beatenberg", "--interval", "30"]);
        assert_eq!(args.interval, 30);
    }
}
