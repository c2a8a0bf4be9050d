use anyhow::Result;
use clap::Parser;

use windsock_cli::WindsockClient;
use windsock_core::FactorValue;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate a launch site right now")]
struct Args {
    /// Windsock server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Launch id or name
    launch: String,

    /// Print only the severity
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = WindsockClient::new(args.url);

    let launch = client.resolve_launch(&args.launch).await?;
    let decision = client.decide(&launch.id).await?;

    if args.quiet {
        println!("{}", decision.severity);
        return Ok(());
    }

    println!("{}: {}", launch.name, decision.severity.to_string().to_uppercase());
    println!("{}", decision.message);
    if !decision.factors.is_empty() {
        println!();
        for factor in &decision.factors {
            match &factor.value {
                FactorValue::Number(n) => println!("  {}: {}", factor.name, n),
                FactorValue::Text(s) => println!("  {}: {}", factor.name, s),
            }
        }
    }

    Ok(())
}
