use anyhow::{bail, Result};
use clap::Parser;
use serde_json::json;

use windsock_cli::WindsockClient;

/// Push a manual weather reading for a station, for testing and for
/// sites with no supported provider.
#[derive(Parser, Debug)]
#[command(author, version, about = "Report a manual weather reading for a station")]
struct Args {
    /// Windsock server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Station id
    station: String,

    /// Wind speed in m/s
    #[arg(long)]
    wind_speed: Option<f64>,

    /// Wind direction in degrees
    #[arg(long)]
    wind_direction: Option<f64>,

    /// Gust speed in m/s
    #[arg(long)]
    gust_speed: Option<f64>,

    /// Temperature in degrees Celsius
    #[arg(long)]
    temperature: Option<f64>,

    /// Relative humidity in percent
    #[arg(long)]
    humidity: Option<f64>,

    /// Pressure in hPa
    #[arg(long)]
    pressure: Option<f64>,

    /// Rainfall in mm
    #[arg(long)]
    rain: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut body = json!({ "station_id": args.station });
    let fields = [
        ("wind_speed", args.wind_speed),
        ("wind_direction", args.wind_direction),
        ("gust_speed", args.gust_speed),
        ("temperature", args.temperature),
        ("humidity", args.humidity),
        ("pressure", args.pressure),
        ("rain", args.rain),
    ];
    let mut any = false;
    for (name, value) in fields {
        if let Some(v) = value {
            body[name] = json!(v);
            any = true;
        }
    }
    if !any {
        bail!("nothing to report, pass at least one value flag");
    }

    let client = WindsockClient::new(args.url);
    let stored = client.report_measurement(&body).await?;
    println!(
        "reported for {} at {}",
        stored.station_id,
        stored.observed_at.format("%H:%M:%S")
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_parse() {
        Args::command().debug_assert();
        let args = Args::parse_from([
            "report_weather",
            "S1",
            "--wind-speed",
            "6.5",
            "--pressure",
            "1013.2",
        ]);
        assert_eq!(args.station, "S1");
        assert_eq!(args.wind_speed, Some(6.5));
        assert_eq!(args.pressure, Some(1013.2));
        assert!(args.rain.is_none());
    }
}
