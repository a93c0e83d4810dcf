use std::path::PathBuf;

use clap::{Parser, Subcommand};

use form_relay::config::{SettingsSource, DEFAULT_SETTINGS_PATH, HTTP_SERVER};
use form_relay::lifecycle::shutdown::request_remote_shutdown;
use form_relay::observability::logging;

#[derive(Parser)]
#[command(name = "relay-ctl")]
#[command(about = "Control client for a running form-relay", long_about = None)]
struct Cli {
    /// Settings file naming the front door endpoint.
    #[arg(short, long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Log level for diagnostics.
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the front door to shut everything down
    Shutdown,
    /// Submit a form as key=value pairs
    Submit {
        #[arg(required = true, value_parser = parse_pair)]
        fields: Vec<(String, String)>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {}", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    let endpoint = SettingsSource::new(&cli.settings).load_endpoint(HTTP_SERVER)?;

    match cli.command {
        Commands::Shutdown => {
            if request_remote_shutdown(&endpoint).await {
                println!("Shutdown acknowledged");
            } else {
                eprintln!("Error: front door did not acknowledge shutdown");
            }
        }
        Commands::Submit { fields } => {
            let client = reqwest::Client::builder()
                .no_proxy()
                .redirect(reqwest::redirect::Policy::none())
                .build()?;
            let url = format!("http://{}:{}/message", endpoint.public_host(), endpoint.port);
            let res = client.post(&url).form(&fields).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_redirection() {
        println!("Submitted ({})", status);
        return Ok(());
    }

    eprintln!("Error: front door returned status {}", status);
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    Ok(())
}
