use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use autha_adapter::Adapter;
use autha_adapter::config::Configuration;

const USAGE: &str = "usage: autha-adapter <username> [config.yaml]";

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    autha_adapter::telemetry::setup_logging()?;

    let mut args = std::env::args().skip(1);
    let Some(username) = args.next() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };

    let mut config = Configuration::default();
    if let Some(path) = args.next() {
        config = config.path(PathBuf::from(path));
    }
    let config = config.read()?;

    // read password on first line of stdin, never from arguments.
    let mut password = String::new();
    std::io::stdin().lock().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let mut adapter = config.directory_adapter()?;
    adapter.setup()?;

    if !adapter.authenticate(&username, password)? {
        tracing::warn!(%username, "authentication failed");
        return Ok(ExitCode::FAILURE);
    }

    let identifier = adapter.identifier()?.to_owned();
    let attributes = adapter.attributes()?;
    let identity = serde_json::json!({
        "identifier": identifier,
        "attributes": attributes,
        "attribute_sync_cache": adapter.attribute_sync_cache(),
    });
    println!("{}", serde_json::to_string_pretty(&identity)?);

    Ok(ExitCode::SUCCESS)
}
