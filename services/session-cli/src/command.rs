//! Command-line surface: argument parsing and the single request it runs.

use std::sync::Arc;

use anyhow::{Context, bail};
use reqwest::Method;
use serde_json::{Value, json};
use session_client::{SessionClient, SessionState};
use transport::{HttpTransport, RequestAttempt, TransportResponse};

use crate::config::Config;

pub const USAGE: &str =
    "usage: session-cli [--config PATH] [--method METHOD] --path PATH [--data JSON] [--metrics]";

/// Parsed command-line arguments
#[derive(Debug)]
pub struct Args {
    pub config: Option<String>,
    pub method: Method,
    pub path: String,
    pub data: Option<Value>,
    pub metrics: bool,
}

impl Args {
    /// Parse arguments, excluding the program name.
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut config = None;
        let mut method = Method::GET;
        let mut path = None;
        let mut data = None;
        let mut metrics = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--metrics" => metrics = true,
                "--config" | "--method" | "--path" | "--data" => {
                    let Some(value) = iter.next() else {
                        bail!("{arg} requires a value\n{USAGE}");
                    };
                    match arg.as_str() {
                        "--config" => config = Some(value.clone()),
                        "--method" => {
                            method = Method::from_bytes(value.to_ascii_uppercase().as_bytes())
                                .with_context(|| format!("invalid --method: {value}"))?;
                        }
                        "--path" => path = Some(value.clone()),
                        _ => {
                            data = Some(
                                serde_json::from_str(value).context("--data must be valid JSON")?,
                            );
                        }
                    }
                }
                other => bail!("unknown argument: {other}\n{USAGE}"),
            }
        }

        let Some(path) = path else {
            bail!("--path is required\n{USAGE}");
        };

        Ok(Self {
            config,
            method,
            path,
            data,
            metrics,
        })
    }
}

/// Wire the HTTP transport, session state and client from configuration.
pub fn build_client(config: &Config) -> anyhow::Result<(SessionClient, Arc<SessionState>)> {
    let transport = HttpTransport::new(&config.client.base_url, config.timeout())
        .context("failed to build HTTP transport")?;
    for cookie in &config.session.cookies {
        transport.add_cookie(cookie.expose());
    }

    let session = Arc::new(SessionState::new());
    let client = SessionClient::new(
        Arc::new(transport),
        session.clone(),
        config.client_config(),
    );
    Ok((client, session))
}

/// Execute the request described by `args` and shape the output document.
pub async fn run(client: &SessionClient, args: &Args) -> session_client::Result<Value> {
    let mut attempt = RequestAttempt::new(args.method.clone(), args.path.as_str());
    if let Some(ref data) = args.data {
        attempt = attempt
            .with_json(data)
            .map_err(|e| session_client::Error::Decode(e.to_string()))?;
    }

    let response = client.execute(attempt).await?;
    Ok(render(&response))
}

/// `{"status": <u16>, "body": <json, string or null>}`
fn render(response: &TransportResponse) -> Value {
    let body = if response.body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&response.body).unwrap_or_else(|_| Value::String(response.text()))
    };
    json!({
        "status": response.status.as_u16(),
        "body": body,
    })
}
