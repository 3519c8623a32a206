use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "waffer")]
#[command(version = "0.1.0")]
#[command(about = "Passive WAF detector", long_about = None)]
pub struct Cli {
    /// Target URL, including scheme. Example: https://example.com
    #[arg(required_unless_present = "dump_signatures")]
    pub url: Option<String>,

    /// Active probing (reserved; only use with permission). Not implemented, detection stays passive
    #[arg(long)]
    pub active: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "10.0")]
    pub timeout: f64,

    /// HTTP method for the baseline request
    #[arg(long, default_value = "head", value_parser = ["head", "get"])]
    pub method: String,

    /// Query parameter sent with GET requests, as KEY=VALUE (repeatable)
    #[arg(long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Load signatures from a JSON file instead of the built-in set
    #[arg(long)]
    pub signatures: Option<PathBuf>,

    /// User-Agent header for the baseline request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Output format: json, text
    #[arg(short, long, default_value = "json", value_parser = ["json", "text"])]
    pub output_format: String,

    /// Print the signature database as JSON and exit
    #[arg(long)]
    pub dump_signatures: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Parse a `KEY=VALUE` pair. The value may itself contain `=`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid KEY=VALUE: no `=` or empty key in `{}`", s)),
    }
}
