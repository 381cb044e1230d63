//! Command-line options for `probe`.
//!
//! `CliOptions` is what clap parses; `Settings` is what the rest of the
//! binary runs on, after validation.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use probe_core::{DisplayOptions, HttpMethod, RequestForm};

/// Send an HTTP request and show the JSON response.
#[derive(Parser, Debug)]
#[command(author, version, about = "Send an HTTP request and show the JSON response")]
pub struct CliOptions {
    /// Target URL
    pub url: String,

    /// HTTP method: GET, POST, PUT or DELETE
    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    pub method: HttpMethod,

    /// Request headers as a JSON object, e.g. '{"Authorization":"Bearer ..."}'
    #[arg(short = 'H', long, default_value = "")]
    pub headers: String,

    /// Request body as JSON (sent for POST and PUT only)
    #[arg(short = 'd', long, default_value = "")]
    pub body: String,

    /// Repeat the request every MS milliseconds until interrupted
    #[arg(long, value_name = "MS")]
    pub poll: Option<u64>,

    /// Stop polling after N ticks have settled, whether shown or failed
    #[arg(long, value_name = "N", requires = "poll")]
    pub limit: Option<u64>,

    /// Give up on a request after MS milliseconds
    #[arg(long, value_name = "MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Annotate values with their data type
    #[arg(long)]
    pub show_types: bool,

    /// Annotate objects and arrays with their item count
    #[arg(long)]
    pub show_size: bool,

    /// Print a compact one-line copy of the response after the tree
    #[arg(long)]
    pub clipboard: bool,

    /// Print the response as compact JSON only
    #[arg(long, default_value_t = false)]
    pub raw: bool,

    /// Disable colored output
    #[arg(long, default_value_t = false)]
    pub no_color: bool,

    /// Enable verbose debug output
    #[arg(long, default_value_t = false, conflicts_with = "quiet")]
    pub debug: bool,

    /// Suppress all log output except errors
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

fn parse_method(s: &str) -> Result<HttpMethod, String> {
    s.parse().map_err(|e: probe_core::ProbeError| e.to_string())
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub form: RequestForm,
    pub poll_interval_ms: Option<u64>,
    pub limit: Option<u64>,
    pub timeout: Duration,
    pub display: DisplayOptions,
    pub raw: bool,
    pub color: bool,
    /// Log filter forced by a flag; `None` defers to `RUST_LOG`.
    pub log_filter: Option<&'static str>,
}

impl CliOptions {
    /// Convert CLI options to settings.
    ///
    /// Request input (empty URL, malformed JSON, short poll intervals) is
    /// not checked here; the controller reports those itself.
    pub fn into_settings(self) -> Result<Settings> {
        if self.timeout_ms == 0 {
            bail!("--timeout-ms must be greater than zero");
        }
        if self.limit == Some(0) {
            bail!("--limit must be greater than zero");
        }

        let log_filter = if self.debug {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        };

        Ok(Settings {
            form: RequestForm {
                method: self.method,
                url: self.url,
                headers: self.headers,
                body: self.body,
            },
            poll_interval_ms: self.poll,
            limit: self.limit,
            timeout: Duration::from_millis(self.timeout_ms),
            display: DisplayOptions {
                enable_clipboard: self.clipboard,
                display_data_types: self.show_types,
                display_object_size: self.show_size,
            },
            raw: self.raw,
            color: !self.no_color,
            log_filter,
        })
    }
}
