//! `probe`: send an HTTP request from the terminal and show the JSON
//! response, once or on a repeating timer.

mod options;
mod render;

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use probe_core::{Controller, Notifier, ResponseView, UreqClient};
use tokio::sync::{mpsc, watch};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use options::{CliOptions, Settings};

/// Prints notifications to stderr. The terminal equivalent of a blocking
/// alert: the user sees it whatever the log level. Each one is also
/// signalled on `failures` so a polling run can count failed ticks.
struct StderrNotifier {
    failures: mpsc::UnboundedSender<()>,
}

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {message}", "error:".red().bold());
        let _ = self.failures.send(());
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = CliOptions::parse().into_settings()?;
    init_logging(settings.log_filter);
    if !settings.color {
        colored::control::set_override(false);
    }

    let client = UreqClient::with_timeout(settings.timeout);
    let (failures_tx, mut failures) = mpsc::unbounded_channel();
    let notifier = StderrNotifier {
        failures: failures_tx,
    };
    let mut controller = Controller::new(client, Arc::new(notifier));
    controller.set_method(settings.form.method);
    controller.set_url(settings.form.url.clone());
    controller.set_headers(settings.form.headers.clone());
    controller.set_body(settings.form.body.clone());
    *controller.display_mut() = settings.display;

    let code = match settings.poll_interval_ms {
        None => run_once(&mut controller, &settings).await,
        Some(interval_ms) => {
            run_polling(&mut controller, &mut failures, &settings, interval_ms).await?
        }
    };
    controller.shutdown();
    Ok(code)
}

fn init_logging(forced: Option<&str>) {
    let filter = match forced {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_once(controller: &mut Controller, settings: &Settings) -> ExitCode {
    // Failures have already been reported by the notifier.
    match controller.submit().await {
        Ok(_) => {
            show(&controller.response(), settings, None);
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run_polling(
    controller: &mut Controller,
    failures: &mut mpsc::UnboundedReceiver<()>,
    settings: &Settings,
    interval_ms: u64,
) -> Result<ExitCode> {
    if controller.enable_polling().is_err() {
        return Ok(ExitCode::FAILURE);
    }
    controller.set_poll_interval(interval_ms)?;
    if controller.confirm_polling().is_err() {
        controller.cancel_polling_prompt()?;
        return Ok(ExitCode::FAILURE);
    }

    while failures.try_recv().is_ok() {}
    let mut responses = controller.subscribe();
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    follow(&mut responses, failures, settings.limit, ctrl_c, |view| {
        show(view, settings, Some(controller.poll_state().count));
    })
    .await;

    controller.disable_polling();
    eprintln!(
        "{}",
        format!("stopped after {} ticks", controller.poll_state().count).dimmed()
    );
    Ok(ExitCode::SUCCESS)
}

/// Hand each published response to `on_view` until `limit` ticks have
/// settled or `stop` resolves. A tick settles when its response is
/// published or its failure is notified. Returns the settled count.
async fn follow(
    responses: &mut watch::Receiver<ResponseView>,
    failures: &mut mpsc::UnboundedReceiver<()>,
    limit: Option<u64>,
    stop: impl Future<Output = ()>,
    mut on_view: impl FnMut(&ResponseView),
) -> u64 {
    tokio::pin!(stop);
    let mut settled = 0u64;

    loop {
        tokio::select! {
            changed = responses.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = responses.borrow_and_update().clone();
                on_view(&view);
            }
            Some(()) = failures.recv() => {}
            _ = &mut stop => {
                debug!("interrupted");
                break;
            }
        }
        settled += 1;
        if limit.is_some_and(|limit| settled >= limit) {
            debug!(settled, "tick limit reached");
            break;
        }
    }
    settled
}

fn show(view: &ResponseView, settings: &Settings, polled: Option<u64>) {
    if settings.raw {
        println!("{}", render::render_raw(&view.state));
        return;
    }
    let header = render::status_line(view, polled);
    if !header.is_empty() {
        println!("{header}");
    }
    print!("{}", render::render(&view.state, settings.display));
    if view.state.is_empty() {
        println!();
    }
    // Keep successive polls apart.
    if polled.is_some() {
        println!();
    }
}
