//! Main event loop for the console front end.
//!
//! Multiplexes stdin lines, background task events, context events from
//! the hosted pages, pending dialog questions and argv forwarded by later
//! invocations.

use std::collections::VecDeque;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::dialogs::Question;
use super::input::handle_line;
use crate::app::{Action, App, AppEvent, AppNotice};
use crate::session::ContextEnvelope;

/// Receivers the loop drains.
pub struct Channels {
    pub event_rx: mpsc::Receiver<AppEvent>,
    pub context_rx: mpsc::UnboundedReceiver<ContextEnvelope>,
    pub questions: mpsc::UnboundedReceiver<Question>,
    pub notices: mpsc::UnboundedReceiver<AppNotice>,
    /// Argument lists forwarded by second invocations.
    pub instance_rx: mpsc::UnboundedReceiver<Vec<String>>,
}

fn print_notice(notice: &AppNotice) {
    match notice {
        AppNotice::LandingShown => println!("No server selected. Type 'add <url>' or 'help'."),
        AppNotice::LandingHidden => {}
        AppNotice::HostRejected { url, reason } => println!("Could not add {}: {}", url, reason),
        AppNotice::ExternalOpened(url) => println!("Opened {} in the browser", url),
        AppNotice::ScreenshareAnswered(source) => println!("Screen share: {}", source),
    }
}

/// Runs the console event loop until the user quits or a signal arrives.
///
/// While a dialog question is pending, the next typed line answers it
/// instead of being parsed as a command. Questions are asked one at a time
/// in the order they were raised.
pub async fn run(app: &mut App, channels: Channels) -> Result<()> {
    let Channels {
        mut event_rx,
        mut context_rx,
        mut questions,
        mut notices,
        mut instance_rx,
    } = channels;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut pending: VecDeque<Question> = VecDeque::new();

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        while let Ok(notice) = notices.try_recv() {
            print_notice(&notice);
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(question) = pending.pop_front() {
                            app.touch();
                            if question.reply.send(line).is_err() {
                                tracing::debug!("Dialog answer dropped (asker gone)");
                            }
                            if let Some(next) = pending.front() {
                                println!("{}", next.text);
                            }
                        } else if handle_line(app, &line) == Action::Quit {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("stdin closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed reading stdin");
                        stdin_open = false;
                    }
                }
            }

            Some(question) = questions.recv() => {
                if pending.is_empty() {
                    println!("{}", question.text);
                }
                pending.push_back(question);
            }

            Some(event) = event_rx.recv() => {
                if app.handle_app_event(event) == Action::Quit {
                    break;
                }
            }

            Some(envelope) = context_rx.recv() => {
                app.handle_context_event(envelope);
            }

            Some(argv) = instance_rx.recv() => {
                tracing::info!(args = argv.len(), "Second instance forwarded arguments");
                if app.handle_app_event(AppEvent::InstanceArgs(argv)) == Action::Quit {
                    break;
                }
            }
        }
    }

    while let Ok(notice) = notices.try_recv() {
        print_notice(&notice);
    }
    Ok(())
}
