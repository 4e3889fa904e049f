// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use args::Args;
use clap::Parser;
use edgefirst_relay::{
    control::Command,
    controller::{Relay, RelayOptions},
    sunxi::{DeviceConfig, Sunxi},
};
use kanal::{ReceiveErrorTimeout, Receiver, Sender};
use serde_json::json;
use std::{error::Error, thread, time::Duration};
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, Layer, Registry};
use zenoh::config::Config;

mod args;

/// How often the controller checks for a relay that stopped on its own.
const REAP_INTERVAL: Duration = Duration::from_millis(200);

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let console = args.tokio_console.then(console_subscriber::spawn::<Registry>);
    let stdout = tracing_subscriber::fmt::layer().with_filter(level);
    let journald = tracing_journald::layer()
        .ok()
        .map(|layer| layer.with_filter(level));
    let tracy = args.tracy.then(|| {
        tracy_client::Client::start();
        tracing_tracy::TracyLayer::default()
    });

    let subscriber = tracing_subscriber::registry()
        .with(console)
        .with(stdout)
        .with(journald)
        .with(tracy);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    init_tracing(&args)?;
    info!("EdgeFirst Relay");

    let platform = Sunxi::new(DeviceConfig::from(&args));
    let relay = Relay::init(platform, RelayOptions::from(&args))?;

    let session = zenoh::open(Config::from(args.clone())).await?;
    let subscriber = session.declare_subscriber(&args.control_topic).await?;

    let (cmd_tx, cmd_rx) = kanal::bounded(16);
    let (status_tx, status_rx) = kanal::bounded(16);
    let status_rx = status_rx.to_async();

    let controller = thread::Builder::new()
        .name("controller".to_owned())
        .spawn(move || control(relay, cmd_rx, status_tx))?;

    if !args.idle {
        cmd_tx.send(Command::Start(args.channel_config()))?;
    }

    let cmd_tx = cmd_tx.to_async();
    loop {
        tokio::select! {
            sample = subscriber.recv_async() => {
                let sample = sample?;
                let payload = sample.payload().to_bytes();
                match Command::decode(&payload) {
                    Ok(cmd) => {
                        debug!(?cmd, "control");
                        cmd_tx.send(cmd).await?;
                        if cmd == Command::Exit {
                            break;
                        }
                    }
                    Err(e) => warn!("invalid control message: {e}"),
                }
            }
            status = status_rx.recv() => {
                match status {
                    Ok(status) => session.put(&args.status_topic, status).await?,
                    // controller thread exited
                    Err(_) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                cmd_tx.send(Command::Exit).await?;
                break;
            }
        }
    }

    drop(cmd_tx);
    if controller.join().is_err() {
        warn!("controller thread panicked");
    }
    while let Ok(Some(status)) = status_rx.try_recv() {
        session.put(&args.status_topic, status).await?;
    }
    session.close().await?;

    Ok(())
}

/// Owns the relay and applies controller commands until told to exit.
fn control(mut relay: Relay<Sunxi>, commands: Receiver<Command>, status: Sender<String>) {
    publish(&relay, None, &status);

    loop {
        let cmd = match commands.recv_timeout(REAP_INTERVAL) {
            Ok(Command::Exit) => break,
            Ok(cmd) => cmd,
            Err(ReceiveErrorTimeout::Timeout) => {
                if let Some(outcome) = relay.reap() {
                    publish(&relay, outcome.err(), &status);
                }
                continue;
            }
            Err(_) => break,
        };

        let outcome = match cmd {
            Command::Start(config) => relay.start(config),
            Command::Pause => {
                relay.pause();
                Ok(())
            }
            Command::Run => {
                relay.run();
                Ok(())
            }
            Command::Stop => relay.stop().map(|_| ()),
            Command::Exit => Ok(()),
        };
        if let Err(e) = &outcome {
            warn!(?cmd, "{e}");
        }
        publish(&relay, outcome.err(), &status);
    }

    if let Err(e) = relay.stop() {
        warn!("{e}");
    }
    publish(&relay, None, &status);
}

fn publish(relay: &Relay<Sunxi>, error: Option<edgefirst_relay::Error>, status: &Sender<String>) {
    let screen = relay.screen();
    let msg = json!({
        "state": relay.state().as_str(),
        "channel": relay.config().map(|c| c.channel),
        "screen": { "width": screen.width, "height": screen.height },
        "error": error.map(|e| e.to_string()),
    });
    if status.try_send(msg.to_string()).is_err() {
        debug!("status dropped");
    }
}
