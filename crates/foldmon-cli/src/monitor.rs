//! Monitor loop: keep one client connected and log what it reports.

use foldmon_client::{
    ClientConfig, ClientEvent, FahClient, MessageEvent, ReconnectPolicy, TypedMessage,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::config::MonitorConfig;

/// Run until Ctrl-C or until the client gives up reconnecting.
pub async fn run(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = FahClient::new(ClientConfig::from_env()?);
    let policy = ReconnectPolicy::default();
    let mut events = client.subscribe();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        _ = &mut shutdown => return Ok(()),
        result = connect(&client, &config, &policy) => result?,
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(ClientEvent::Message(event)) => info!("{}", describe(&event)),
                Ok(ClientEvent::ConnectedChanged { connected: false }) => {
                    warn!("Lost connection to {}:{}", config.host, config.port);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        result = connect(&client, &config, &policy) => result?,
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Monitor fell behind, skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.close().await;
    Ok(())
}

async fn connect(
    client: &FahClient,
    config: &MonitorConfig,
    policy: &ReconnectPolicy,
) -> foldmon_client::Result<()> {
    client
        .connect_with_retry(&config.host, config.port, &config.password, policy)
        .await?;
    client.subscribe_updates(config.update_interval).await
}

/// One-line summary of a message.
pub fn describe(event: &MessageEvent) -> String {
    let key = event.message.key();
    match &event.typed {
        Some(TypedMessage::Heartbeat(heartbeat)) => format!("heartbeat {}", heartbeat.sequence),
        Some(TypedMessage::Info(info)) => format!(
            "info: FAHClient {} on {}",
            info.client_version().unwrap_or("?"),
            info.os().unwrap_or("?")
        ),
        Some(TypedMessage::Options(options)) => format!(
            "options: user {} team {}",
            options.user.as_deref().unwrap_or("Anonymous"),
            options.team.as_deref().unwrap_or("0")
        ),
        Some(TypedMessage::SimulationInfo(sim)) => match sim.percent_done() {
            Some(percent) => format!("simulation-info: {:.1}% done", percent),
            None => "simulation-info: no progress yet".to_string(),
        },
        Some(TypedMessage::Slots(slots)) => {
            let states: Vec<String> = slots
                .iter()
                .map(|slot| format!("{} {:?}", slot.id.as_deref().unwrap_or("??"), slot.status))
                .collect();
            format!("slots: {}", states.join(", "))
        }
        Some(TypedMessage::SlotOptions(_)) => "slot-options updated".to_string(),
        Some(TypedMessage::Units(units)) => {
            let running: Vec<String> = units
                .iter()
                .filter(|unit| unit.is_running())
                .filter_map(|unit| {
                    let prcg = unit.prcg()?;
                    Some(match unit.percentdone {
                        Some(done) => format!("{} {:.2}%", prcg, done),
                        None => prcg,
                    })
                })
                .collect();
            format!(
                "units: {} queued, running [{}]",
                units.len(),
                running.join(", ")
            )
        }
        Some(TypedMessage::LogRestart(log)) => {
            format!("log restarted with {} lines", log.lines().count())
        }
        Some(TypedMessage::LogUpdate(log)) => match log.lines().last() {
            Some(line) => format!("log: {}", line),
            None => "log: (empty)".to_string(),
        },
        Some(TypedMessage::Other(_)) | None => {
            format!("{}: {} bytes", key, event.message.value().len())
        }
    }
}
