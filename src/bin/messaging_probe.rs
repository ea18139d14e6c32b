//! Connects to the realtime endpoints and prints what the router makes of
//! every frame. Usage: `messaging-probe [thread_id] [text]`
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};

use marketplace_messaging::client::config::ClientConfig;
use marketplace_messaging::client::models::frames::OutboundFrame;
use marketplace_messaging::client::services::connection_registry::{
    ChannelKey, ChannelState, ConnectionRegistry, RegistryEvent, WsConnector,
};
use marketplace_messaging::client::services::event_router::EventRouter;
use marketplace_messaging::utils::logger;

#[tokio::main]
async fn main() -> Result<()> {
    logger::init(&ClientConfig::log_level_from_env());
    let config = ClientConfig::from_env();
    info!("[PROBE] ws base {} as user {:?}", config.ws_base, config.user_id);

    let mut args = std::env::args().skip(1);
    let thread = args.next();
    let say = args.next();

    let (registry, mut events) = ConnectionRegistry::init(config.registry_config(), Arc::new(WsConnector));
    let router = EventRouter::new(config.user_id.clone());

    let notifications = ChannelKey::Notifications;
    let url = config
        .channel_url(&notifications)
        .context("building notification channel url")?;
    registry.connect(notifications, url).await;

    let thread_channel = thread.map(ChannelKey::Thread);
    if let Some(channel) = &thread_channel {
        let url = config.channel_url(channel).context("building chat channel url")?;
        registry.connect(channel.clone(), url).await;
    }
    let mut pending_say = say;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("[PROBE] interrupted, tearing down");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    RegistryEvent::StateChanged { channel, state } => {
                        info!("[PROBE] {} -> {:?}", channel, state);
                        if state == ChannelState::Open && Some(&channel) == thread_channel.as_ref() {
                            if let Some(text) = pending_say.take() {
                                let frame = OutboundFrame::Message { message: text };
                                if let Err(e) = registry.send(&channel, &frame).await {
                                    error!("[PROBE] send on {} failed: {}", channel, e);
                                }
                            }
                        }
                    }
                    RegistryEvent::Frame { channel, text } => match router.route(&channel, &text) {
                        Some(routed) => info!("[PROBE] {}: {:?}", channel, routed),
                        None => warn!("[PROBE] {}: nothing routed from {}", channel, text),
                    },
                }
            }
        }
    }

    registry.teardown().await;
    Ok(())
}
