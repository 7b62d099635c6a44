use community_realtime::{
    ChannelClient, ChannelEndpoint, ChannelScope, LifecycleEvent, MessageDispatcher,
    OutboundMessage, UiState,
};

/// Watch a user channel: presence, notifications and reconnection notices
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing to see logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let page_url = std::env::var("PAGE_URL").unwrap_or_else(|_| "http://localhost:8000/".into());
    let user_id = std::env::var("USER_ID").expect("USER_ID must be set in .env");

    let endpoint = ChannelEndpoint::from_page_url(&page_url, ChannelScope::User(user_id))?;
    println!("📡 Connecting to: {}\n", endpoint);

    let ui = UiState::new();
    let mut dispatcher = MessageDispatcher::new();
    ui.register(&mut dispatcher);

    let client = ChannelClient::builder(endpoint).dispatcher(dispatcher).build();
    let mut events = client.lifecycle();
    ui.follow(client.lifecycle());

    client.connect().await;
    client.update_status("online").await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(LifecycleEvent::ReconnectScheduled { attempt, delay }) => {
                    println!("⏳ Reconnect attempt {} in {:?}", attempt, delay);
                }
                Ok(LifecycleEvent::ConnectionLost) => {
                    println!("❌ Connection lost, giving up");
                    break;
                }
                Ok(event) => println!("🔔 {:?}", event),
                Err(_) => break,
            },
        }

        for toast in ui.toasts().drain() {
            println!("💬 [{:?}] {}", toast.level, toast.message);
        }
    }

    let snapshot = ui.snapshot();
    println!(
        "\n📊 {} users seen, {} unread notifications",
        snapshot.online.len(),
        snapshot.unread_notifications
    );

    client.send(OutboundMessage::status("offline")).await;
    client.close().await;
    println!("✅ Disconnected");

    Ok(())
}
