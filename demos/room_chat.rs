use community_realtime::{PageConfig, PageSession};
use std::time::Duration;

/// Join a chat room through a page session, type, send and leave
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let config = PageConfig {
        page_url: std::env::var("PAGE_URL").unwrap_or_else(|_| "http://localhost:8000/".into()),
        user_id: std::env::var("USER_ID").ok(),
        csrf_token: std::env::var("CSRF_TOKEN").expect("CSRF_TOKEN must be set in .env"),
        store_path: Some("community-realtime.json".into()),
        options: Default::default(),
    };
    let room_id = std::env::var("ROOM_ID").expect("ROOM_ID must be set in .env");

    let session = PageSession::bootstrap(config).await?;
    println!("🎨 Theme: {:?}", session.store().theme());

    let room = session.open_room(&room_id).await?;
    println!("✅ Joined {}", room.endpoint());

    room.notify_typing().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    room.send_chat("Hello from Rust 🦀", None).await;

    // The idle timer sends typing:false on its own
    tokio::time::sleep(Duration::from_secs(4)).await;

    let read = session.collaborator().mark_room_read(&room_id).await;
    session.surface(read);

    for message in session.ui().snapshot().transcript {
        println!("  {}: {}", message.sender.name, message.content);
    }
    for toast in session.ui().toasts().drain() {
        println!("💬 {}", toast.message);
    }

    session.teardown().await?;
    println!("👋 Left");
    Ok(())
}
