//! Accept one sender and store its frames in a directory.
//!
//! ```text
//! cargo run --example receive -- /tmp/frames [port]
//! ```

use framewire::{FrameReceiver, ReceiverConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,framewire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let destination = args.next().unwrap_or_else(|| "frames".to_string());
    let mut config = ReceiverConfig::new(destination);
    if let Some(port) = args.next() {
        config = config.port(port.parse()?);
    }

    let mut receiver = FrameReceiver::listen(config).await?;
    let summary = receiver.receive_sequence(0).await?;
    receiver.finish().await?;

    for frame in &summary.frames {
        if let Some(path) = &frame.path {
            println!("frame {:>4}  {:>8} bytes  {}", frame.number, frame.size, path.display());
        }
    }
    println!("{} frames, {} bytes", summary.frames.len(), summary.total_bytes());
    Ok(())
}
