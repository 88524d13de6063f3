//! Send every file of a directory as one frame sequence.
//!
//! Files are sent in name order, numbered from 0 with step 1.
//!
//! ```text
//! cargo run --example receive -- /tmp/frames
//! cargo run --example send -- ./captures 127.0.0.1
//! ```
//!
//! Set `RUST_LOG=framewire=debug` to see every control message.

use std::path::PathBuf;

use framewire::{FrameSender, SenderConfig};
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
    let source = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let address = args.next().unwrap_or_else(|| "127.0.0.1".to_string());

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&source)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut sender = FrameSender::connect(SenderConfig::new(address)).await?;
    sender.announce_total(files.len() as u64).await?;
    sender.announce_increment(1).await?;

    for (number, path) in files.iter().enumerate() {
        sender.send_file(number as u64, path).await?;
    }
    sender.finish().await?;

    println!("sent {} frames from {}", files.len(), source.display());
    Ok(())
}
