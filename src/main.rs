// ================================
// src/main.rs - config, executor, keep-alive task
// ================================
use anyhow::Result;
use gripper_markers::{GripperConfig, GripperNode};
use rclrs::*;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Gripper marker node with Rust");

    let config = GripperConfig::load()?;

    let context = Context::default_from_env()?;
    let mut executor = context.create_basic_executor();
    let gripper = GripperNode::new(&executor, &config)?;

    // keep-alives tell RViz the server is still up; they run beside the executor
    let keep_alive = gripper.keep_alive();
    let period = config.keep_alive_period();
    let keep_alive_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = keep_alive.publish() {
                tracing::error!("Failed to publish keep-alive: {}", e);
            }
        }
    });

    tokio::task::block_in_place(|| executor.spin(SpinOptions::default()).first_error())?;

    keep_alive_handle.abort();
    tracing::info!("Gripper marker node stopped");
    Ok(())
}
