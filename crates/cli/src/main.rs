//! # Mocap Relay CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 参数解析（唯一必填参数为帧源地址）
//! - 帧源、分发器与传输的组装
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::Cli;
use commands::run_relay;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(cli.observability_config())?;

    info!(version = env!("CARGO_PKG_VERSION"), "Mocap Relay starting");

    let result = run_relay(&cli).await;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Relay failed");
    }

    result
}
