//! 录制演示会话
//!
//! 跑一遍脚本化的文档操作，把事件流写成 JSON 数组

use clap::Parser;
use domcast_rs::demo::{DemoOpts, record_demo};
use domcast_rs::error::SessionError;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "record-demo", about = "录制脚本化演示会话，输出事件流 JSON")]
struct Args {
    /// Output session JSON file
    #[arg(long)]
    out: PathBuf,
    /// 每 N 条增量事件补一次全量快照
    #[arg(long)]
    checkout_every_nth: Option<u32>,
    /// 距上次全量快照超过多少毫秒后补一次全量快照
    #[arg(long)]
    checkout_every_nms: Option<i64>,
}

fn main() -> Result<(), SessionError> {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let opts = DemoOpts {
        checkout_every_nth: args.checkout_every_nth,
        checkout_every_nms: args.checkout_every_nms,
        ..DemoOpts::default()
    };
    let (_doc, log) = record_demo(&opts)?;

    let json = serde_json::to_string_pretty(&log.events)?;
    fs::write(&args.out, json)?;
    println!(
        "done: events={}, checkpoints={}",
        log.events.len(),
        log.checkpoints
    );
    eprintln!("wrote session to {}", args.out.display());
    Ok(())
}
