//! 回放会话
//!
//! 读取事件流 JSON，用手动时钟离线跑完整个回放，打印元信息与最终文档

use clap::Parser;
use domcast_rs::error::SessionError;
use domcast_rs::event::Event;
use domcast_rs::replay::{PlaybackState, Player, PlayerConfig, PlayerEvent};
use domcast_rs::timer::{ManualClock, Millis};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Parser)]
#[command(name = "replay-session", about = "离线回放事件流 JSON")]
struct Args {
    /// Path to session JSON (array of events)
    #[arg(long)]
    session: PathBuf,
    /// 倍速
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
    /// 从第一个事件之后多少毫秒开始播放
    #[arg(long, default_value_t = 0)]
    offset_ms: i64,
    /// 播放到该位置（毫秒）时暂停一次，再从暂停处恢复
    #[arg(long)]
    pause_at_ms: Option<i64>,
    /// Output player notifications as JSON
    #[arg(long)]
    events_json: Option<PathBuf>,
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

    let raw = fs::read_to_string(&args.session)?;
    let events: Vec<Event> = serde_json::from_str(&raw)?;

    let clock = ManualClock::new(Millis::ZERO);
    let config = PlayerConfig {
        speed: args.speed,
        ..PlayerConfig::default()
    };
    let mut player = Player::new(events, config, clock.clone())?;

    let notes: Rc<RefCell<Vec<PlayerEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&notes);
    player.on(move |ev| sink.borrow_mut().push(*ev));

    player.play(Millis(args.offset_ms))?;
    if let Some(at) = args.pause_at_ms {
        player.run_until(&clock, Millis(at));
        if player.state() == PlaybackState::Playing {
            player.pause()?;
            let resume_at = player.get_current_time();
            player.resume(resume_at)?;
        }
    }
    player.run_to_end(&clock);

    let meta = player.get_meta_data();
    let notes = notes.borrow();
    let cast = notes
        .iter()
        .filter(|n| matches!(n, PlayerEvent::EventCast { .. }))
        .count();
    let doc = player.replayer().document();
    println!("total_time_ms={}", meta.total_time.0);
    println!("state={:?}", player.state());
    println!("events_cast={cast}");
    println!("stranded={}", player.replayer().stranded());
    if let Some(body) = doc.find_element("body") {
        println!("body={}", doc.to_html(body));
    }

    if let Some(path) = args.events_json {
        let json = serde_json::to_string_pretty(&*notes)?;
        fs::write(&path, json)?;
        eprintln!("wrote player notifications to {}", path.display());
    }
    Ok(())
}
