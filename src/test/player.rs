use std::cell::RefCell;
use std::rc::Rc;

use super::replay::{add, base_tree, el, incremental};
use crate::demo::{DemoOpts, record_demo};
use crate::dom::NodeId;
use crate::error::PlaybackError;
use crate::event::{
    Event, EventKind, FullSnapshotData, IncrementalData, MouseMoveData, MousePosition,
    MutationData, ScrollOffset,
};
use crate::replay::{Cursor, PlaybackCommand, PlaybackState, Player, PlayerConfig, PlayerEvent};
use crate::timer::{Clock, ManualClock, Millis};

fn demo_events() -> Vec<Event> {
    let (_, log) = record_demo(&DemoOpts::default()).expect("demo session");
    log.events
}

fn player_with(config: PlayerConfig) -> (Player, ManualClock, Rc<RefCell<Vec<PlayerEvent>>>) {
    let clock = ManualClock::new(Millis(0));
    let mut player = Player::new(demo_events(), config, clock.clone()).expect("player");
    let notes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&notes);
    player.on(move |ev| sink.borrow_mut().push(*ev));
    (player, clock, notes)
}

fn demo_player() -> (Player, ManualClock, Rc<RefCell<Vec<PlayerEvent>>>) {
    player_with(PlayerConfig::default())
}

#[test]
fn meta_data_spans_first_to_last_event() {
    let (player, _, _) = demo_player();
    assert_eq!(player.replayer().events().len(), 15);
    assert_eq!(player.get_meta_data().total_time, Millis(1400));
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[test]
fn empty_session_is_rejected() {
    let res = Player::new(Vec::new(), PlayerConfig::default(), ManualClock::default());
    assert_eq!(res.err(), Some(PlaybackError::NoEvents));
}

#[test]
fn pause_and_resume_reschedule_from_last_played() {
    let (mut player, clock, notes) = demo_player();
    player.play(Millis::ZERO).expect("play");
    assert_eq!(player.pending_actions(), 15);

    player.run_until(&clock, Millis(450));
    assert_eq!(player.get_current_time(), Millis(450));
    assert_eq!(player.replayer().last_played(), Some(5));

    player.pause().expect("pause");
    assert_eq!(player.state(), PlaybackState::Paused);
    assert_eq!(player.pending_actions(), 0);
    // 暂停期间时钟前进不产生任何效果
    clock.advance(Millis(10_000));
    assert_eq!(player.tick(), 0);

    player.resume(Millis(450)).expect("resume");
    assert_eq!(player.pending_actions(), 9);
    assert_eq!(player.get_current_time(), Millis(450));

    clock.advance(Millis(49));
    assert_eq!(player.tick(), 0);
    clock.advance(Millis(1));
    assert_eq!(player.tick(), 1);
    assert_eq!(player.replayer().last_played(), Some(6));

    player.run_to_end(&clock);
    assert_eq!(player.state(), PlaybackState::Finished);
    assert_eq!(player.replayer().last_played(), Some(14));

    let notes = notes.borrow();
    let lifecycle: Vec<PlayerEvent> = notes
        .iter()
        .copied()
        .filter(|ev| {
            matches!(
                ev,
                PlayerEvent::Start | PlayerEvent::Pause | PlayerEvent::Resume | PlayerEvent::Finish
            )
        })
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            PlayerEvent::Start,
            PlayerEvent::Pause,
            PlayerEvent::Resume,
            PlayerEvent::Finish
        ]
    );
    // 每个事件恰好应用一次
    let cast = notes
        .iter()
        .filter(|ev| matches!(ev, PlayerEvent::EventCast { .. }))
        .count();
    assert_eq!(cast, 15);
}

#[test]
fn seek_catches_up_synchronously() {
    let (mut player, _, _) = demo_player();
    player.play(Millis(450)).expect("play");

    assert_eq!(player.replayer().last_played(), Some(5));
    assert_eq!(player.pending_actions(), 9);
    assert_eq!(
        player.replayer().cursor(),
        Cursor {
            x: 80,
            y: 20,
            active: false
        }
    );
    let doc = player.replayer().document();
    let tags: Vec<&str> = player
        .replayer()
        .hovered()
        .iter()
        .filter_map(|&n| doc.tag(n))
        .collect();
    assert_eq!(tags, vec!["h1", "body", "html"]);
}

#[test]
fn catch_up_click_does_not_move_cursor() {
    let (mut player, _, _) = demo_player();
    player.play(Millis(1400)).expect("play");
    assert_eq!(player.replayer().last_played(), Some(13));
    assert_eq!(player.replayer().cursor().x, 80);
    assert!(!player.replayer().cursor().active);
    assert_eq!(player.pending_actions(), 1);
}

#[test]
fn seek_past_end_finishes_immediately() {
    let (mut player, _, notes) = demo_player();
    player.play(Millis(1401)).expect("play");
    assert_eq!(player.state(), PlaybackState::Finished);
    assert_eq!(player.pending_actions(), 0);
    assert!(notes.borrow().contains(&PlayerEvent::Finish));

    // 结束后可以重新播放
    player.play(Millis::ZERO).expect("replay");
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.replayer().last_played(), None);
}

#[test]
fn illegal_commands_are_rejected() {
    let (mut player, _, _) = demo_player();
    assert_eq!(
        player.pause(),
        Err(PlaybackError::IllegalTransition {
            state: PlaybackState::Idle,
            command: PlaybackCommand::Pause,
        })
    );
    assert!(player.resume(Millis::ZERO).is_err());

    player.play(Millis::ZERO).expect("play");
    assert!(player.resume(Millis::ZERO).is_err());
    assert_eq!(player.state(), PlaybackState::Playing);
}

#[test]
fn double_speed_halves_wall_time() {
    let (mut player, clock, _) = player_with(PlayerConfig {
        speed: 2.0,
        ..PlayerConfig::default()
    });
    assert_eq!(player.speed(), 2.0);
    player.play(Millis::ZERO).expect("play");
    clock.advance(Millis(50));
    assert_eq!(player.tick(), 3);
    assert_eq!(player.get_current_time(), Millis(100));

    // 剩余 12 个事件加上 3 个指针采样
    assert_eq!(player.run_to_end(&clock), 15);
    assert_eq!(player.state(), PlaybackState::Finished);
    assert_eq!(clock.now(), Millis(700));
}

#[test]
fn unsorted_input_is_ordered_by_timestamp() {
    let mut events = demo_events();
    events.swap(2, 14);
    let player = Player::new(events, PlayerConfig::default(), ManualClock::default())
        .expect("player");
    let ts: Vec<i64> = player.replayer().events().iter().map(|e| e.timestamp).collect();
    assert!(ts.windows(2).all(|w| w[0] <= w[1]));
}

/// 全量快照 @0、新增 `<p>` @100、指针轨迹 @200（采样点 -150/-100/0）
fn early_pointer_session() -> Vec<Event> {
    let positions = [(1, 1, 5, -150), (2, 2, 7, -100), (3, 3, 7, 0)]
        .map(|(x, y, id, time_offset)| MousePosition {
            x,
            y,
            id: NodeId(id),
            time_offset,
        })
        .to_vec();
    vec![
        Event::new(
            0,
            EventKind::FullSnapshot {
                data: FullSnapshotData {
                    node: base_tree(),
                    offset: ScrollOffset::default(),
                },
            },
        ),
        incremental(
            100,
            IncrementalData::Mutation(MutationData {
                adds: vec![add(4, None, el(9, "p", vec![]))],
                ..MutationData::default()
            }),
        ),
        incremental(200, IncrementalData::MouseMove(MouseMoveData { positions })),
    ]
}

#[test]
fn finish_waits_for_every_scheduled_action() {
    let clock = ManualClock::new(Millis(0));
    let mut player =
        Player::new(early_pointer_session(), PlayerConfig::default(), clock.clone())
            .expect("player");
    let notes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&notes);
    player.on(move |ev| sink.borrow_mut().push(*ev));

    player.play(Millis::ZERO).expect("play");
    // 最后一个事件按首个采样点在 50ms 执行，早于 100ms 的变更
    clock.advance(Millis(50));
    player.tick();
    assert_eq!(player.replayer().last_played(), Some(2));
    assert_eq!(player.state(), PlaybackState::Playing);

    player.run_to_end(&clock);
    assert_eq!(player.state(), PlaybackState::Finished);
    assert_eq!(player.pending_actions(), 0);
    assert!(player.replayer().mirror().has(NodeId(9)));
    assert_eq!(
        player.replayer().cursor(),
        Cursor {
            x: 3,
            y: 3,
            active: false
        }
    );
    let finishes = notes
        .borrow()
        .iter()
        .filter(|ev| **ev == PlayerEvent::Finish)
        .count();
    assert_eq!(finishes, 1);
    assert_eq!(notes.borrow().last(), Some(&PlayerEvent::Finish));
}

#[test]
fn resume_schedules_events_not_yet_applied() {
    let clock = ManualClock::new(Millis(0));
    let mut player =
        Player::new(early_pointer_session(), PlayerConfig::default(), clock.clone())
            .expect("player");
    player.play(Millis::ZERO).expect("play");
    player.run_until(&clock, Millis(60));
    assert!(player.replayer().is_cast(2));
    assert!(!player.replayer().is_cast(1));

    player.pause().expect("pause");
    player.resume(Millis(60)).expect("resume");
    assert_eq!(player.pending_actions(), 1);
    player.run_to_end(&clock);
    assert_eq!(player.state(), PlaybackState::Finished);
    assert!(player.replayer().mirror().has(NodeId(9)));
}

#[test]
fn seek_past_end_reports_start_before_finish() {
    let (mut player, _, notes) = demo_player();
    player.play(Millis(1401)).expect("play");
    let lifecycle: Vec<PlayerEvent> = notes
        .borrow()
        .iter()
        .copied()
        .filter(|ev| matches!(ev, PlayerEvent::Start | PlayerEvent::Finish))
        .collect();
    assert_eq!(lifecycle, vec![PlayerEvent::Start, PlayerEvent::Finish]);
}
