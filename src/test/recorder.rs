use std::cell::RefCell;
use std::rc::Rc;

use super::{append_el, page};
use crate::dom::{Document, ReadyState};
use crate::error::{RecordError, SnapshotError};
use crate::event::{Event, EventKind, IncrementalData, ScrollData};
use crate::record::{RecordOptions, Recorder, RecorderState};
use crate::timer::{ManualClock, Millis};

type Log = Rc<RefCell<Vec<(Event, bool)>>>;

fn options(log: &Log) -> RecordOptions {
    let sink = Rc::clone(log);
    RecordOptions::new(move |ev, checkpoint| sink.borrow_mut().push((ev.clone(), checkpoint)))
}

/// 事件类型缩写，便于整体比较
fn kinds(log: &Log) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .map(|(ev, checkpoint)| match (&ev.kind, *checkpoint) {
            (EventKind::Meta { .. }, false) => "meta",
            (EventKind::Meta { .. }, true) => "meta*",
            (EventKind::FullSnapshot { .. }, false) => "full",
            (EventKind::FullSnapshot { .. }, true) => "full*",
            (EventKind::IncrementalSnapshot { data }, _) => match data {
                IncrementalData::Mutation(_) => "mutation",
                IncrementalData::Scroll(_) => "scroll",
                _ => "incremental",
            },
            (EventKind::Loaded, _) => "loaded",
            (EventKind::DomContentLoaded, _) => "dom_content_loaded",
            (EventKind::Custom { .. }, _) => "custom",
        })
        .collect()
}

fn add_div_and_flush(recorder: &mut Recorder, doc: &mut Document) {
    let body = doc.find_element("body").expect("body");
    append_el(doc, body, "div");
    recorder.flush(doc).expect("flush");
}

#[test]
fn every_third_incremental_is_followed_by_a_checkpoint() {
    let (mut doc, _) = page();
    let log: Log = Rc::default();
    let clock = ManualClock::new(Millis(1_000));
    let mut recorder = Recorder::new(options(&log).checkout_every_nth(3), clock.clone());
    recorder.start(&mut doc).expect("start");

    for _ in 0..7 {
        clock.advance(Millis(10));
        add_div_and_flush(&mut recorder, &mut doc);
    }

    assert_eq!(
        kinds(&log),
        vec![
            "meta", "full", "mutation", "mutation", "mutation", "meta*", "full*", "mutation",
            "mutation", "mutation", "meta*", "full*", "mutation",
        ]
    );
    assert_eq!(recorder.incremental_count(), 1);
}

#[test]
fn time_based_checkpoint() {
    let (mut doc, _) = page();
    let log: Log = Rc::default();
    let clock = ManualClock::new(Millis(0));
    let mut recorder = Recorder::new(options(&log).checkout_every_nms(250), clock.clone());
    recorder.start(&mut doc).expect("start");

    for _ in 0..4 {
        clock.advance(Millis(100));
        add_div_and_flush(&mut recorder, &mut doc);
    }

    assert_eq!(
        kinds(&log),
        vec![
            "meta", "full", "mutation", "mutation", "mutation", "meta*", "full*", "mutation",
        ]
    );
    let last_full = log
        .borrow()
        .iter()
        .rev()
        .find(|(ev, _)| ev.is_full_snapshot())
        .map(|(ev, _)| ev.timestamp);
    assert_eq!(last_full, Some(300));
}

#[test]
fn checkpoint_keeps_ids_stable() {
    let (mut doc, body) = page();
    let log: Log = Rc::default();
    let mut recorder = Recorder::new(options(&log).checkout_every_nth(1), ManualClock::default());
    recorder.start(&mut doc).expect("start");
    let body_id = recorder.mirror().get_id(body);

    add_div_and_flush(&mut recorder, &mut doc);
    assert_eq!(recorder.mirror().live_id(body), body_id);
    assert_eq!(kinds(&log), vec!["meta", "full", "mutation", "meta*", "full*"]);
}

#[test]
fn custom_event_requires_started_recorder() {
    let (mut doc, _) = page();
    let log: Log = Rc::default();
    let mut recorder = Recorder::new(options(&log), ManualClock::new(Millis(5)));

    assert_eq!(
        recorder.add_custom_event("early", serde_json::json!(null)),
        Err(RecordError::NotStarted)
    );
    assert!(log.borrow().is_empty());

    recorder.start(&mut doc).expect("start");
    recorder
        .add_custom_event("tag", serde_json::json!({ "k": 1 }))
        .expect("custom");
    let (ev, _) = log.borrow().last().cloned().expect("event");
    match ev.kind {
        EventKind::Custom { data } => {
            assert_eq!(data.tag, "tag");
            assert_eq!(data.payload["k"], 1);
        }
        other => panic!("unexpected {other:?}"),
    }

    recorder.stop(&mut doc).expect("stop");
    assert_eq!(recorder.state(), RecorderState::Stopped);
    assert!(!doc.is_observing());
    assert_eq!(
        recorder.add_custom_event("late", serde_json::json!(null)),
        Err(RecordError::Stopped)
    );
    assert_eq!(recorder.start(&mut doc), Err(RecordError::Stopped));
}

#[test]
fn loading_document_waits_for_load() {
    let (mut doc, _) = page();
    doc.info_mut().ready_state = ReadyState::Loading;
    let log: Log = Rc::default();
    let mut recorder = Recorder::new(options(&log), ManualClock::default());

    recorder.start(&mut doc).expect("start");
    assert_eq!(recorder.state(), RecorderState::WaitingForLoad);
    assert!(log.borrow().is_empty());
    assert!(!doc.is_observing());

    recorder.notify_dom_content_loaded();
    doc.info_mut().ready_state = ReadyState::Complete;
    recorder.notify_loaded(&mut doc).expect("loaded");

    assert_eq!(recorder.state(), RecorderState::Recording);
    assert!(doc.is_observing());
    assert_eq!(
        kinds(&log),
        vec!["dom_content_loaded", "loaded", "meta", "full"]
    );
}

#[test]
fn snapshot_failure_is_reported() {
    let mut doc = Document::default();
    let log: Log = Rc::default();
    let mut recorder = Recorder::new(options(&log), ManualClock::default());
    assert_eq!(
        recorder.start(&mut doc),
        Err(RecordError::Snapshot(SnapshotError::NoDocumentElement))
    );
    // 快照失败时不发出任何事件
    assert!(log.borrow().is_empty());
}

#[test]
fn non_mutation_source_flushes_pending_changes_first() {
    let (mut doc, body) = page();
    let log: Log = Rc::default();
    let mut recorder = Recorder::new(options(&log), ManualClock::default());
    recorder.start(&mut doc).expect("start");

    let div = append_el(&mut doc, body, "div");
    recorder
        .record_incremental(
            &mut doc,
            IncrementalData::Scroll(ScrollData {
                id: crate::dom::NodeId(0),
                x: 0,
                y: 10,
            }),
        )
        .expect("scroll");
    assert_eq!(kinds(&log), vec!["meta", "full", "mutation", "scroll"]);
    assert!(recorder.mirror().live_id(div).is_some());
}

#[test]
fn empty_flush_emits_nothing() {
    let (mut doc, body) = page();
    doc.set_attribute(body, "x", "1").expect("attr");
    let log: Log = Rc::default();
    let mut recorder = Recorder::new(options(&log), ManualClock::default());
    recorder.start(&mut doc).expect("start");

    assert_eq!(recorder.flush(&mut doc), Ok(0));
    doc.set_attribute(body, "x", "1").expect("attr");
    recorder.flush(&mut doc).expect("flush");
    assert_eq!(kinds(&log), vec!["meta", "full"]);
    assert_eq!(recorder.incremental_count(), 0);
}
