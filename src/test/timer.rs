use crate::timer::{Action, Clock, ManualClock, Millis, Timer};

#[derive(Default)]
struct Log {
    items: Vec<u32>,
}

struct Push(u32);

impl Action<Log> for Push {
    fn execute(self: Box<Self>, _timer: &mut Timer<Log>, world: &mut Log) {
        world.items.push(self.0);
    }
}

struct PushThenScheduleNow {
    id: u32,
    next_id: u32,
}

impl Action<Log> for PushThenScheduleNow {
    fn execute(self: Box<Self>, timer: &mut Timer<Log>, world: &mut Log) {
        world.items.push(self.id);
        timer.add_action(timer.time_offset(), Push(self.next_id));
    }
}

struct ClearAll(u32);

impl Action<Log> for ClearAll {
    fn execute(self: Box<Self>, timer: &mut Timer<Log>, world: &mut Log) {
        world.items.push(self.0);
        timer.clear();
    }
}

#[test]
fn actions_run_by_delay_then_insertion_order() {
    let mut timer = Timer::new();
    timer.add_action(Millis(10), Push(1));
    timer.add_action(Millis(5), Push(2));
    timer.add_action(Millis(10), Push(3));

    let mut log = Log::default();
    timer.start(Millis(1_000));
    assert_eq!(timer.tick(Millis(1_004), &mut log), 0);
    assert_eq!(timer.tick(Millis(1_010), &mut log), 3);

    assert_eq!(log.items, vec![2, 1, 3]);
    assert!(!timer.is_running(), "cursor stops once the queue drains");
    assert_eq!(timer.time_offset(), Millis(10));
}

#[test]
fn negative_delays_fire_on_first_tick() {
    let mut timer = Timer::new();
    timer.add_action(Millis(-50), Push(1));
    timer.add_action(Millis(0), Push(2));
    timer.start(Millis(0));

    let mut log = Log::default();
    assert_eq!(timer.tick(Millis(0), &mut log), 2);
    assert_eq!(log.items, vec![1, 2]);
}

#[test]
fn speed_scales_only_subsequent_progress() {
    let mut timer = Timer::new();
    timer.set_speed(2.0);
    timer.add_action(Millis(100), Push(1));
    timer.add_action(Millis(300), Push(2));
    timer.start(Millis(0));

    let mut log = Log::default();
    timer.tick(Millis(40), &mut log);
    assert!(log.items.is_empty());
    assert_eq!(timer.time_offset(), Millis(80));

    timer.tick(Millis(50), &mut log);
    assert_eq!(log.items, vec![1]);

    timer.set_speed(1.0);
    timer.tick(Millis(150), &mut log);
    assert_eq!(timer.time_offset(), Millis(200));
    assert_eq!(log.items, vec![1]);

    timer.tick(Millis(250), &mut log);
    assert_eq!(log.items, vec![1, 2]);
}

#[test]
fn invalid_speed_is_ignored() {
    let mut timer: Timer<Log> = Timer::new();
    timer.set_speed(0.0);
    timer.set_speed(-1.0);
    timer.set_speed(f64::NAN);
    assert_eq!(timer.speed(), 1.0);
    timer.set_speed(4.0);
    assert_eq!(timer.speed(), 4.0);
}

#[test]
fn clear_drops_everything_and_stops_cursor() {
    let mut timer = Timer::new();
    timer.add_action(Millis(1), Push(1));
    timer.add_action(Millis(2), Push(2));
    timer.start(Millis(0));
    timer.clear();
    assert!(timer.is_empty());
    assert!(!timer.is_running());

    let mut log = Log::default();
    assert_eq!(timer.tick(Millis(1_000), &mut log), 0);
    assert!(log.items.is_empty());

    // 空队列上清空也安全
    timer.clear();
    assert!(timer.is_empty());
}

#[test]
fn action_scheduled_for_now_runs_in_same_tick() {
    let mut timer = Timer::new();
    timer.add_action(Millis(10), PushThenScheduleNow { id: 1, next_id: 2 });
    timer.add_action(Millis(20), Push(3));
    timer.start(Millis(0));

    let mut log = Log::default();
    assert_eq!(timer.tick(Millis(10), &mut log), 2);
    assert_eq!(log.items, vec![1, 2]);
    timer.tick(Millis(20), &mut log);
    assert_eq!(log.items, vec![1, 2, 3]);
}

#[test]
fn clear_inside_action_stops_remaining_due_actions() {
    let mut timer = Timer::new();
    timer.add_action(Millis(5), ClearAll(1));
    timer.add_action(Millis(5), Push(2));
    timer.add_action(Millis(6), Push(3));
    timer.start(Millis(0));

    let mut log = Log::default();
    assert_eq!(timer.tick(Millis(100), &mut log), 1);
    assert_eq!(log.items, vec![1]);
    assert!(timer.is_empty());
}

#[test]
fn wall_until_next_accounts_for_speed() {
    let mut timer: Timer<Log> = Timer::new();
    timer.add_action(Millis(100), Push(1));
    assert_eq!(timer.wall_until_next(), None, "not started");

    timer.set_speed(2.0);
    timer.start(Millis(0));
    assert_eq!(timer.wall_until_next(), Some(Millis(50)));
    assert_eq!(timer.next_delay(), Some(Millis(100)));

    let mut log = Log::default();
    timer.tick(Millis(30), &mut log);
    assert_eq!(timer.wall_until_next(), Some(Millis(20)));
}

#[test]
fn tick_before_start_does_nothing() {
    let mut timer = Timer::new();
    timer.add_action(Millis(0), Push(1));
    let mut log = Log::default();
    assert_eq!(timer.tick(Millis(10), &mut log), 0);
    assert_eq!(timer.len(), 1);
}

#[test]
fn manual_clock_clones_share_time() {
    let clock = ManualClock::new(Millis(100));
    let other = clock.clone();
    clock.advance(Millis(50));
    assert_eq!(other.now(), Millis(150));
    other.set(Millis(7));
    assert_eq!(clock.now(), Millis(7));
    assert_eq!(Millis::from_secs(2), Millis(2_000));
}
