//! # Record / Playback Tests
//!
//! Records sessions to real log files and plays them back into fresh
//! kernels:
//!
//! 1. **Log layout**: entry count, keyframe offset, tag link
//! 2. **Round trip**: playback reproduces the recorded payloads byte for byte
//! 3. **Jumps**: jumping to the same keyframe twice yields the same world
//! 4. **Timing**: entries come back at their recorded simulation times
//! 5. **Damage**: a truncated log plays up to its last complete entry
//! 6. **Same kernel**: a kernel replays its own recording, actors included
//!
//! Run with: cargo test --test record_playback

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chronicle::kernel::DefaultMessageProcessor;
use chronicle::model::{encode_message, types, ActorId, ActorSnapshot};
use chronicle::replay::{LogControllerConfig, LogStreamReader, PlaybackRate};
use chronicle::{
    ActorType, Component, ComponentError, ComponentPriority, Kernel, KernelContext, LogController, LogState, Message,
    MessageType, Ownership, ParamValue,
};
use parking_lot::Mutex;

const PING: MessageType = MessageType::new(types::USER_DEFINED_START, "Ping", "Test");
const DT: f64 = 0.1;

fn temp_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("chronicle_it_{label}_{nanos}"))
}

/// Keeps the encoded form and dispatch time of every test message it sees.
struct RecordingObserver {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    times: Arc<Mutex<Vec<f64>>>,
}

impl Component for RecordingObserver {
    fn name(&self) -> &str {
        "recording_observer"
    }

    fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if message.is(PING) {
            self.payloads.lock().push(encode_message(message).map_err(ComponentError::other)?);
            self.times.lock().push(ctx.sim_time());
        }
        Ok(())
    }
}

#[derive(Default)]
struct Observed {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    times: Arc<Mutex<Vec<f64>>>,
}

impl Observed {
    fn component(&self) -> RecordingObserver {
        RecordingObserver {
            payloads: Arc::clone(&self.payloads),
            times: Arc::clone(&self.times),
        }
    }
}

fn kernel(dir: &Path, observed: &Observed) -> Kernel {
    let mut kernel = Kernel::new();
    kernel.register_message_type(PING).unwrap();
    kernel
        .add_component(DefaultMessageProcessor::new(), ComponentPriority::Highest)
        .unwrap();
    let config = LogControllerConfig {
        log_dir: dir.to_path_buf(),
        auto_keyframe_interval: 0.0,
        playback_rate: PlaybackRate::Scaled(1.0),
        ..LogControllerConfig::default()
    };
    kernel
        .add_component(LogController::new(config), ComponentPriority::Normal)
        .unwrap();
    kernel.add_component(observed.component(), ComponentPriority::Lowest).unwrap();
    kernel
}

fn log<R>(kernel: &mut Kernel, f: impl FnOnce(&mut LogController, &mut KernelContext) -> R) -> R {
    kernel.with_component::<LogController, _, _>(f).unwrap()
}

fn send_ping(kernel: &mut Kernel, n: i64) {
    let msg = kernel.create_message(PING).with("n", n);
    kernel.send_message(msg);
}

/// Records pings `0..count`, one per tick, with keyframe `k1` after
/// `keyframe_after` pings.
fn record(kernel: &mut Kernel, name: &str, count: i64, keyframe_after: i64) {
    log(kernel, |c, ctx| c.start_record(ctx, name)).unwrap();
    for n in 0..count {
        if n == keyframe_after {
            log(kernel, |c, ctx| c.create_keyframe(ctx, "k1", "checkpoint")).unwrap();
        }
        send_ping(kernel, n);
        kernel.tick(DT, DT);
    }
    log(kernel, |c, ctx| c.stop(ctx)).unwrap();
}

fn world(kernel: &Kernel) -> Vec<ActorSnapshot> {
    kernel.context().snapshot_actors(|_| true)
}

#[test]
fn record_five_messages_with_keyframe() {
    let dir = temp_dir("layout");
    let observed = Observed::default();
    let mut k = kernel(&dir, &observed);

    record(&mut k, "layout", 5, 3);

    let mut reader = LogStreamReader::open(&dir, "layout").unwrap();
    assert!(reader.is_indexed());
    assert_eq!(reader.keyframes().len(), 1);
    let tag = reader.tags().get("k1").unwrap();
    let keyframe = reader.keyframes().get(0).unwrap().clone();
    assert_eq!(tag.keyframe_micros, Some(keyframe.timestamp_micros));

    let mut offsets = Vec::new();
    loop {
        let offset = reader.position();
        match reader.next_entry().unwrap() {
            Some(_) => offsets.push(offset),
            None => break,
        }
    }
    assert_eq!(offsets.len(), 5);
    assert!(keyframe.offset > offsets[2] && keyframe.offset <= offsets[3]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn playback_reproduces_recorded_payloads() {
    let dir = temp_dir("roundtrip");
    let live = Observed::default();
    let mut recorder = kernel(&dir, &live);
    record(&mut recorder, "roundtrip", 8, 4);

    let replayed = Observed::default();
    let mut player = kernel(&dir, &replayed);
    log(&mut player, |c, ctx| c.start_playback(ctx, "roundtrip")).unwrap();
    for _ in 0..12 {
        player.tick(DT, DT);
    }

    assert_eq!(replayed.payloads.lock().len(), 8);
    assert_eq!(*replayed.payloads.lock(), *live.payloads.lock());

    let status = log(&mut player, |c, _| c.status());
    assert_eq!(status.state, LogState::Playback);
    assert!(status.end_of_messages);

    log(&mut player, |c, ctx| c.stop(ctx)).unwrap();
    assert_eq!(log(&mut player, |c, _| c.state()), LogState::Idle);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn jump_to_keyframe_is_idempotent() {
    let dir = temp_dir("jump");
    let observed = Observed::default();
    let mut recorder = kernel(&dir, &observed);

    let tank = recorder
        .create_actor(ActorType::new("Vehicle", "Tank"), Ownership::Local)
        .unwrap();
    recorder.actor_mut(tank).unwrap().set("x", 1);
    recorder.tick(DT, DT);

    log(&mut recorder, |c, ctx| c.start_record(ctx, "jump")).unwrap();
    recorder.tick(DT, DT);
    log(&mut recorder, |c, ctx| c.create_keyframe(ctx, "k1", "")).unwrap();
    for x in 2..5 {
        recorder.actor_mut(tank).unwrap().set("x", x);
        let update = recorder.context_mut().actor_update_message(tank).unwrap();
        recorder.send_message(update);
        recorder.tick(DT, DT);
    }
    log(&mut recorder, |c, ctx| c.stop(ctx)).unwrap();

    let mut player = kernel(&dir, &Observed::default());
    log(&mut player, |c, ctx| c.start_playback(ctx, "jump")).unwrap();
    for _ in 0..6 {
        player.tick(DT, DT);
    }
    let x = |k: &Kernel| k.find_actor(tank).unwrap().get("x").and_then(ParamValue::as_i64);
    assert_eq!(x(&player), Some(4));
    assert!(player.find_actor(tank).unwrap().is_remote());

    log(&mut player, |c, ctx| c.jump_to_keyframe(ctx, 0)).unwrap();
    let first = world(&player);
    log(&mut player, |c, ctx| c.jump_to_keyframe(ctx, 0)).unwrap();
    let second = world(&player);

    assert_eq!(first, second);
    assert_eq!(x(&player), Some(1));

    // Playback resumes from the keyframe.
    for _ in 0..6 {
        player.tick(DT, DT);
    }
    assert_eq!(x(&player), Some(4));

    log(&mut player, |c, ctx| c.jump_to_tag(ctx, "k1")).unwrap();
    assert_eq!(world(&player), first);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn playback_keeps_recorded_spacing() {
    const N: usize = 10;
    let dir = temp_dir("timing");
    let live = Observed::default();
    let mut recorder = kernel(&dir, &live);
    record(&mut recorder, "timing", N as i64, i64::MAX);

    let replayed = Observed::default();
    let mut player = kernel(&dir, &replayed);
    log(&mut player, |c, ctx| c.start_playback(ctx, "timing")).unwrap();
    for _ in 0..N + 2 {
        player.tick(DT, DT);
    }

    let times = replayed.times.lock().clone();
    assert_eq!(times.len(), N);
    let span = times[N - 1] - times[0];
    assert!((span - (N - 1) as f64 * DT).abs() < 1e-6, "span {span}");
    for pair in times.windows(2) {
        assert!((pair[1] - pair[0] - DT).abs() < 1e-6);
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn truncated_log_plays_to_last_complete_entry() {
    let dir = temp_dir("truncated");
    let mut recorder = kernel(&dir, &Observed::default());
    record(&mut recorder, "cut", 5, i64::MAX);

    let data_end = LogStreamReader::open(&dir, "cut").unwrap().data_end();
    let path = dir.join("cut.aarlog");
    let bytes = std::fs::read(&path).unwrap();
    let cut = usize::try_from(data_end).unwrap() - 3;
    std::fs::write(&path, &bytes[..cut]).unwrap();

    let replayed = Observed::default();
    let mut player = kernel(&dir, &replayed);
    log(&mut player, |c, ctx| c.start_playback(ctx, "cut")).unwrap();
    for _ in 0..8 {
        player.tick(DT, DT);
    }

    assert_eq!(replayed.payloads.lock().len(), 4);
    let status = log(&mut player, |c, _| c.status());
    assert_eq!(status.state, LogState::Playback);
    assert!(status.end_of_messages);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn same_kernel_replays_actors_created_while_recording() {
    let dir = temp_dir("same_kernel");
    let mut k = kernel(&dir, &Observed::default());

    log(&mut k, |c, ctx| c.start_record(ctx, "own")).unwrap();
    k.tick(DT, DT);
    let jeep: ActorId = k.create_actor(ActorType::new("Vehicle", "Jeep"), Ownership::Local).unwrap();
    k.tick(DT, DT);
    k.actor_mut(jeep).unwrap().set("x", 7);
    let update = k.context_mut().actor_update_message(jeep).unwrap();
    k.send_message(update);
    k.tick(DT, DT);
    k.delete_actor(jeep).unwrap();
    k.tick(DT, DT);
    k.tick(DT, DT);
    log(&mut k, |c, ctx| c.stop(ctx)).unwrap();
    assert!(k.find_actor(jeep).is_err());

    let machine = log(&mut k, |c, _| c.playback_machine());
    assert_ne!(machine, k.context().machine_id());

    log(&mut k, |c, ctx| c.start_playback(ctx, "own")).unwrap();
    let mut trace = Vec::new();
    for _ in 0..6 {
        k.tick(DT, DT);
        trace.push(
            k.find_actor(jeep)
                .ok()
                .map(|a| (a.is_remote(), a.get("x").and_then(ParamValue::as_i64))),
        );
    }

    assert!(trace.contains(&Some((true, None))), "{trace:?}");
    assert!(trace.contains(&Some((true, Some(7)))), "{trace:?}");
    assert_eq!(trace.last(), Some(&None), "{trace:?}");

    log(&mut k, |c, ctx| c.stop(ctx)).unwrap();
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn record_refused_during_playback() {
    let dir = temp_dir("refuse");
    let mut recorder = kernel(&dir, &Observed::default());
    record(&mut recorder, "one", 1, i64::MAX);

    log(&mut recorder, |c, ctx| c.start_playback(ctx, "one")).unwrap();
    assert!(log(&mut recorder, |c, ctx| c.start_record(ctx, "two")).is_err());
    assert!(log(&mut recorder, |c, _| c.delete_log("one")).is_err());
    log(&mut recorder, |c, ctx| c.stop(ctx)).unwrap();
    log(&mut recorder, |c, _| c.delete_log("one")).unwrap();
    assert!(log(&mut recorder, |c, _| c.available_logs()).unwrap().is_empty());

    std::fs::remove_dir_all(&dir).ok();
}
