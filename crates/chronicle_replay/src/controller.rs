//! # Log Controller
//!
//! The record/playback state machine, plugged into the kernel as a
//! component.
//!
//! ```text
//!            start_record                    start_playback
//!   ┌──────┐ ────────────> ┌────────┐      ┌──────┐ ─────────────> ┌──────────┐
//!   │ IDLE │               │ RECORD │      │ IDLE │                │ PLAYBACK │
//!   └──────┘ <──────────── └────────┘      └──────┘ <───────────── └──────────┘
//!              stop / write failure                   stop               │  ^
//!                                                                        └──┘
//!                                                            jump_to_keyframe
//! ```
//!
//! RECORD: every dispatched message except ticks, logger traffic, ignored
//! types and messages about ignored actors is appended to the log, stamped
//! with the simulation time. Keyframes capture the whole world.
//!
//! PLAYBACK: the world is reset to the recording's baseline, then each tick
//! injects the entries whose timestamps the playback clock has reached.
//! Entries go out exactly as recorded.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use chronicle_core::{decode_message, encode_message, types, Actor, ActorId, ActorSnapshot, Message, ParamValue};
use chronicle_kernel::{params as kernel_params, Component, ComponentError, KernelContext};

use crate::catalog;
use crate::error::{ReplayError, ReplayResult};
use crate::format::{from_micros, to_micros, Keyframe, LogEntry, Tag};
use crate::params;
use crate::status::{LogState, LogStatusInfo, StatusHandle};
use crate::stream::{create_log_file, LogSink, LogStreamReader, LogStreamWriter};

/// Name under which the controller registers.
pub const LOG_CONTROLLER: &str = "log_controller";

/// How fast playback runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackRate {
    /// Playback clock runs at this multiple of simulation time.
    Scaled(f64),
    /// Inject as fast as `max_messages_per_tick` allows.
    Unthrottled,
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::Scaled(1.0)
    }
}

/// Controller settings.
#[derive(Clone, Debug)]
pub struct LogControllerConfig {
    /// Directory holding `.aarlog` files.
    pub log_dir: PathBuf,
    /// Seconds of simulation time between automatic keyframes. 0 disables.
    pub auto_keyframe_interval: f64,
    /// Playback speed.
    pub playback_rate: PlaybackRate,
    /// Injection bound per tick.
    pub max_messages_per_tick: usize,
    /// Message type names never recorded.
    pub ignored_message_types: HashSet<String>,
}

impl Default for LogControllerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            auto_keyframe_interval: 60.0,
            playback_rate: PlaybackRate::default(),
            max_messages_per_tick: 1000,
            ignored_message_types: HashSet::new(),
        }
    }
}

struct RecordSession {
    writer: LogStreamWriter<Box<dyn LogSink>>,
    started_at: f64,
    next_auto_keyframe: Option<f64>,
    auto_count: u32,
}

struct PlaybackSession {
    reader: LogStreamReader<BufReader<File>>,
    clock_micros: u64,
    pending: Option<LogEntry>,
    actors_at_start: HashSet<ActorId>,
    entries_played: u64,
    end_reported: bool,
}

/// Record and playback of kernel message traffic.
pub struct LogController {
    config: LogControllerConfig,
    state: LogState,
    status: StatusHandle,
    ignored_actors: HashSet<ActorId>,
    record: Option<RecordSession>,
    playback: Option<PlaybackSession>,
    last_error: Option<String>,
    /// Source stamped on replayed actor messages.
    playback_machine: ActorId,
}

impl LogController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(config: LogControllerConfig) -> Self {
        let status = StatusHandle::new();
        status.update(|s| s.auto_keyframe_interval = config.auto_keyframe_interval);
        Self {
            config,
            state: LogState::Idle,
            status,
            ignored_actors: HashSet::new(),
            record: None,
            playback: None,
            last_error: None,
            playback_machine: ActorId::generate(),
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LogState {
        self.state
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &LogControllerConfig {
        &self.config
    }

    /// Thread-safe status view.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Copy of the current status.
    #[must_use]
    pub fn status(&self) -> LogStatusInfo {
        self.status.get()
    }

    /// Machine id that replayed actor messages claim as their source, so the
    /// kernel mirrors replayed actors as remote.
    #[inline]
    #[must_use]
    pub const fn playback_machine(&self) -> ActorId {
        self.playback_machine
    }

    /// Last failure, cleared by the next successful state change.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Keeps an actor out of recordings and snapshots.
    pub fn ignore_actor(&mut self, id: ActorId) {
        self.ignored_actors.insert(id);
    }

    /// Undoes [`ignore_actor`](Self::ignore_actor).
    pub fn unignore_actor(&mut self, id: ActorId) -> bool {
        self.ignored_actors.remove(&id)
    }

    /// Keeps a message type (by name) out of recordings.
    pub fn ignore_message_type(&mut self, name: impl Into<String>) {
        self.config.ignored_message_types.insert(name.into());
    }

    /// Changes the playback speed.
    pub fn set_playback_rate(&mut self, rate: PlaybackRate) {
        self.config.playback_rate = rate;
    }

    /// Logs available in the log directory.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be read.
    pub fn available_logs(&self) -> ReplayResult<Vec<String>> {
        catalog::available_logs(&self.config.log_dir)
    }

    /// Deletes a log from the log directory. The open log cannot be deleted.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` for the open log, `NotFound` or `Io` otherwise.
    pub fn delete_log(&self, name: &str) -> ReplayResult<()> {
        if self.state != LogState::Idle && self.status.get().log_name.as_deref() == Some(name) {
            return Err(self.invalid("delete the open log"));
        }
        catalog::delete_log(&self.config.log_dir, name)
    }

    // =========================================================================
    // State changes
    // =========================================================================

    /// Starts recording into `<log_dir>/<name>.aarlog`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless idle, `LogWrite` if the file cannot be
    /// created.
    pub fn start_record(&mut self, ctx: &mut KernelContext, name: &str) -> ReplayResult<()> {
        self.require(LogState::Idle, "start recording")?;
        let file = create_log_file(&self.config.log_dir, name)?;
        self.start_record_with_sink(ctx, name, Box::new(file))
    }

    /// Starts recording into an arbitrary sink.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless idle.
    pub fn start_record_with_sink(&mut self, ctx: &mut KernelContext, name: &str, sink: Box<dyn LogSink>) -> ReplayResult<()> {
        self.require(LogState::Idle, "start recording")?;

        let now = ctx.sim_time();
        let mut writer = LogStreamWriter::from_sink(sink, name);
        writer.set_baseline(to_micros(now), self.snapshot(ctx));
        self.record = Some(RecordSession {
            writer,
            started_at: now,
            next_auto_keyframe: self.next_auto_due(now),
            auto_count: 0,
        });
        self.state = LogState::Record;
        self.last_error = None;

        tracing::info!(log = %name, sim_time = now, "Recording started");
        self.status.update(|s| {
            *s = LogStatusInfo {
                state: LogState::Record,
                log_name: Some(name.to_owned()),
                current_sim_time: now,
                auto_keyframe_interval: self.config.auto_keyframe_interval,
                ..LogStatusInfo::default()
            };
        });
        Ok(())
    }

    /// Starts playing back `<log_dir>/<name>.aarlog`. Actors are reset to
    /// the recording's baseline.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless idle, `NotFound` or `Io` if the log cannot
    /// be opened.
    pub fn start_playback(&mut self, ctx: &mut KernelContext, name: &str) -> ReplayResult<()> {
        self.require(LogState::Idle, "start playback")?;

        let reader = LogStreamReader::open(&self.config.log_dir, name)?;
        let actors_at_start: HashSet<ActorId> = ctx.actors().ids().into_iter().collect();
        let restored = ctx.restore_actors(reader.baseline());
        let clock_micros = reader.record_start_micros();
        let duration = from_micros(reader.record_end_micros().saturating_sub(clock_micros));
        let (keyframes, tags) = (reader.keyframes().len(), reader.tags().len());

        self.playback = Some(PlaybackSession {
            reader,
            clock_micros,
            pending: None,
            actors_at_start,
            entries_played: 0,
            end_reported: false,
        });
        self.state = LogState::Playback;
        self.last_error = None;

        tracing::info!(
            log = %name,
            created = restored.created.len(),
            updated = restored.updated,
            keyframes,
            "Playback started"
        );
        self.status.update(|s| {
            *s = LogStatusInfo {
                state: LogState::Playback,
                log_name: Some(name.to_owned()),
                current_sim_time: from_micros(clock_micros),
                record_duration: duration,
                keyframe_count: keyframes,
                tag_count: tags,
                auto_keyframe_interval: self.config.auto_keyframe_interval,
                ..LogStatusInfo::default()
            };
        });
        Ok(())
    }

    /// Returns to idle. Recording closes the log (index, footer, sync);
    /// playback retires the actors it created. Stopping while idle does
    /// nothing.
    ///
    /// # Errors
    ///
    /// `LogWrite` if closing the log fails. The controller is idle anyway.
    pub fn stop(&mut self, ctx: &mut KernelContext) -> ReplayResult<()> {
        let previous = self.state;
        self.state = LogState::Idle;

        let result = match previous {
            LogState::Idle => {
                tracing::debug!("Stop requested while idle");
                Ok(())
            }
            LogState::Record => match self.record.take() {
                Some(session) => {
                    let name = session.writer.name().to_owned();
                    let entries = session.writer.entries();
                    let closed = session.writer.close(to_micros(ctx.sim_time()));
                    if closed.is_ok() {
                        tracing::info!(log = %name, entries, "Recording stopped");
                    }
                    closed.map(drop)
                }
                None => Ok(()),
            },
            LogState::Playback => {
                if let Some(session) = self.playback.take() {
                    let spawned: Vec<ActorId> = ctx
                        .actors()
                        .ids()
                        .into_iter()
                        .filter(|id| !session.actors_at_start.contains(id))
                        .collect();
                    let retired = ctx.retire_actors(&spawned);
                    tracing::info!(
                        log = %session.reader.name(),
                        played = session.entries_played,
                        retired,
                        "Playback stopped"
                    );
                }
                Ok(())
            }
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "Closing the log failed");
            self.last_error = Some(e.to_string());
        }
        let last_error = self.last_error.clone();
        self.status.update(|s| {
            s.state = LogState::Idle;
            s.last_error = last_error;
        });
        result
    }

    // =========================================================================
    // Keyframes and tags
    // =========================================================================

    /// Captures the world as a keyframe at the current simulation time and
    /// bookmarks it with a tag of the same name.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless recording, `DuplicateKeyframe` if one was
    /// already captured at this time.
    pub fn create_keyframe(&mut self, ctx: &KernelContext, name: &str, description: &str) -> ReplayResult<()> {
        self.require(LogState::Record, "capture a keyframe")?;
        let snapshot = self.snapshot(ctx);
        let timestamp_micros = to_micros(ctx.sim_time());
        let Some(session) = self.record.as_mut() else {
            return Err(self.invalid("capture a keyframe"));
        };

        let offset = session.writer.position();
        session.writer.insert_keyframe(Keyframe {
            name: name.to_owned(),
            description: description.to_owned(),
            timestamp_micros,
            offset,
            snapshot,
        })?;
        session.writer.insert_tag(Tag {
            name: name.to_owned(),
            description: description.to_owned(),
            timestamp_micros,
            keyframe_micros: Some(timestamp_micros),
        });

        tracing::info!(keyframe = %name, offset, sim_time = ctx.sim_time(), "Keyframe captured");
        self.refresh_status(ctx);
        Ok(())
    }

    /// Bookmarks the current simulation time, linked to the nearest
    /// preceding keyframe.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless recording.
    pub fn add_tag(&mut self, ctx: &KernelContext, name: &str, description: &str) -> ReplayResult<()> {
        self.require(LogState::Record, "insert a tag")?;
        let Some(session) = self.record.as_mut() else {
            return Err(self.invalid("insert a tag"));
        };

        let timestamp_micros = to_micros(ctx.sim_time());
        let keyframe_micros = session
            .writer
            .keyframes()
            .nearest_at_or_before(timestamp_micros)
            .map(|k| k.timestamp_micros);
        session.writer.insert_tag(Tag {
            name: name.to_owned(),
            description: description.to_owned(),
            timestamp_micros,
            keyframe_micros,
        });

        tracing::debug!(tag = %name, sim_time = ctx.sim_time(), "Tag inserted");
        self.refresh_status(ctx);
        Ok(())
    }

    /// Sets the automatic keyframe interval. 0 disables.
    pub fn set_auto_keyframe_interval(&mut self, ctx: &KernelContext, seconds: f64) {
        self.config.auto_keyframe_interval = seconds.max(0.0);
        let next = self.next_auto_due(ctx.sim_time());
        if let Some(session) = self.record.as_mut() {
            session.next_auto_keyframe = next;
        }
        tracing::info!(interval = self.config.auto_keyframe_interval, "Auto keyframe interval set");
        self.refresh_status(ctx);
    }

    /// Keyframes of the log being recorded or played.
    #[must_use]
    pub fn keyframes(&self) -> Vec<Keyframe> {
        if let Some(session) = &self.record {
            return session.writer.keyframes().as_slice().to_vec();
        }
        self.playback
            .as_ref()
            .map(|s| s.reader.keyframes().as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Tags of the log being recorded or played.
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        if let Some(session) = &self.record {
            return session.writer.tags().iter().cloned().collect();
        }
        self.playback
            .as_ref()
            .map(|s| s.reader.tags().iter().cloned().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Jumps
    // =========================================================================

    /// Jumps playback to the keyframe at `index` (timestamp order).
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless playing, `NotFound` for a bad index.
    pub fn jump_to_keyframe(&mut self, ctx: &mut KernelContext, index: usize) -> ReplayResult<()> {
        let keyframe = self
            .playing("jump to a keyframe")?
            .reader
            .keyframes()
            .get(index)
            .cloned()
            .ok_or_else(|| ReplayError::not_found("keyframe", index.to_string()))?;
        self.apply_keyframe(ctx, &keyframe, keyframe.timestamp_micros)
    }

    /// Jumps playback to the keyframe called `name`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless playing, `NotFound` for an unknown name.
    pub fn jump_to_keyframe_named(&mut self, ctx: &mut KernelContext, name: &str) -> ReplayResult<()> {
        let keyframe = self
            .playing("jump to a keyframe")?
            .reader
            .keyframes()
            .by_name(name)
            .map(|(_, k)| k.clone())
            .ok_or_else(|| ReplayError::not_found("keyframe", name))?;
        self.apply_keyframe(ctx, &keyframe, keyframe.timestamp_micros)
    }

    /// Jumps playback to a tag: the world is restored from the tag's
    /// keyframe and the entries between keyframe and tag are replayed on
    /// the next tick.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless playing, `NotFound` for an unknown tag or
    /// a tag without a keyframe.
    pub fn jump_to_tag(&mut self, ctx: &mut KernelContext, name: &str) -> ReplayResult<()> {
        let reader = &self.playing("jump to a tag")?.reader;
        let tag = reader
            .tags()
            .get(name)
            .ok_or_else(|| ReplayError::not_found("tag", name))?;
        let keyframe = tag
            .keyframe_micros
            .and_then(|ts| reader.keyframes().at(ts))
            .cloned()
            .ok_or_else(|| ReplayError::not_found("keyframe for tag", name))?;
        let resume_at = tag.timestamp_micros.max(keyframe.timestamp_micros);
        self.apply_keyframe(ctx, &keyframe, resume_at)
    }

    fn apply_keyframe(&mut self, ctx: &mut KernelContext, keyframe: &Keyframe, resume_at: u64) -> ReplayResult<()> {
        let Some(session) = self.playback.as_mut() else {
            return Err(self.invalid("jump"));
        };
        session.reader.seek_to(keyframe.offset)?;
        session.pending = None;
        session.clock_micros = resume_at;
        session.end_reported = false;

        let report = ctx.restore_actors(&keyframe.snapshot);
        let keep: HashSet<ActorId> = keyframe.snapshot.iter().map(|s| s.id).collect();
        let stale: Vec<ActorId> = ctx
            .actors()
            .ids()
            .into_iter()
            .filter(|id| !session.actors_at_start.contains(id) && !keep.contains(id))
            .collect();
        let retired = ctx.retire_actors(&stale);

        tracing::info!(
            keyframe = %keyframe.name,
            sim_time = keyframe.timestamp(),
            created = report.created.len(),
            updated = report.updated,
            retired,
            "Jumped to keyframe"
        );
        self.refresh_status(ctx);
        Ok(())
    }

    // =========================================================================
    // Per-message work
    // =========================================================================

    fn record_message(&mut self, ctx: &KernelContext, message: &Message) -> Result<(), ComponentError> {
        if self.config.ignored_message_types.contains(message.message_type().name())
            || message.about_actor.is_some_and(|id| self.ignored_actors.contains(&id))
        {
            return Ok(());
        }
        let payload = match encode_message(message) {
            Ok(payload) => payload,
            Err(e) => return Err(self.fail_record(ctx, ReplayError::Codec(e))),
        };
        let Some(session) = self.record.as_mut() else {
            return Ok(());
        };
        if let Err(e) = session.writer.append(to_micros(ctx.sim_time()), &payload) {
            return Err(self.fail_record(ctx, e));
        }
        let entries = session.writer.entries();
        self.status.update(|s| s.entries_recorded = entries);
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut KernelContext, tick: &Message) -> Result<(), ComponentError> {
        match self.state {
            LogState::Idle => Ok(()),
            LogState::Record => self.record_tick(ctx),
            LogState::Playback => {
                let delta = tick
                    .param(kernel_params::DELTA_SIM)
                    .and_then(ParamValue::as_f64)
                    .unwrap_or(0.0);
                self.playback_tick(ctx, delta);
                Ok(())
            }
        }
    }

    fn record_tick(&mut self, ctx: &KernelContext) -> Result<(), ComponentError> {
        let now = ctx.sim_time();
        let next = self.next_auto_due(now);
        let Some(session) = self.record.as_mut() else {
            return Ok(());
        };
        if let Err(e) = session.writer.flush() {
            return Err(self.fail_record(ctx, e));
        }

        if session.next_auto_keyframe.is_some_and(|due| now >= due) {
            session.auto_count += 1;
            session.next_auto_keyframe = next;
            let name = format!("auto-{}", session.auto_count);
            if let Err(e) = self.create_keyframe(ctx, &name, "automatic keyframe") {
                tracing::warn!(keyframe = %name, error = %e, "Automatic keyframe skipped");
            }
        }
        self.refresh_status(ctx);
        Ok(())
    }

    fn playback_tick(&mut self, ctx: &mut KernelContext, delta_sim: f64) {
        let rate = self.config.playback_rate;
        let limit = self.config.max_messages_per_tick.max(1);
        let machine = self.playback_machine;
        let Some(session) = self.playback.as_mut() else {
            return;
        };

        let mut injected = 0;
        let mut exhausted = false;
        while injected < limit {
            if session.pending.is_none() {
                match session.reader.next_entry() {
                    Ok(Some(entry)) => session.pending = Some(entry),
                    Ok(None) => {
                        exhausted = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Playback stopped at damaged entry");
                        exhausted = true;
                        break;
                    }
                }
            }
            let Some(entry) = session.pending.take() else {
                break;
            };
            if matches!(rate, PlaybackRate::Scaled(_)) && entry.timestamp_micros > session.clock_micros {
                session.pending = Some(entry);
                break;
            }
            if matches!(rate, PlaybackRate::Unthrottled) {
                session.clock_micros = session.clock_micros.max(entry.timestamp_micros);
            }

            match decode_message(&entry.payload, ctx.message_types()) {
                Ok(mut message) => {
                    if is_actor_info(&message) {
                        message.source = Some(machine);
                    }
                    ctx.send_message_forward(message);
                }
                Err(e) => tracing::warn!(
                    at_micros = entry.timestamp_micros,
                    error = %e,
                    "Recorded message could not be decoded, skipped"
                ),
            }
            session.entries_played += 1;
            injected += 1;
        }

        if let PlaybackRate::Scaled(scale) = rate {
            session.clock_micros += to_micros(delta_sim * scale.max(0.0));
        }

        if exhausted && !session.end_reported {
            session.end_reported = true;
            let end = ctx.create_message(types::LOG_INFO_PLAYBACK_END_OF_MESSAGES);
            ctx.send_message(end);
            tracing::info!(played = session.entries_played, "Playback reached end of messages");
        }
        self.refresh_status(ctx);
    }

    fn on_request(&mut self, ctx: &mut KernelContext, request: &Message) {
        let t = request.message_type();
        let text = |name: &str| request.param(name).and_then(ParamValue::as_str).map(str::to_owned);
        let description = text(params::DESCRIPTION).unwrap_or_default();

        let result = if t == types::LOG_REQ_CHANGESTATE_RECORD {
            match text(params::LOG_NAME) {
                Some(name) => self.start_record(ctx, &name),
                None => Err(missing(params::LOG_NAME)),
            }
        } else if t == types::LOG_REQ_CHANGESTATE_PLAYBACK {
            match text(params::LOG_NAME) {
                Some(name) => self.start_playback(ctx, &name),
                None => Err(missing(params::LOG_NAME)),
            }
        } else if t == types::LOG_REQ_CHANGESTATE_IDLE {
            self.stop(ctx)
        } else if t == types::LOG_REQ_CAPTURE_KEYFRAME {
            match text(params::NAME) {
                Some(name) => self.create_keyframe(ctx, &name, &description),
                None => Err(missing(params::NAME)),
            }
        } else if t == types::LOG_REQ_INSERT_TAG {
            match text(params::NAME) {
                Some(name) => self.add_tag(ctx, &name, &description),
                None => Err(missing(params::NAME)),
            }
        } else if t == types::LOG_REQ_JUMP_TO_KEYFRAME {
            let index = request
                .param(params::KEYFRAME_INDEX)
                .and_then(ParamValue::as_i64)
                .and_then(|i| usize::try_from(i).ok());
            match (index, text(params::NAME), text(params::TAG_NAME)) {
                (Some(i), _, _) => self.jump_to_keyframe(ctx, i),
                (None, Some(name), _) => self.jump_to_keyframe_named(ctx, &name),
                (None, None, Some(tag)) => self.jump_to_tag(ctx, &tag),
                (None, None, None) => Err(missing(params::KEYFRAME_INDEX)),
            }
        } else if t == types::LOG_REQ_SET_AUTOKEYFRAME_INTERVAL {
            match request.param(params::INTERVAL).and_then(ParamValue::as_f64) {
                Some(secs) => {
                    self.set_auto_keyframe_interval(ctx, secs);
                    Ok(())
                }
                None => Err(missing(params::INTERVAL)),
            }
        } else if t == types::LOG_REQ_GET_STATUS {
            Ok(())
        } else {
            // LOG_INFO_* and anything else in the category are not requests.
            return;
        };

        match result {
            Ok(()) => self.send_status(ctx, request),
            Err(e) => ctx.reject_message(request, &e.to_string()),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn snapshot(&self, ctx: &KernelContext) -> Vec<ActorSnapshot> {
        ctx.snapshot_actors(|a: &Actor| !self.ignored_actors.contains(&a.id()))
    }

    fn next_auto_due(&self, now: f64) -> Option<f64> {
        (self.config.auto_keyframe_interval > 0.0).then(|| now + self.config.auto_keyframe_interval)
    }

    fn require(&self, state: LogState, request: &'static str) -> ReplayResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.invalid(request))
        }
    }

    fn invalid(&self, request: &'static str) -> ReplayError {
        ReplayError::InvalidTransition {
            state: self.state.as_str(),
            request,
        }
    }

    fn playing(&self, request: &'static str) -> ReplayResult<&PlaybackSession> {
        match (&self.playback, self.state) {
            (Some(session), LogState::Playback) => Ok(session),
            _ => Err(self.invalid(request)),
        }
    }

    /// Drops the log after a write or encode failure and goes idle.
    fn fail_record(&mut self, ctx: &KernelContext, error: ReplayError) -> ComponentError {
        let log = self
            .record
            .take()
            .map(|s| s.writer.name().to_owned())
            .unwrap_or_default();
        tracing::error!(log = %log, error = %error, "Recording stopped after write failure");
        self.state = LogState::Idle;
        self.last_error = Some(error.to_string());
        self.refresh_status(ctx);
        ComponentError::other(error)
    }

    fn refresh_status(&self, ctx: &KernelContext) {
        let now = ctx.sim_time();
        let interval = self.config.auto_keyframe_interval;
        let state = self.state;
        let last_error = self.last_error.clone();
        let record = self.record.as_ref();
        let playback = self.playback.as_ref();

        self.status.update(|s| {
            s.state = state;
            s.auto_keyframe_interval = interval;
            s.last_error = last_error;
            if let Some(session) = record {
                s.current_sim_time = now;
                s.record_duration = (now - session.started_at).max(0.0);
                s.entries_recorded = session.writer.entries();
                s.keyframe_count = session.writer.keyframes().len();
                s.tag_count = session.writer.tags().len();
            }
            if let Some(session) = playback {
                s.current_sim_time = from_micros(session.clock_micros);
                s.entries_played = session.entries_played;
                s.end_of_messages = session.end_reported;
            }
        });
    }

    fn send_status(&self, ctx: &mut KernelContext, request: &Message) {
        let mut reply = ctx.create_message(types::LOG_INFO_STATUS);
        self.status.get().write_params(&mut reply);
        reply.destination = request.source;
        ctx.send_message(reply);
    }
}

impl Default for LogController {
    fn default() -> Self {
        Self::new(LogControllerConfig::default())
    }
}

fn is_actor_info(message: &Message) -> bool {
    let t = message.message_type();
    t == types::INFO_ACTOR_CREATED || t == types::INFO_ACTOR_UPDATED || t == types::INFO_ACTOR_DELETED
}

fn missing(param: &'static str) -> ReplayError {
    ReplayError::not_found("request parameter", param)
}

impl Component for LogController {
    fn name(&self) -> &str {
        LOG_CONTROLLER
    }

    fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if message.is(types::TICK_LOCAL) {
            return self.on_tick(ctx, message);
        }
        match message.message_type().category() {
            types::CATEGORY_TICK => Ok(()),
            types::CATEGORY_LOGGER => {
                self.on_request(ctx, message);
                Ok(())
            }
            _ if self.state == LogState::Record => self.record_message(ctx, message),
            _ => Ok(()),
        }
    }

    fn on_removed_from_kernel(&mut self, ctx: &mut KernelContext) {
        if self.state != LogState::Idle {
            if let Err(e) = self.stop(ctx) {
                tracing::error!(error = %e, "Log controller removed with an unfinished log");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Arc;

    use chronicle_core::MessageType;
    use chronicle_kernel::{ComponentPriority, Kernel};
    use parking_lot::Mutex;

    const PING: MessageType = MessageType::new(types::USER_DEFINED_START + 1, "Test Ping", "Test");

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("chronicle_controller_{label}_{nanos}"))
    }

    fn kernel_with_controller(dir: &std::path::Path) -> Kernel {
        let mut kernel = Kernel::new();
        kernel.register_message_type(PING).unwrap();
        let config = LogControllerConfig {
            log_dir: dir.to_path_buf(),
            auto_keyframe_interval: 0.0,
            ..LogControllerConfig::default()
        };
        kernel
            .add_component(LogController::new(config), ComponentPriority::Highest)
            .unwrap();
        kernel
    }

    fn ping(kernel: &mut Kernel, n: i64) {
        let msg = kernel.create_message(PING).with("n", n);
        kernel.send_message(msg);
    }

    fn controller<R>(kernel: &mut Kernel, f: impl FnOnce(&mut LogController, &mut KernelContext) -> R) -> R {
        kernel.with_component::<LogController, _, _>(f).unwrap()
    }

    struct Collector {
        seen: Arc<Mutex<Vec<i64>>>,
    }

    impl Component for Collector {
        fn name(&self) -> &str {
            "collector"
        }

        fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if message.is(PING) {
                let n = message.param("n").and_then(ParamValue::as_i64).unwrap_or(-1);
                self.seen.lock().push(n);
            }
            Ok(())
        }
    }

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogSink for BrokenDisk {
        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_wrong_state_rejected() {
        let dir = temp_dir("state");
        let mut kernel = kernel_with_controller(&dir);

        let err = controller(&mut kernel, |c, ctx| c.create_keyframe(ctx, "k", "")).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidTransition { state: "IDLE", .. }));

        let err = controller(&mut kernel, |c, ctx| c.start_playback(ctx, "missing")).unwrap_err();
        assert!(matches!(err, ReplayError::NotFound { kind: "log", .. }));

        controller(&mut kernel, |c, ctx| c.stop(ctx)).unwrap();
        assert!(controller(&mut kernel, |c, _| c.state()) == LogState::Idle);
    }

    #[test]
    fn test_record_then_play_back() {
        let dir = temp_dir("roundtrip");
        let mut kernel = kernel_with_controller(&dir);
        controller(&mut kernel, |c, ctx| c.start_record(ctx, "sortie")).unwrap();

        for n in 0..3 {
            ping(&mut kernel, n);
        }
        kernel.tick(0.1, 0.1);
        controller(&mut kernel, |c, ctx| c.create_keyframe(ctx, "k1", "first")).unwrap();
        for n in 3..5 {
            ping(&mut kernel, n);
        }
        kernel.tick(0.1, 0.1);

        let status = controller(&mut kernel, |c, _| c.status());
        assert_eq!(status.entries_recorded, 5);
        assert_eq!(status.keyframe_count, 1);
        assert_eq!(status.tag_count, 1);
        controller(&mut kernel, |c, ctx| c.stop(ctx)).unwrap();
        assert_eq!(
            controller(&mut kernel, |c, _| c.available_logs()).unwrap(),
            vec!["sortie"]
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut replay = kernel_with_controller(&dir);
        replay
            .add_component(Collector { seen: Arc::clone(&seen) }, ComponentPriority::Normal)
            .unwrap();
        controller(&mut replay, |c, ctx| c.start_playback(ctx, "sortie")).unwrap();

        replay.tick(0.05, 0.05);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        replay.tick(0.05, 0.05);
        assert_eq!(seen.lock().len(), 3);
        replay.tick(0.05, 0.05);
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);

        let status = controller(&mut replay, |c, _| c.status());
        assert_eq!(status.state, LogState::Playback);
        assert_eq!(status.entries_played, 5);
        assert!(status.end_of_messages);

        fs_cleanup(&dir);
    }

    #[test]
    fn test_write_failure_returns_to_idle() {
        let dir = temp_dir("broken");
        let mut kernel = kernel_with_controller(&dir);
        controller(&mut kernel, |c, ctx| {
            c.start_record_with_sink(ctx, "broken", Box::new(BrokenDisk))
        })
        .unwrap();

        ping(&mut kernel, 1);
        kernel.tick(0.1, 0.1);

        let (state, error) = controller(&mut kernel, |c, _| (c.state(), c.last_error().map(str::to_owned)));
        assert_eq!(state, LogState::Idle);
        assert!(error.unwrap().contains("broken"));
    }

    #[test]
    fn test_unencodable_message_stops_recording() {
        let dir = temp_dir("unencodable");
        let mut kernel = kernel_with_controller(&dir);
        controller(&mut kernel, |c, ctx| c.start_record(ctx, "gap")).unwrap();

        ping(&mut kernel, 1);
        kernel.tick(0.1, 0.1);
        // Parameter names carry a u16 length prefix.
        let oversized = kernel.create_message(PING).with("n".repeat(70_000), 2_i64);
        kernel.send_message(oversized);
        kernel.tick(0.1, 0.1);

        let (state, error) = controller(&mut kernel, |c, _| (c.state(), c.last_error().map(str::to_owned)));
        assert_eq!(state, LogState::Idle);
        assert!(error.unwrap().contains("Codec"));
        assert_eq!(controller(&mut kernel, |c, _| c.status()).entries_recorded, 1);

        fs_cleanup(&dir);
    }

    #[test]
    fn test_status_request_answered() {
        let dir = temp_dir("request");
        let mut kernel = kernel_with_controller(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));

        struct StatusWatcher(Arc<Mutex<Vec<LogStatusInfo>>>);
        impl Component for StatusWatcher {
            fn name(&self) -> &str {
                "status_watcher"
            }

            fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
                if message.is(types::LOG_INFO_STATUS) {
                    self.0.lock().push(LogStatusInfo::from_message(message));
                }
                Ok(())
            }
        }
        kernel
            .add_component(StatusWatcher(Arc::clone(&seen)), ComponentPriority::Normal)
            .unwrap();

        let request = kernel
            .create_message(types::LOG_REQ_CHANGESTATE_RECORD)
            .with(params::LOG_NAME, "requested");
        kernel.send_message(request);
        kernel.tick(0.1, 0.1);
        kernel.tick(0.1, 0.1);

        let statuses = seen.lock().clone();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].state, LogState::Record);
        assert_eq!(statuses[0].log_name.as_deref(), Some("requested"));

        controller(&mut kernel, |c, ctx| c.stop(ctx)).unwrap();
        fs_cleanup(&dir);
    }

    fn fs_cleanup(dir: &std::path::Path) {
        std::fs::remove_dir_all(dir).ok();
    }
}
