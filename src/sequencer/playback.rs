/// Playback engine - the single-threaded loop that drives the transport
///
/// Time is a virtual clock moved forward by `advance_to`. Deferred work (the
/// next tick, each highlight-off) sits in a queue ordered by due time and runs
/// when the clock reaches it. At most one tick is armed at a time; `stop()`
/// does not revoke it, the tick checks the transport when it comes due.
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use tracing::trace;

use super::layout::LayoutMode;
use super::tempo::{TempoController, HIGHLIGHT_DURATION};
use super::transport::{Transport, TransportKey, TransportState};
use super::trigger::{PlaybackEvent, PlaybackObserver, StepTrigger};
use super::{Grid, Instrument};
use crate::audio::{SampleBank, SampleBuffer, SampleLoader};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Tick,
    HighlightOff { row: usize, step: usize },
}

#[derive(Debug, PartialEq, Eq)]
struct Scheduled {
    due: Duration,
    seq: u64,
    callback: Deferred,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct PlaybackEngine {
    transport: Transport,
    grid: Grid,
    bank: SampleBank,
    trigger: StepTrigger,
    layout: LayoutMode,
    now: Duration,
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    armed_tick: Option<u64>,
}

impl PlaybackEngine {
    pub fn new(grid: Grid, tempo: TempoController) -> Self {
        Self {
            transport: Transport::new(tempo),
            grid,
            bank: SampleBank::new(),
            trigger: StepTrigger::new(),
            layout: LayoutMode::default(),
            now: Duration::ZERO,
            queue: BinaryHeap::new(),
            next_seq: 0,
            armed_tick: None,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.trigger.add_observer(observer);
    }

    // -- sample bank --

    pub fn insert_sample(&mut self, instrument: Instrument, buffer: SampleBuffer) -> bool {
        self.bank.insert(instrument, buffer)
    }

    /// Takes whatever the loader has finished so far.
    pub fn receive_samples(&mut self, loader: &mut SampleLoader) -> usize {
        loader.drain_into(&mut self.bank)
    }

    pub fn is_sample_ready(&self, instrument: Instrument) -> bool {
        self.bank.is_ready(instrument)
    }

    // -- grid --

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Flips a cell, also mid-playback; the next tick that reaches it sees the change.
    pub fn toggle_cell(&mut self, row: usize, step: usize) -> Result<bool> {
        self.grid.toggle(row, step)
    }

    pub fn is_active(&self, row: usize, step: usize) -> Result<bool> {
        self.grid.is_active(row, step)
    }

    // -- tempo and layout --

    /// Clamps and stores the tempo. An already armed tick keeps its delay.
    pub fn set_tempo(&mut self, requested: i64) -> u32 {
        self.transport.set_tempo(requested)
    }

    /// Recomputes the layout from a new viewport width and returns the steps per row.
    pub fn resize(&mut self, viewport_width_px: u32) -> usize {
        self.layout = LayoutMode::from_viewport_width(viewport_width_px);
        self.steps_per_row()
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn steps_per_row(&self) -> usize {
        self.layout.steps_per_row().min(self.grid.steps())
    }

    // -- transport --

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn button_label(&self) -> &'static str {
        self.transport.button_label()
    }

    /// Starts the loop at the current step, firing it right away.
    /// Does nothing if already playing.
    pub fn start(&mut self) -> bool {
        if !self.transport.start() {
            return false;
        }
        self.tick();
        true
    }

    pub fn stop(&mut self) -> bool {
        self.transport.stop()
    }

    /// Returns whether the transport is playing afterwards.
    pub fn toggle_play(&mut self) -> bool {
        if self.transport.is_playing() {
            self.stop();
        } else {
            self.start();
        }
        self.transport.is_playing()
    }

    /// Toggles playback for the transport keys. Returns whether the key was used.
    pub fn handle_key(&mut self, key: &str) -> bool {
        if !TransportKey::matches(key) {
            return false;
        }
        self.toggle_play();
        true
    }

    /// One step of the loop: fire the current step, move on, and arm the next
    /// tick if still playing.
    pub fn tick(&mut self) {
        let steps_per_row = self.steps_per_row();
        let step = self.transport.current_step();
        trace!(step, at = ?self.now, "tick");

        self.trigger.emit(PlaybackEvent::StepAdvanced(step));
        let rows = self.trigger.fire_step(step, &self.grid, &self.bank);
        let off_at = self.now + HIGHLIGHT_DURATION;
        for row in rows {
            self.schedule(off_at, Deferred::HighlightOff { row, step });
        }

        self.transport.advance(steps_per_row);

        if self.transport.is_playing() {
            let due = self.now + self.transport.interval();
            self.armed_tick = Some(self.schedule(due, Deferred::Tick));
        }
    }

    // -- clock --

    pub fn now(&self) -> Duration {
        self.now
    }

    /// When the armed tick will run, if one is armed and playback is on.
    pub fn next_tick_due(&self) -> Option<Duration> {
        let armed = self.armed_tick?;
        if !self.transport.is_playing() {
            return None;
        }
        self.queue
            .iter()
            .find(|Reverse(s)| s.seq == armed)
            .map(|Reverse(s)| s.due)
    }

    /// Runs every deferred callback due at or before `target`, in order.
    ///
    /// Highlight-offs run at their own due time. A tick that is already late
    /// runs once, at `target`, and the next one is armed from there, so a
    /// late call never replays the missed steps back to back.
    pub fn advance_to(&mut self, target: Duration) {
        let mut ticked = false;
        while let Some(Reverse(next)) = self.queue.peek() {
            if next.due > target || (ticked && next.callback == Deferred::Tick) {
                break;
            }
            let Some(Reverse(next)) = self.queue.pop() else {
                break;
            };
            match next.callback {
                Deferred::Tick => {
                    if self.is_armed(next.seq) {
                        self.now = self.now.max(target);
                        self.tick();
                        ticked = true;
                    } else {
                        trace!(seq = next.seq, "stale tick dropped");
                    }
                }
                Deferred::HighlightOff { row, step } => {
                    self.now = self.now.max(next.due);
                    self.trigger.emit(PlaybackEvent::HighlightOff { row, step });
                }
            }
        }
        self.now = self.now.max(target);
    }

    pub fn advance_by(&mut self, elapsed: Duration) {
        self.advance_to(self.now + elapsed);
    }

    /// Events emitted since the last poll.
    pub fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        self.trigger.drain()
    }

    fn schedule(&mut self, due: Duration, callback: Deferred) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { due, seq, callback }));
        seq
    }

    /// A pending tick only runs if it is the armed one and playback is still on.
    fn is_armed(&self, seq: u64) -> bool {
        self.transport.is_playing() && self.armed_tick == Some(seq)
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(Grid::default(), TempoController::default())
    }
}
