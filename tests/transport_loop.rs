use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use drumgrid::{
    Error, Grid, Instrument, PlaybackEngine, PlaybackEvent, PlaybackObserver, SampleBuffer,
    StereoFrame, TempoController,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn click() -> SampleBuffer {
    SampleBuffer::from_frames(vec![StereoFrame { left: 0.5, right: 0.5 }; 32], 44100)
}

fn engine_with_all_samples() -> PlaybackEngine {
    let mut engine = PlaybackEngine::new(Grid::default(), TempoController::new(120));
    for instrument in Instrument::ALL {
        engine.insert_sample(instrument, click());
    }
    engine
}

fn triggered(events: &[PlaybackEvent]) -> Vec<(Instrument, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Trigger {
                instrument, step, ..
            } => Some((*instrument, *step)),
            _ => None,
        })
        .collect()
}

fn highlighted_rows(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::HighlightOn { row, .. } => Some(*row),
            _ => None,
        })
        .collect()
}

fn highlight_offs(events: &[PlaybackEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::HighlightOff { .. }))
        .count()
}

fn fired_steps(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::StepAdvanced(step) => Some(*step),
            _ => None,
        })
        .collect()
}

struct Recorder(Rc<RefCell<Vec<PlaybackEvent>>>);

impl PlaybackObserver for Recorder {
    fn on_event(&mut self, event: &PlaybackEvent) -> drumgrid::Result<()> {
        self.0.borrow_mut().push(event.clone());
        Ok(())
    }
}

struct Broken;

impl PlaybackObserver for Broken {
    fn on_event(&mut self, _event: &PlaybackEvent) -> drumgrid::Result<()> {
        Err(Error::Playback("device unplugged".into()))
    }
}

#[test]
fn test_kick_on_first_step_sounds_only_the_kick() {
    let mut engine = engine_with_all_samples();
    assert!(engine.toggle_cell(0, 0).unwrap());

    engine.start();
    let events = engine.poll_events();
    assert_eq!(fired_steps(&events), vec![0]);
    assert_eq!(triggered(&events), vec![(Instrument::Kick, 0)]);
    assert_eq!(highlighted_rows(&events), vec![0, 1, 2]);
    assert_eq!(engine.next_tick_due(), Some(ms(350)));

    // Highlights clear 150ms after the step fired.
    engine.advance_to(ms(149));
    assert_eq!(highlight_offs(&engine.poll_events()), 0);
    engine.advance_to(ms(150));
    assert_eq!(highlight_offs(&engine.poll_events()), 3);
}

#[test]
fn test_tempo_change_applies_from_next_tick() {
    let mut engine = engine_with_all_samples();
    engine.start();
    engine.advance_to(ms(100));

    assert_eq!(engine.set_tempo(240), 240);
    assert_eq!(engine.next_tick_due(), Some(ms(350)));

    engine.advance_to(ms(350));
    assert_eq!(fired_steps(&engine.poll_events()), vec![0, 1]);
    assert_eq!(engine.next_tick_due(), Some(ms(450)));
}

#[test]
fn test_out_of_range_tempo_is_clamped() {
    let mut engine = engine_with_all_samples();
    assert_eq!(engine.set_tempo(10), 40);
    assert_eq!(engine.transport_state().tempo_bpm, 40);
    assert_eq!(engine.set_tempo(1000), 240);
    assert_eq!(engine.set_tempo(-5), 40);
}

#[test]
fn test_toggle_during_highlight_keeps_scheduled_clear() {
    let mut engine = engine_with_all_samples();
    engine.start();
    engine.poll_events();

    engine.advance_to(ms(50));
    engine.toggle_cell(1, 0).unwrap();
    engine.toggle_cell(1, 0).unwrap();
    assert!(!engine.is_active(1, 0).unwrap());

    engine.advance_to(ms(150));
    let events = engine.poll_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, PlaybackEvent::HighlightOff { row: 1, step: 0 })));
}

#[test]
fn test_toggle_mid_playback_is_seen_by_next_tick() {
    let mut engine = engine_with_all_samples();
    engine.start();
    engine.toggle_cell(2, 1).unwrap();
    engine.poll_events();

    engine.advance_to(ms(350));
    assert_eq!(triggered(&engine.poll_events()), vec![(Instrument::HighHat, 1)]);
}

#[test]
fn test_missing_sample_still_highlights() {
    let mut engine = PlaybackEngine::new(Grid::default(), TempoController::default());
    engine.insert_sample(Instrument::Kick, click());
    engine.toggle_cell(0, 0).unwrap();
    engine.toggle_cell(1, 0).unwrap();
    assert!(!engine.is_sample_ready(Instrument::Snare));

    engine.start();
    let events = engine.poll_events();
    assert_eq!(triggered(&events), vec![(Instrument::Kick, 0)]);
    assert_eq!(highlighted_rows(&events), vec![0, 1, 2]);
    assert!(engine.is_playing());
}

#[test]
fn test_failing_observer_does_not_stop_the_loop() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut engine = engine_with_all_samples();
    engine.add_observer(Box::new(Broken));
    engine.add_observer(Box::new(Recorder(Rc::clone(&log))));
    engine.toggle_cell(0, 0).unwrap();

    engine.start();
    engine.advance_to(ms(350));
    engine.advance_to(ms(700));

    assert!(engine.is_playing());
    assert_eq!(fired_steps(&log.borrow()), vec![0, 1, 2]);
    assert_eq!(triggered(&log.borrow()), vec![(Instrument::Kick, 0)]);
}

#[test]
fn test_stop_then_start_begins_at_first_step() {
    let mut engine = engine_with_all_samples();
    engine.start();
    for _ in 0..3 {
        engine.advance_by(ms(350));
    }
    assert_eq!(engine.now(), ms(1050));
    assert_eq!(engine.transport_state().current_step, 4);

    engine.stop();
    let state = engine.transport_state();
    assert!(!state.is_playing);
    assert_eq!(state.current_step, 0);
    assert_eq!(engine.button_label(), "Play");
    engine.poll_events();

    engine.advance_to(ms(2000));
    engine.start();
    assert_eq!(engine.button_label(), "Stop");
    assert_eq!(fired_steps(&engine.poll_events()), vec![0]);
    assert_eq!(engine.next_tick_due(), Some(ms(2350)));
}

#[test]
fn test_stalled_frame_does_not_burst_triggers() {
    let mut engine = engine_with_all_samples();
    for step in 0..8 {
        engine.toggle_cell(0, step).unwrap();
    }
    engine.start();
    engine.poll_events();

    engine.advance_to(ms(10_000));
    let events = engine.poll_events();
    assert_eq!(fired_steps(&events), vec![1]);
    assert!(triggered(&events).len() <= 1);
    assert_eq!(engine.next_tick_due(), Some(ms(10_350)));

    // Spacing is back to one interval from the late tick.
    engine.advance_to(ms(10_349));
    assert!(fired_steps(&engine.poll_events()).is_empty());
    engine.advance_to(ms(10_350));
    assert_eq!(fired_steps(&engine.poll_events()), vec![2]);
}

#[test]
fn test_narrow_layout_loops_over_four_steps() {
    let mut engine = engine_with_all_samples();
    assert_eq!(engine.resize(768), 4);
    engine.start();
    for _ in 0..5 {
        engine.advance_by(ms(350));
    }
    assert_eq!(fired_steps(&engine.poll_events()), vec![0, 1, 2, 3, 0, 1]);

    assert_eq!(engine.resize(769), 8);
}
