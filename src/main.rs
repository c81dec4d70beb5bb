#[cfg(feature = "gui")]
use std::collections::HashSet;
#[cfg(feature = "gui")]
use std::path::PathBuf;
#[cfg(feature = "gui")]
use std::time::Instant;

#[cfg(feature = "gui")]
use anyhow::Context;
#[cfg(feature = "gui")]
use clap::Parser;
#[cfg(feature = "gui")]
use eframe::egui;
#[cfg(feature = "gui")]
use tracing::{error, info, warn};

#[cfg(feature = "gui")]
use drumgrid::{
    AudioOutput, Config, Grid, Instrument, MidiOutputDevice, PlaybackEngine, PlaybackEvent,
    SampleLoader, TempoController,
};

/// Sample rate used for decoding when no audio device could be opened.
#[cfg(feature = "gui")]
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

#[cfg(feature = "gui")]
#[derive(Parser, Debug)]
#[command(name = "drumgrid", about = "Step-sequencer drum machine")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the instrument samples, overrides the config file
    #[arg(short, long)]
    samples: Option<PathBuf>,
}

#[cfg(feature = "gui")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("drumgrid=info")),
        )
        .init();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(feature = "gui")]
fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = args.samples {
        config.sample_dir = dir;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_title("drumgrid"),
        ..Default::default()
    };

    eframe::run_native(
        "drumgrid",
        options,
        Box::new(move |_cc| Ok(Box::new(DrumApp::new(&config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct DrumApp {
    engine: PlaybackEngine,
    loader: SampleLoader,
    midi_output: MidiOutputDevice,
    epoch: Instant,

    // UI state
    bpm_input: i64,
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    current_visual_step: Option<usize>,
    highlighted: HashSet<(usize, usize)>,
}

#[cfg(feature = "gui")]
impl DrumApp {
    fn new(config: &Config) -> Self {
        let grid = Grid::new(Instrument::COUNT, config.steps);
        let mut engine = PlaybackEngine::new(grid, TempoController::new(config.tempo_bpm));

        let sample_rate = match AudioOutput::new() {
            Ok(output) => {
                let rate = output.sample_rate();
                engine.add_observer(Box::new(output));
                rate
            }
            Err(e) => {
                warn!(error = %e, "audio output unavailable, running silent");
                FALLBACK_SAMPLE_RATE
            }
        };
        let loader = SampleLoader::spawn(config.sample_requests(), sample_rate);

        let midi_output = MidiOutputDevice::new();
        engine.add_observer(Box::new(midi_output.clone()));

        let available_midi_ports = MidiOutputDevice::available_ports();
        let mut selected_port = None;
        if let Some(name) = &config.midi_port {
            match midi_output.connect_by_name(name) {
                Ok(()) => {
                    selected_port = available_midi_ports.iter().position(|p| p.contains(name));
                }
                Err(e) => warn!(error = %e, "configured MIDI port not connected"),
            }
        }

        info!(bpm = engine.transport_state().tempo_bpm, "drumgrid ready");
        Self {
            bpm_input: i64::from(engine.transport_state().tempo_bpm),
            engine,
            loader,
            midi_output,
            epoch: Instant::now(),
            available_midi_ports,
            selected_port,
            current_visual_step: None,
            highlighted: HashSet::new(),
        }
    }

    fn handle_playback_events(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                PlaybackEvent::StepAdvanced(step) => self.current_visual_step = Some(step),
                PlaybackEvent::HighlightOn { row, step } => {
                    self.highlighted.insert((row, step));
                }
                PlaybackEvent::HighlightOff { row, step } => {
                    self.highlighted.remove(&(row, step));
                }
                PlaybackEvent::Trigger { .. } => {}
            }
        }
    }

    fn toggle_play(&mut self) {
        if !self.engine.toggle_play() {
            self.current_visual_step = None;
        }
    }
}

#[cfg(feature = "gui")]
fn row_color(instrument: Instrument, active: bool) -> egui::Color32 {
    let (r, g, b) = match instrument {
        Instrument::Kick => (200, 70, 60),
        Instrument::Snare => (60, 110, 210),
        Instrument::HighHat => (210, 180, 50),
    };
    if active {
        egui::Color32::from_rgb(r, g, b)
    } else {
        egui::Color32::from_rgb(r / 5, g / 5, b / 5)
    }
}

#[cfg(feature = "gui")]
impl eframe::App for DrumApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        if !self.loader.is_finished() {
            self.engine.receive_samples(&mut self.loader);
        }
        self.engine.advance_to(self.epoch.elapsed());
        self.handle_playback_events();

        // Viewport width in logical pixels drives the layout
        let width = ctx.screen_rect().width().max(0.0) as u32;
        self.engine.resize(width);

        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.engine.handle_key(" ");
            if !self.engine.is_playing() {
                self.current_visual_step = None;
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("drumgrid");
            ui.add_space(10.0);

            // MIDI Port Selection
            let mut selected_port_changed = None;
            ui.horizontal(|ui| {
                ui.label("MIDI Output:");
                if self.available_midi_ports.is_empty() {
                    ui.label("No MIDI ports available");
                } else {
                    egui::ComboBox::from_label("")
                        .selected_text(
                            self.selected_port
                                .and_then(|i| self.available_midi_ports.get(i))
                                .map(String::as_str)
                                .unwrap_or("Select port..."),
                        )
                        .show_ui(ui, |ui| {
                            if ui
                                .selectable_label(self.selected_port.is_none(), "None")
                                .clicked()
                            {
                                self.midi_output.disconnect();
                                self.selected_port = None;
                            }
                            for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                                if ui
                                    .selectable_label(self.selected_port == Some(i), port_name)
                                    .clicked()
                                {
                                    selected_port_changed = Some(i);
                                }
                            }
                        });
                }
            });

            if let Some(port_idx) = selected_port_changed {
                match self.midi_output.connect(port_idx) {
                    Ok(()) => self.selected_port = Some(port_idx),
                    Err(e) => warn!(error = %e, "MIDI connect failed"),
                }
            }

            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                if ui.button(self.engine.button_label()).clicked() {
                    self.toggle_play();
                }

                ui.add_space(20.0);

                ui.label("BPM:");
                let response = ui.add(egui::DragValue::new(&mut self.bpm_input).speed(1.0));
                if response.changed() {
                    let applied = self.engine.set_tempo(self.bpm_input);
                    if !response.has_focus() {
                        self.bpm_input = i64::from(applied);
                    }
                }
                if response.lost_focus() {
                    self.bpm_input = i64::from(self.engine.transport_state().tempo_bpm);
                }
            });

            ui.add_space(20.0);

            let visible_steps = self.engine.steps_per_row();
            let mut toggled = None;
            for instrument in Instrument::ALL {
                let row = instrument.row();
                ui.horizontal(|ui| {
                    let name = if self.engine.is_sample_ready(instrument) {
                        egui::RichText::new(instrument.display_name())
                    } else {
                        egui::RichText::new(instrument.display_name()).weak()
                    };
                    ui.add_sized([80.0, 40.0], egui::Label::new(name));

                    for step in 0..visible_steps {
                        let active = self.engine.is_active(row, step).unwrap_or(false);
                        let is_current = self.highlighted.contains(&(row, step));
                        let button = egui::Button::new("")
                            .min_size(egui::vec2(48.0, 40.0))
                            .fill(row_color(instrument, active))
                            .stroke(if is_current {
                                egui::Stroke::new(3.0, egui::Color32::WHITE)
                            } else {
                                egui::Stroke::NONE
                            });

                        if ui.add(button).clicked() {
                            toggled = Some((row, step));
                        }
                    }
                });
            }

            if let Some((row, step)) = toggled {
                if let Err(e) = self.engine.toggle_cell(row, step) {
                    warn!(error = %e, "toggle ignored");
                }
            }

            // Info
            ui.separator();
            let status = match self.current_visual_step {
                Some(step) if self.engine.is_playing() => format!("Step {}", step + 1),
                _ => "Stopped".to_string(),
            };
            ui.label(format!("{status} - space toggles playback"));
            if !self.midi_output.is_connected() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "No MIDI output connected - audio playback only",
                );
            }
        });
    }
}
