//! BeatBox - a grid editor for 16-step drum patterns.
//!
//! Click cells to toggle hits, then Start to loop the pattern through the
//! configured MIDI output (preferring IAC Driver on macOS).

mod ui;

use std::path::PathBuf;

use iced::time::{self, milliseconds};
use iced::widget::{button, column, container, row, text, text_input};
use iced::{Center, Element, Fill, Length, Subscription, Theme};
use tracing::{error, info, warn};

use beatbox::backend::{MidiBackend, PlaybackBackend};
use beatbox::config::BeatBoxConfig;
use beatbox::session::Session;
use beatbox::transport::TransportState;

const BUTTON_WIDTH: f32 = 110.0;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    iced::application(BeatBox::new, BeatBox::update, BeatBox::view)
        .title("Cyber BeatBox")
        .subscription(BeatBox::subscription)
        .theme(BeatBox::theme)
        .run()
}

struct BeatBox {
    session: Session<MidiBackend>,
    config: BeatBoxConfig,
    config_path: PathBuf,
    port_name: Option<String>,
    path_input: String,
    last_error: Option<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Toggle(usize, usize),
    Start,
    Stop,
    TempoUp,
    TempoDown,
    Save,
    Load,
    PathChanged(String),
    Tick,
}

impl BeatBox {
    fn new() -> Self {
        let config_path = BeatBoxConfig::default_path();
        let mut last_error = None;
        let config = BeatBoxConfig::load(&config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Using default configuration");
            last_error = Some(e.to_string());
            BeatBoxConfig::default()
        });

        let (session, port_name) = match MidiBackend::open(config.port_hint(), config.base_bpm) {
            Ok(backend) => {
                let port_name = backend.port_name().to_string();
                (Session::new(backend), Some(port_name))
            }
            Err(e) => {
                error!(error = %e, "Playback disabled");
                last_error = Some(e.to_string());
                (Session::without_backend(e.to_string()), None)
            }
        };

        Self {
            session,
            path_input: config.last_pattern.clone().unwrap_or_default(),
            config,
            config_path,
            port_name,
            last_error,
        }
    }

    fn update(&mut self, message: Message) {
        let result = match message {
            Message::Toggle(track, step) => self.session.toggle(track, step).map(|_| ()),
            Message::Start => self.session.start(),
            Message::Stop => self.session.stop(),
            Message::TempoUp => self.session.tempo_up().map(|_| ()),
            Message::TempoDown => self.session.tempo_down().map(|_| ()),
            Message::Save => {
                self.save();
                return;
            }
            Message::Load => {
                self.load();
                return;
            }
            Message::PathChanged(path) => {
                self.path_input = path;
                return;
            }
            Message::Tick => {
                self.check_playback();
                return;
            }
        };
        self.report(result);
    }

    fn report(&mut self, result: beatbox::Result<()>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                error!(error = %e, "Command failed");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn save(&mut self) {
        let path = if self.path_input.trim().is_empty() {
            self.config.timestamped_pattern_path(chrono::Local::now())
        } else {
            PathBuf::from(self.path_input.trim())
        };

        let result = self.session.save(&path);
        if result.is_ok() {
            self.remember(path);
        }
        self.report(result);
    }

    fn load(&mut self) {
        let input = self.path_input.trim();
        if input.is_empty() {
            self.last_error = Some("Enter a pattern file to load".to_string());
            return;
        }

        let path = PathBuf::from(input);
        match self.session.load_pattern(&path) {
            Ok(()) => {
                self.remember(path);
                let result = self.session.replay();
                self.report(result);
            }
            Err(e) => self.report(Err(e)),
        }
    }

    /// Keep the last used file in the config so it is offered next launch.
    fn remember(&mut self, path: PathBuf) {
        let path = path.display().to_string();
        self.path_input = path.clone();
        self.config.last_pattern = Some(path);
        if let Err(e) = self.config.save(&self.config_path) {
            warn!(error = %e, "Failed to save config");
        } else {
            info!(path = %self.config_path.display(), "Config saved");
        }
    }

    /// The playback thread stops itself if the port goes away.
    fn check_playback(&mut self) {
        let Some(transport) = self.session.transport() else {
            return;
        };
        if transport.is_playing() && !transport.backend().is_playing() {
            warn!("Playback thread stopped unexpectedly");
            let result = self.session.stop();
            self.report(result);
            self.last_error = Some("Playback stopped unexpectedly".to_string());
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let state = self.session.state();
        let state_color = if state == TransportState::Playing {
            iced::Color::from_rgb(0.2, 0.8, 0.2)
        } else {
            iced::Color::from_rgb(0.6, 0.6, 0.6)
        };

        let connection_status = match &self.port_name {
            Some(name) => format!("MIDI out: {}", name),
            None => "No MIDI output".to_string(),
        };

        let factor = self.session.tempo_factor();
        let bpm = self.config.base_bpm * factor;

        let grid = ui::step_grid::view_step_grid(
            self.session.pattern(),
            self.session.instruments(),
            Message::Toggle,
        );

        let controls = column![
            command_button("Start", Message::Start),
            command_button("Stop", Message::Stop),
            command_button("Tempo Up", Message::TempoUp),
            command_button("Tempo Down", Message::TempoDown),
            command_button("Save", Message::Save),
            command_button("Load", Message::Load),
        ]
        .spacing(5);

        let status = row![
            text(state.to_string()).size(20).color(state_color),
            text(format!("Tempo x{:.3}", factor)).size(16),
            text(format!("BPM: {:.1}", bpm)).size(16),
            text(connection_status).size(14),
        ]
        .spacing(20)
        .align_y(Center);

        let file_row = row![
            text("Pattern file").size(14),
            text_input("pattern file (empty = timestamped)", &self.path_input)
                .on_input(Message::PathChanged)
                .on_submit(Message::Load)
                .width(Length::Fixed(360.0)),
        ]
        .spacing(10)
        .align_y(Center);

        let error_line = text(self.last_error.clone().unwrap_or_default())
            .size(14)
            .color(iced::Color::from_rgb(0.9, 0.3, 0.3));

        let content = column![
            text("Cyber BeatBox").size(32),
            status,
            row![grid, controls].spacing(20),
            file_row,
            error_line,
        ]
        .spacing(12)
        .padding(10);

        container(content)
            .width(Fill)
            .height(Fill)
            .center_x(Fill)
            .center_y(Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.session.state() == TransportState::Playing {
            time::every(milliseconds(250)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

impl Default for BeatBox {
    fn default() -> Self {
        Self::new()
    }
}

fn command_button(label: &str, message: Message) -> Element<'_, Message> {
    button(text(label))
        .on_press(message)
        .width(Length::Fixed(BUTTON_WIDTH))
        .into()
}
