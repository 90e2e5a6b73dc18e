//! Step grid UI component.
//!
//! Renders one row per instrument: the instrument name followed by a toggle
//! cell for each of the 16 steps, with a step-number header on top.

use iced::widget::{button, container, row, text, Column, Row};
use iced::{Background, Border, Color, Element, Length, Theme};

use beatbox::instrument::InstrumentTable;
use beatbox::pattern::{Pattern, STEPS};

/// Layout sizes for consistent grid alignment.
const NAME_WIDTH: f32 = 120.0;
const CELL_SIZE: f32 = 22.0;
const CELL_SPACING: f32 = 2.0;

/// Steps per beat; every fourth cell starts a new quarter note.
const STEPS_PER_BEAT: usize = 4;

/// Cell fill colors.
fn cell_background(active: bool, on_beat: bool) -> Color {
    match (active, on_beat) {
        (true, _) => Color::from_rgb(0.95, 0.55, 0.15), // Orange
        (false, true) => Color::from_rgb(0.22, 0.22, 0.22),
        (false, false) => Color::from_rgb(0.14, 0.14, 0.14),
    }
}

fn header_color() -> Color {
    Color::from_rgb(0.7, 0.7, 0.7)
}

fn name_color() -> Color {
    Color::from_rgb(0.9, 0.9, 0.9)
}

/// Step numbers across the top, aligned with the cells.
fn view_step_header<'a, M: 'a>() -> Element<'a, M> {
    let numbers: Vec<Element<'a, M>> = (0..STEPS)
        .map(|step| {
            container(text(format!("{}", step + 1)).size(10).color(header_color()))
                .width(Length::Fixed(CELL_SIZE))
                .center_x(Length::Fixed(CELL_SIZE))
                .into()
        })
        .collect();

    row![
        container(text("")).width(Length::Fixed(NAME_WIDTH)),
        Row::with_children(numbers).spacing(CELL_SPACING),
    ]
    .into()
}

fn view_cell<'a, M: 'a + Clone>(active: bool, step: usize, on_toggle: M) -> Element<'a, M> {
    let bg_color = cell_background(active, step % STEPS_PER_BEAT == 0);

    button(text(""))
        .on_press(on_toggle)
        .width(Length::Fixed(CELL_SIZE))
        .height(Length::Fixed(CELL_SIZE))
        .style(move |_theme: &Theme, _status| button::Style {
            background: Some(Background::Color(bg_color)),
            border: Border::default().rounded(3),
            ..Default::default()
        })
        .into()
}

fn view_track_row<'a, M: 'a + Clone>(
    name: &'static str,
    steps: &[bool; STEPS],
    on_toggle: impl Fn(usize) -> M,
) -> Element<'a, M> {
    let cells: Vec<Element<'a, M>> = steps
        .iter()
        .enumerate()
        .map(|(step, &active)| view_cell(active, step, on_toggle(step)))
        .collect();

    row![
        container(text(name).size(12).color(name_color()))
            .width(Length::Fixed(NAME_WIDTH))
            .center_y(Length::Fixed(CELL_SIZE)),
        Row::with_children(cells).spacing(CELL_SPACING),
    ]
    .into()
}

/// Build the complete 16 x 16 editing grid.
///
/// `on_toggle` receives `(track, step)` for the clicked cell.
pub fn view_step_grid<'a, M: 'a + Clone>(
    pattern: &Pattern,
    instruments: &InstrumentTable,
    on_toggle: impl Fn(usize, usize) -> M + 'a + Copy,
) -> Element<'a, M> {
    let rows: Vec<Element<'a, M>> = pattern
        .tracks()
        .zip(instruments.iter())
        .enumerate()
        .map(|(track, (steps, instrument))| {
            view_track_row(instrument.name, steps, move |step| on_toggle(track, step))
        })
        .collect();

    Column::with_children(std::iter::once(view_step_header()).chain(rows))
        .spacing(CELL_SPACING)
        .into()
}
