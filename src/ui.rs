pub mod charting;
pub mod history;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, Gauge, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};
use typemaster::session::Phase;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
/// Countdown turns red below this many seconds
const LOW_TIME_SECS: u64 = 10;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Results => render_results(self, area, buf),
            _ => render_typing(self, area, buf),
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let engine = &app.engine;

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default()
        .patch(bold_style)
        .fg(Color::Red)
        .add_modifier(Modifier::UNDERLINED);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let cursor_style = Style::default()
        .patch(bold_style)
        .fg(Color::Magenta)
        .add_modifier(Modifier::UNDERLINED);

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_width = engine.target().width();
    let prompt_occupied_lines = if prompt_width <= max_chars_per_line as usize {
        1
    } else {
        ((prompt_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };

    let padding = area.height.saturating_sub(prompt_occupied_lines + 5) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // countdown
            Constraint::Length(1), // progress
            Constraint::Length(1), // live stats
            Constraint::Length(1),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Length(1), // hint
            Constraint::Min(0),
        ])
        .split(area);

    let remaining = engine.seconds_remaining();
    let timer_style = if remaining < LOW_TIME_SECS {
        Style::default().patch(bold_style).fg(Color::Red)
    } else {
        Style::default().patch(bold_style).fg(Color::Magenta)
    };
    Paragraph::new(Span::styled(format!("{remaining}s"), timer_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .percent(engine.progress().round() as u16)
        .render(chunks[2], buf);

    let live = engine.live();
    Paragraph::new(Span::styled(
        format!("{} wpm   {}% acc", live.wpm, live.accuracy),
        dim_bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    let typed: Vec<char> = engine.input().chars().collect();
    let spans = engine
        .target()
        .chars()
        .enumerate()
        .map(|(idx, expected)| match typed.get(idx) {
            Some(&c) if c == expected => Span::styled(expected.to_string(), green_bold_style),
            Some(_) => Span::styled(
                match expected {
                    ' ' => "·".to_owned(),
                    e => e.to_string(),
                },
                red_bold_style,
            ),
            None if idx == typed.len() => Span::styled(expected.to_string(), cursor_style),
            None => Span::styled(expected.to_string(), dim_bold_style),
        })
        .collect::<Vec<Span>>();

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_occupied_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[5], buf);

    let hint = if engine.phase() == Phase::Idle && engine.input().is_empty() {
        "start typing..."
    } else {
        "(tab) new text / (enter) finish / (esc)ape"
    };
    Paragraph::new(Span::styled(
        hint,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[6], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(result) = app.engine.result() else {
        return;
    };

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // character counts
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points = charting::result_series(result);
    let (overall_duration, highest_wpm) = charting::compute_chart_params(&points);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, overall_duration])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(overall_duration), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_wpm), bold_style),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} words   {}s",
            result.wpm,
            result.accuracy,
            result.words_typed(),
            result.elapsed_time.round()
        ),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} correct / {} incorrect / {} typed",
            result.correct_chars, result.incorrect_chars, result.total_chars
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        "(enter) new test / (h)istory / (esc)ape",
        italic_style,
    ))
    .render(chunks[4], buf);
}
