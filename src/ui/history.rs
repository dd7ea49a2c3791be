use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap},
    Frame,
};
use typemaster::{history::HistorySummary, stats::SessionResult};

use crate::{ui::charting, App};

/// Accuracy at or above this is shown in green
const GOOD_ACCURACY: u32 = 95;

/// Pure presenter for a single history table row
pub fn present_row(result: &SessionResult) -> Row<'static> {
    let accuracy_color = if result.accuracy >= GOOD_ACCURACY {
        Color::Green
    } else if result.accuracy >= 85 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(result.date.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(result.wpm.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}%", result.accuracy)).style(Style::default().fg(accuracy_color)),
        Cell::from(format!("{}/{}", result.correct_chars, result.total_chars)),
        Cell::from(format!("{:.0}s", result.elapsed_time)),
    ])
}

fn summary_line(summary: &HistorySummary) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::raw("tests "),
        Span::styled(summary.total_tests.to_string(), bold),
        Span::raw("   avg "),
        Span::styled(format!("{} wpm", summary.avg_wpm), bold),
        Span::raw("   best "),
        Span::styled(
            format!("{} wpm", summary.best_wpm),
            bold.fg(Color::Green),
        ),
        Span::raw("   consistency "),
        Span::styled(format!("±{:.1}", summary.wpm_std_dev), bold),
    ])
}

/// Render the history dashboard
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),      // Summary
            Constraint::Percentage(40), // Recent chart
            Constraint::Min(0),         // Results table
            Constraint::Length(2),      // Instructions
        ])
        .split(area);

    let title = format!("History ({})", app.config.profile);
    let summary = &app.history_view.summary;

    if summary.total_tests == 0 {
        let no_data =
            Paragraph::new("No tests yet. Start your first test to see history here!")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(no_data, chunks[0]);
    } else {
        let header = Paragraph::new(summary_line(summary))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(header, chunks[0]);

        let points: Vec<(f64, f64)> = summary
            .recent
            .iter()
            .map(|p| (p.index as f64, p.wpm as f64))
            .collect();
        let (last_index, highest_wpm) = charting::compute_chart_params(&points);
        let label_style = Style::default().add_modifier(Modifier::BOLD);

        let chart = Chart::new(vec![Dataset::default()
            .name("wpm")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recent progress"),
        )
        .x_axis(
            Axis::default()
                .title("test")
                .bounds([0.0, last_index])
                .labels(vec![
                    Span::styled("0", label_style),
                    Span::styled(charting::format_label(last_index), label_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", label_style),
                    Span::styled(charting::format_label(highest_wpm), label_style),
                ]),
        );
        f.render_widget(chart, chunks[1]);

        let table_height = chunks[2].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = summary.latest.len().saturating_sub(table_height);
        let scroll_offset = app.history_view.scroll_offset.min(max_scroll);

        let header = Row::new(vec![
            Cell::from("Date"),
            Cell::from("WPM"),
            Cell::from("Accuracy"),
            Cell::from("Correct"),
            Cell::from("Time"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = summary
            .latest
            .iter()
            .skip(scroll_offset)
            .take(table_height)
            .map(present_row)
            .collect();

        let widths = [
            Constraint::Length(18),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Min(6),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Tests"))
            .column_spacing(2);
        f.render_widget(table, chunks[2]);

        app.history_view.scroll_offset = scroll_offset;
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (b/backspace) back  (n) new test  (esc) quit",
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[3]);
}
