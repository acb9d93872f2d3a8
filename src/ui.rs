use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::model::{ColumnHeader, DisplayState, UIData};
use crate::sort::Direction;

pub const BORDER_SIZE: usize = 2;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
/// A space and the sort marker after each column name.
pub const SORT_MARKER_WIDTH: usize = 2;

const COLUMN_SPACING: u16 = 1;

pub struct TableUI {
    highlight: Style,
}

impl TableUI {
    pub fn new() -> Self {
        Self {
            highlight: Style::new().bg(Color::DarkGray),
        }
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let title = Line::from(format!(" {} ", uidata.name).bold());
        let instructions = Line::from(vec![
            " Search ".into(),
            "</>".blue().bold(),
            " Sort ".into(),
            "<s>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);

        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        let [table_area, cmdline_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(CMDLINE_HEIGHT as u16)])
                .areas(inner);

        match &uidata.state {
            DisplayState::Table => self.draw_table(uidata, frame, table_area),
            DisplayState::NoResults => self.draw_message(
                uidata,
                frame,
                table_area,
                Line::from("No results".italic().fg(Color::Gray)),
            ),
            DisplayState::Loading => self.draw_message(
                uidata,
                frame,
                table_area,
                Line::from("Loading ...".italic()),
            ),
            DisplayState::Error(message) => {
                let text = vec![
                    Line::from("Error loading TSV".bold().fg(Color::Red)),
                    Line::from(message.clone()),
                ];
                frame.render_widget(Paragraph::new(text), table_area);
            }
        }

        self.draw_cmdline(uidata, frame, cmdline_area);

        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let rows = uidata
            .rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Cell::from(c.as_str()))));

        let table = Table::new(rows, column_widths(&uidata.header))
            .header(header_row(&uidata.header))
            .column_spacing(COLUMN_SPACING)
            .row_highlight_style(Style::new().add_modifier(Modifier::BOLD))
            .cell_highlight_style(self.highlight);

        let mut state = TableState::default()
            .with_selected(Some(uidata.selected_row))
            .with_selected_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, area, &mut state);
    }

    // Header (when there is one) followed by a single message line.
    fn draw_message(&self, uidata: &UIData, frame: &mut Frame, area: Rect, message: Line) {
        if uidata.header.is_empty() {
            frame.render_widget(Paragraph::new(message), area);
            return;
        }
        let [header_area, message_area] = Layout::vertical([
            Constraint::Length(TABLE_HEADER_HEIGHT as u16),
            Constraint::Min(1),
        ])
        .areas(area);

        let header = Table::new(Vec::<Row>::new(), column_widths(&uidata.header))
            .header(header_row(&uidata.header))
            .column_spacing(COLUMN_SPACING);
        frame.render_widget(header, header_area);
        frame.render_widget(Paragraph::new(message), message_area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = "/";
            let line = Line::from(vec![prompt.blue().bold(), Span::raw(&uidata.cmdinput.input)]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.len() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let position = if uidata.nrows == 0 {
            format!("0/{}", uidata.total_rows)
        } else {
            format!(
                "{}:{}/{}",
                uidata.abs_selected_row + 1,
                uidata.nrows,
                uidata.total_rows
            )
        };
        let mut left = vec![Span::raw(uidata.status_message.as_str())];
        if !uidata.query.is_empty() {
            left.push("  filter: ".dark_gray());
            left.push(Span::raw(uidata.query.as_str()).yellow());
        }

        let [left_area, right_area] =
            Layout::horizontal([Constraint::Min(1), Constraint::Length(position.len() as u16 + 1)])
                .areas(area);
        frame.render_widget(Paragraph::new(Line::from(left)), left_area);
        frame.render_widget(Paragraph::new(Line::from(position).right_aligned()), right_area);
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let height = message.lines().count() as u16 + 2;
        let area = centered(frame.area(), width, height);
        let popup = Paragraph::new(message.to_string()).block(
            Block::bordered()
                .title(" Help ".bold())
                .border_set(border::ROUNDED),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn header_label(column: &ColumnHeader) -> String {
    let marker = match (column.active_sort, column.sort) {
        (true, Some(Direction::Ascending)) => "▲",
        (true, Some(Direction::Descending)) => "▼",
        _ => "↕",
    };
    // Long names are cut so the marker always stays visible
    let room = column.width.saturating_sub(SORT_MARKER_WIDTH);
    if column.name.chars().count() <= room {
        return format!("{} {marker}", column.name);
    }
    let name: String = column.name.chars().take(room.saturating_sub(1)).collect();
    format!("{name}… {marker}")
}

fn header_row(header: &[ColumnHeader]) -> Row<'static> {
    Row::new(header.iter().map(|h| Cell::from(header_label(h))))
        .style(Style::new().bold().fg(Color::Yellow))
}

fn column_widths(header: &[ColumnHeader]) -> Vec<Constraint> {
    header
        .iter()
        .map(|h| Constraint::Length(h.width as u16))
        .collect()
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::inputter::InputResult;

    fn header(names: &[&str]) -> Vec<ColumnHeader> {
        names
            .iter()
            .map(|n| ColumnHeader {
                name: n.to_string(),
                width: 10,
                sort: None,
                active_sort: false,
            })
            .collect()
    }

    fn uidata(state: DisplayState) -> UIData {
        UIData {
            name: "people.tsv".to_string(),
            state,
            header: header(&["Name", "Age"]),
            rows: vec![
                vec!["Bob".to_string(), "25".to_string()],
                vec!["Alice".to_string(), "30".to_string()],
            ],
            nrows: 2,
            total_rows: 2,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            query: String::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            status_message: "Loaded 2 rows".to_string(),
        }
    }

    fn render(data: &UIData) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let ui = TableUI::new();
        terminal.draw(|f| ui.draw(data, f)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn sort_markers() {
        let mut column = header(&["Age"]).remove(0);
        assert_eq!(header_label(&column), "Age ↕");
        column.sort = Some(Direction::Ascending);
        // Remembered direction of an inactive column is not shown
        assert_eq!(header_label(&column), "Age ↕");
        column.active_sort = true;
        assert_eq!(header_label(&column), "Age ▲");
        column.sort = Some(Direction::Descending);
        assert_eq!(header_label(&column), "Age ▼");
    }

    #[test]
    fn long_names_keep_their_marker() {
        let column = ColumnHeader {
            name: "Population in thousands (2020 census)".to_string(),
            width: 12,
            sort: Some(Direction::Descending),
            active_sort: true,
        };
        let label = header_label(&column);
        assert_eq!(label, "Populatio… ▼");
        assert_eq!(label.chars().count(), column.width);
    }

    #[test]
    fn renders_table_rows() {
        let screen = render(&uidata(DisplayState::Table));
        assert!(screen.contains("people.tsv"));
        assert!(screen.contains("Name ↕"));
        assert!(screen.contains("Alice"));
        assert!(screen.contains("Loaded 2 rows"));
        assert!(screen.contains("1:2/2"));
    }

    #[test]
    fn no_results_and_error_are_distinct() {
        let mut data = uidata(DisplayState::NoResults);
        data.rows.clear();
        data.nrows = 0;
        let screen = render(&data);
        assert!(screen.contains("No results"));
        assert!(screen.contains("Name ↕"));
        assert!(!screen.contains("Error loading TSV"));

        let mut data = uidata(DisplayState::Error("server answered with HTTP 404".to_string()));
        data.header.clear();
        data.rows.clear();
        let screen = render(&data);
        assert!(screen.contains("Error loading TSV"));
        assert!(screen.contains("HTTP 404"));
        assert!(!screen.contains("No results"));
    }

    #[test]
    fn search_prompt_and_help_popup() {
        let mut data = uidata(DisplayState::Table);
        data.active_cmdinput = true;
        data.cmdinput.input = "bob".to_string();
        data.cmdinput.cursor_pos = 3;
        data.show_popup = true;
        data.popup_message = "q        quit".to_string();
        let screen = render(&data);
        assert!(screen.contains("/bob"));
        assert!(screen.contains("Help"));
        assert!(screen.contains("quit"));
    }
}
