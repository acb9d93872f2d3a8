use arboard::Clipboard;
use rayon::prelude::*;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::dataset::Dataset;
use crate::domain::{HELP_TEXT, Message, TVConfig, TVError};
use crate::inputter::{InputResult, Inputter};
use crate::loader::Source;
use crate::sort::Direction;
use crate::ui::{BORDER_SIZE, CMDLINE_HEIGHT, SORT_MARKER_WIDTH, TABLE_HEADER_HEIGHT};
use crate::view::{LoadTicket, Phase, ViewCoordinator};

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Search,
    Popup,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    Table,
    NoResults,
    Loading,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub name: String,
    pub width: usize,
    pub sort: Option<Direction>,
    pub active_sort: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub state: DisplayState,
    pub header: Vec<ColumnHeader>,
    pub rows: Vec<Vec<String>>, // Visible window, one cell per visible column
    pub nrows: usize,           // Rows in the view after filtering
    pub total_rows: usize,      // Records in the dataset
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub query: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub status_message: String,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(BORDER_SIZE),
            table_height: ui_height
                .saturating_sub(BORDER_SIZE + TABLE_HEADER_HEIGHT + CMDLINE_HEIGHT)
                .max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: TVConfig,
    source: Option<Source>,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    coordinator: ViewCoordinator,
    column_widths: Vec<usize>,
    load_requests: Vec<(Source, LoadTicket)>,
    cursor_row: usize,
    cursor_column: usize,
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    status_message: String,
}

impl Model {
    pub fn init(
        config: &TVConfig,
        source: Option<Source>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let mut model = Self {
            config: config.clone(),
            source,
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            coordinator: ViewCoordinator::new(),
            column_widths: Vec::new(),
            load_requests: Vec::new(),
            cursor_row: 0,
            cursor_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            clipboard: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            status_message: "Started tsvt!".to_string(),
        };
        model.reload();
        model
    }

    /// Loads that the host still has to start. Each one is answered with a
    /// `Message::Loaded` carrying the same ticket.
    pub fn take_load_requests(&mut self) -> Vec<(Source, LoadTicket)> {
        std::mem::take(&mut self.load_requests)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Search
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        let Some(msg) = message else {
            return Ok(());
        };

        match msg {
            Message::Loaded(ticket, result) => self.loaded(ticket, result),
            Message::Resize(width, height) => self.ui_resize(width, height),
            Message::Quit => self.quit(),
            msg => match self.modus {
                Modus::Table => match msg {
                    Message::MoveDown => self.move_row(1),
                    Message::MoveUp => self.move_row(-1),
                    Message::MovePageDown => {
                        self.move_row(self.uilayout.table_height as isize)
                    }
                    Message::MovePageUp => {
                        self.move_row(-(self.uilayout.table_height as isize))
                    }
                    Message::MoveBeginning => self.move_row(isize::MIN),
                    Message::MoveEnd => self.move_row(isize::MAX),
                    Message::MoveLeft => self.move_column(-1),
                    Message::MoveRight => self.move_column(1),
                    Message::SortColumn => self.sort_column(self.cursor_column),
                    Message::SortColumnIdx(column) => self.sort_column(column),
                    Message::Search => self.enter_search(),
                    Message::Reload => self.reload(),
                    Message::CopyCell => self.copy_cell(),
                    Message::CopyRow => self.copy_row(),
                    Message::Help => self.show_help(),
                    Message::Exit => self.exit(),
                    _ => (),
                },
                Modus::Search => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
                Modus::Popup => {
                    if let Message::Exit | Message::Help = msg {
                        self.exit()
                    }
                }
            },
        }
        Ok(())
    }

    /// Derives the frame contents from the current view.
    pub fn ui_data(&self) -> UIData {
        let view = self.coordinator.current_view();
        let spec = self.coordinator.sort_spec();
        let active = spec.active().map(|(c, _)| c);
        let visible = self.visible_columns();

        let header: Vec<ColumnHeader> = visible
            .iter()
            .map(|&c| ColumnHeader {
                name: view.header().get(c).cloned().unwrap_or_default(),
                width: self.column_widths.get(c).copied().unwrap_or(1),
                sort: spec.direction(c),
                active_sort: active == Some(c),
            })
            .collect();

        let rend = (self.offset_row + self.uilayout.table_height).min(view.len());
        let rows: Vec<Vec<String>> = view.rows()[self.offset_row.min(rend)..rend]
            .iter()
            .map(|row| {
                // Short rows are padded, cells beyond the header are not shown
                visible
                    .iter()
                    .map(|&c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        let state = match (self.coordinator.phase(), self.coordinator.load_error()) {
            (_, Some(e)) => DisplayState::Error(e.to_string()),
            (Phase::Unloaded, None) if self.coordinator.is_loading() => DisplayState::Loading,
            _ if view.is_empty() => DisplayState::NoResults,
            _ => DisplayState::Table,
        };

        UIData {
            name: self.source.as_ref().map(|s| s.name()).unwrap_or_default(),
            state,
            header,
            rows,
            nrows: view.len(),
            total_rows: self.coordinator.dataset().map_or(0, |d| d.records().len()),
            selected_row: self.cursor_row.saturating_sub(self.offset_row),
            selected_column: visible
                .iter()
                .position(|&c| c == self.cursor_column)
                .unwrap_or(0),
            abs_selected_row: self.cursor_row,
            query: self.coordinator.query().as_str().to_string(),
            show_popup: self.modus == Modus::Popup,
            popup_message: HELP_TEXT.to_string(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.modus == Modus::Search,
            status_message: self.status_message.clone(),
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn reload(&mut self) {
        let Some(source) = self.source.clone() else {
            self.set_status_message("No source to load");
            return;
        };
        let ticket = self.coordinator.begin_load();
        info!("Loading {source:?} as {ticket:?}");
        self.load_requests.push((source, ticket));
        self.set_status_message("Loading ...");
    }

    fn loaded(&mut self, ticket: LoadTicket, result: Result<String, TVError>) {
        if !self.coordinator.complete_load(ticket, result) {
            return;
        }
        // A fresh dataset comes with an empty query
        self.input.clear();
        self.last_input = self.input.get();
        if self.modus == Modus::Search {
            self.modus = self.previous_modus;
        }
        self.column_widths = self
            .coordinator
            .dataset()
            .map(|d| Self::calculate_column_widths(d, self.config.max_column_width))
            .unwrap_or_default();
        self.cursor_row = 0;
        self.offset_row = 0;
        self.cursor_column = self.cursor_column.min(self.column_widths.len().saturating_sub(1));
        self.fit_columns();

        match self.coordinator.load_error() {
            Some(e) => {
                let message = format!("Error loading TSV: {e}");
                self.set_status_message(message);
            }
            None => {
                let rows = self.coordinator.current_view().len();
                self.set_status_message(format!("Loaded {rows} rows"));
            }
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.fit_rows();
        self.fit_columns();
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::Table => {
                if !self.coordinator.query().is_empty() {
                    self.input.clear();
                    self.last_input = self.input.get();
                    self.apply_query("");
                }
            }
            Modus::Popup => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::Popup;
            }
            Modus::Search => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
    }

    fn enter_search(&mut self) {
        trace!("Entering search mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::Search;
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            let query = self.last_input.input.clone();
            self.apply_query(&query);
        }
        if self.last_input.canceled {
            self.set_status_message("Search canceled");
        }
        if self.last_input.finished {
            trace!("Search finished with {:?}", self.last_input.input);
            self.modus = self.previous_modus;
            self.previous_modus = Modus::Search;
        }
    }

    fn apply_query(&mut self, raw: &str) {
        if self.coordinator.set_query(raw) {
            self.cursor_row = 0;
            self.offset_row = 0;
            let view = self.coordinator.current_view();
            let message = if self.coordinator.query().is_empty() {
                format!("{} rows", view.len())
            } else if view.is_empty() {
                "Found no matches!".to_string()
            } else {
                format!("Found {} results", view.len())
            };
            self.set_status_message(message);
        }
    }

    fn sort_column(&mut self, column: usize) {
        let Some(name) = self
            .coordinator
            .current_view()
            .header()
            .get(column)
            .cloned()
        else {
            debug!("Ignoring sort on missing column {column}");
            return;
        };
        let direction = self.coordinator.toggle_sort(column);
        self.cursor_column = column;
        self.fit_columns();
        let marker = match direction {
            Direction::Ascending => "▲",
            Direction::Descending => "▼",
        };
        self.set_status_message(format!("Sorted by {name} {marker}"));
    }

    fn move_row(&mut self, step: isize) {
        let nrows = self.coordinator.current_view().len();
        if nrows == 0 {
            return;
        }
        self.cursor_row = self.cursor_row.saturating_add_signed(step).min(nrows - 1);
        self.fit_rows();
    }

    fn move_column(&mut self, step: isize) {
        let ncols = self.column_widths.len();
        if ncols == 0 {
            return;
        }
        self.cursor_column = self.cursor_column.saturating_add_signed(step).min(ncols - 1);
        self.fit_columns();
    }

    // Keep the cursor row inside the visible window.
    fn fit_rows(&mut self) {
        let height = self.uilayout.table_height;
        if self.cursor_row < self.offset_row {
            self.offset_row = self.cursor_row;
        } else if self.cursor_row >= self.offset_row + height {
            self.offset_row = self.cursor_row + 1 - height;
        }
    }

    fn fit_columns(&mut self) {
        if self.cursor_column < self.offset_column {
            self.offset_column = self.cursor_column;
        }
        while self.offset_column < self.cursor_column
            && !self.visible_columns().contains(&self.cursor_column)
        {
            self.offset_column += 1;
        }
    }

    // Columns that fit into the table width, starting at the column offset.
    // The first one is always included, even if it is wider than the table.
    fn visible_columns(&self) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut used = 0;
        for (idx, &width) in self.column_widths.iter().enumerate().skip(self.offset_column) {
            if !visible.is_empty() && used + width + 1 > self.uilayout.table_width {
                break;
            }
            visible.push(idx);
            used += width + 1;
        }
        visible
    }

    fn calculate_column_widths(dataset: &Dataset, max_column_width: usize) -> Vec<usize> {
        let Some(header) = dataset.header() else {
            return Vec::new();
        };
        let records = dataset.records();
        header
            .par_iter()
            .enumerate()
            .map(|(idx, name)| {
                let widest_cell = records
                    .iter()
                    .filter_map(|r| r.get(idx))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0);
                let width = widest_cell.max(name.chars().count() + SORT_MARKER_WIDTH);
                // Never narrower than one name char plus the marker
                let min_width = SORT_MARKER_WIDTH + 1;
                width.clamp(min_width, max_column_width.max(min_width))
            })
            .collect()
    }

    fn current_row(&self) -> Option<Vec<String>> {
        self.coordinator
            .current_view()
            .row(self.cursor_row)
            .map(|r| r.to_vec())
    }

    fn copy_cell(&mut self) {
        let Some(cell) = self
            .current_row()
            .and_then(|r| r.get(self.cursor_column).cloned())
        else {
            return;
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell, "cell");
    }

    fn copy_row(&mut self) {
        let Some(row) = self.current_row() else {
            return;
        };
        self.copy_to_clipboard(row.join("\t"), "row");
    }

    fn copy_to_clipboard(&mut self, text: String, what: &str) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => warn!("Clipboard unavailable: {:?}", e),
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("Clipboard unavailable");
            return;
        };
        match clipboard.set_text(text) {
            Ok(_) => {
                trace!("Copied {what} to clipboard.");
                self.set_status_message(format!("Copied {what}"));
            }
            Err(e) => warn!("Error copying to clipboard: {:?}", e),
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }
}
