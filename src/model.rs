use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::domain::{CMDMode, CvaConfig, CvaError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::records::{FieldCatalog, Record, Value};
use crate::render::{ColumnView, RenderedPage, TableSpec, formats, render_page};
use crate::source::{DataSource, FetchError, FetchResponse};
use crate::view::{FilterScope, FilterState, Pager, VisibleFields, filter_rows};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    LOADING,
    QUITTING,
}

#[derive(Debug, Clone, Copy)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Snapshot handed to the UI for rendering.
pub struct UIData {
    pub title: String,
    pub columns: Vec<ColumnView>,
    pub placeholder: Option<String>,
    pub nrows: usize,
    pub page: usize,
    pub total_pages: usize,
    pub cursor_row: usize,
    pub cursor_column: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub filter_echo: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: String::new(),
            columns: Vec::new(),
            placeholder: None,
            nrows: 0,
            page: 1,
            total_pages: 1,
            cursor_row: 0,
            cursor_column: 0,
            loading: false,
            error: None,
            filter_echo: String::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: CvaConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    catalog: FieldCatalog,
    records: Vec<Record>,
    filtered: Vec<usize>,
    visible: VisibleFields,
    filter: FilterState,
    pager: Pager,
    cursor_row: usize,
    cursor_column: usize,
    spec: TableSpec,
    source: DataSource,
    error: Option<FetchError>,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    uidata: UIData,
}

/// Formatter registrations for the fields the backend pages carry.
fn table_spec(catalog: &FieldCatalog, config: &CvaConfig) -> TableSpec {
    let mut spec = TableSpec::default()
        .with_labels(catalog.labels())
        .with_max_column_width(config.max_column_width);
    if catalog.contains("value") {
        spec = spec.with_format("value", formats::currency);
    }
    if catalog.contains("startDate") {
        spec = spec.with_format("startDate", formats::date);
    }
    if catalog.contains("endDate") {
        spec = spec.with_format("endDate", formats::date);
    }
    if catalog.contains("paymentStatus") {
        spec = spec.with_format("paymentStatus", formats::payment_badge);
        spec = spec.with_row_action(|record: &Record| {
            if record.get("paymentStatus").display().eq_ignore_ascii_case("pagado") {
                String::new()
            } else {
                "[m] pagar".to_string()
            }
        });
    }
    spec
}

impl Model {
    pub fn init(config: &CvaConfig, catalog: FieldCatalog, source: DataSource) -> Result<Self, CvaError> {
        let spec = table_spec(&catalog, config);
        let visible = VisibleFields::all(&catalog);
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            catalog,
            records: Vec::new(),
            filtered: Vec::new(),
            visible,
            filter: FilterState::default(),
            pager: Pager::new(config.page_size, config.page_policy),
            cursor_row: 0,
            cursor_column: 0,
            spec,
            source,
            error: None,
            clipboard: Clipboard::new().ok(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Started cva!".to_string(),
            uidata: UIData::empty(),
        };
        model.rebuild();
        Ok(model)
    }

    /// Kick off the initial load.
    pub fn start(&mut self) {
        self.status = Status::LOADING;
        self.source.fetch();
        self.set_status_message("Loading ...");
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    /// A fetch finished. Responses from superseded fetches are dropped
    /// so stale data never overwrites the state of a newer request.
    pub fn apply_response(&mut self, response: FetchResponse) {
        if !self.source.is_current(response.generation) {
            trace!(
                "Dropping stale fetch response (generation {} < {})",
                response.generation,
                self.source.generation()
            );
            return;
        }
        self.status = Status::READY;
        match response.result {
            Ok(records) => {
                info!("Fetched {} records", records.len());
                // Wholesale replacement; no incremental merge.
                self.records = records;
                self.error = None;
                self.refilter(true);
                let n = self.records.len();
                self.set_status_message(format!("Loaded {n} records"));
            }
            Err(e) => {
                warn!("Fetch failed: {}", e.message);
                self.error = Some(e);
                self.rebuild();
            }
        }
    }

    /// Recompute the filtered row set. Resets to page 1 on filter or
    /// data changes; otherwise keeps the page clamped in range.
    fn refilter(&mut self, reset_page: bool) {
        self.filtered = filter_rows(&self.records, &self.filter, &self.visible);
        if reset_page {
            self.pager.reset();
            self.cursor_row = 0;
        } else {
            let total = self.pager.total_pages(self.filtered.len());
            if self.pager.current() > total {
                self.pager.reset();
                self.cursor_row = 0;
            }
        }
        self.rebuild();
    }

    fn page_rows(&self) -> &[usize] {
        self.pager.slice(&self.filtered)
    }

    fn selected_record(&self) -> Option<&Record> {
        let row = *self.page_rows().get(self.cursor_row)?;
        self.records.get(row)
    }

    fn selected_field(&self) -> Option<&str> {
        self.visible
            .names()
            .get(self.cursor_column)
            .map(String::as_str)
    }

    fn rebuild(&mut self) {
        let page_records: Vec<&Record> = self
            .page_rows()
            .iter()
            .filter_map(|&row| self.records.get(row))
            .collect();
        let RenderedPage { columns, placeholder } =
            render_page(&self.spec, &self.visible, &page_records);

        let filter_echo = if self.filter.is_active() {
            match &self.filter.scope {
                FilterScope::All => format!("/{}", self.filter.query),
                FilterScope::Field(field) => {
                    format!("{}={}", self.catalog.label(field), self.filter.query)
                }
            }
        } else {
            String::new()
        };

        self.uidata = UIData {
            title: format!("cva [{} registros]", self.records.len()),
            columns,
            placeholder,
            nrows: self.filtered.len(),
            page: self.pager.current(),
            total_pages: self.pager.total_pages(self.filtered.len()),
            cursor_row: self.cursor_row,
            // The UI counts the leading actions column, when present.
            cursor_column: self.cursor_column + usize::from(self.spec.row_action.is_some()),
            loading: self.status == Status::LOADING,
            error: self.error.as_ref().map(|e| e.message.clone()),
            filter_echo,
            show_popup: self.uidata.show_popup,
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), CvaError> {
        // Pump finished fetches every tick, whether or not a key
        // arrived. Stale generations are dropped inside.
        while let Some(response) = self.source.try_recv() {
            self.apply_response(response);
        }

        let Some(msg) = message else {
            return Ok(());
        };

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_cursor_up(),
                Message::MoveDown => self.move_cursor_down(),
                Message::MoveLeft => self.move_cursor_left(),
                Message::MoveRight => self.move_cursor_right(),
                Message::PageNext => self.change_page(|p, n| p.next(n)),
                Message::PagePrev => self.change_page(|p, n| p.prev(n)),
                Message::PageFirst => self.change_page(|p, n| p.set_page(1, n)),
                Message::PageLast => self.change_page(|p, n| p.last(n)),
                Message::GotoPage => self.enter_cmd_mode(CMDMode::GotoPage),
                Message::FilterAll => self.enter_cmd_mode(CMDMode::FilterAll),
                Message::FilterInColumn => self.enter_cmd_mode(CMDMode::FilterInColumn),
                Message::ToggleColumn(n) => self.toggle_column(n),
                Message::ToggleAllColumns => self.toggle_all_columns(),
                Message::Refetch => self.refetch(),
                Message::MarkPaid => self.mark_paid(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Exit => self.clear_filter(),
                Message::Resize(w, h) => {
                    trace!("UI resized to {w}x{h}");
                    self.input.set_width(w);
                    self.rebuild();
                }
                Message::RawKey(_) => {}
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.close_popup(),
                _ => {}
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key);
                }
            }
        }
        Ok(())
    }

    // -------------------- message handlers ---------------------- //

    fn move_cursor_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
        self.rebuild();
    }

    fn move_cursor_down(&mut self) {
        let rows = self.page_rows().len();
        if rows > 0 && self.cursor_row < rows - 1 {
            self.cursor_row += 1;
        }
        self.rebuild();
    }

    fn move_cursor_left(&mut self) {
        self.cursor_column = self.cursor_column.saturating_sub(1);
        self.rebuild();
    }

    fn move_cursor_right(&mut self) {
        if !self.visible.is_empty() && self.cursor_column < self.visible.len() - 1 {
            self.cursor_column += 1;
        }
        self.rebuild();
    }

    fn change_page(&mut self, op: impl Fn(&mut Pager, usize) -> bool) {
        if op(&mut self.pager, self.filtered.len()) {
            self.cursor_row = 0;
        }
        self.rebuild();
    }

    fn toggle_column(&mut self, n: usize) {
        let Some(spec) = self.catalog.specs().get(n) else {
            self.set_status_message(format!("No column {}", n + 1));
            return;
        };
        let name = spec.name.clone();
        self.visible.toggle(&name);
        self.cursor_column = std::cmp::min(
            self.cursor_column,
            self.visible.len().saturating_sub(1),
        );
        debug!("Toggled column \"{}\", {} visible", name, self.visible.len());
        // Visibility feeds the all-columns filter scope, so the
        // filtered set can change here.
        self.refilter(true);
    }

    fn toggle_all_columns(&mut self) {
        self.visible.toggle_all(&self.catalog);
        self.cursor_column = 0;
        self.refilter(true);
    }

    fn refetch(&mut self) {
        self.status = Status::LOADING;
        self.source.refetch();
        self.set_status_message("Refetching ...");
        self.rebuild();
    }

    /// Patch only the matching record, by identifier, in place. The
    /// list is not refetched and the page does not move.
    fn mark_paid(&mut self) {
        if !self.catalog.contains("paymentStatus") {
            self.set_status_message("This view has no payment status");
            return;
        }
        let Some(id) = self.selected_record().map(Record::id) else {
            self.set_status_message("No record selected");
            return;
        };
        if let Some(record) = self.records.iter_mut().find(|r| r.id() == id) {
            record.set("paymentStatus", Value::Text("pagado".to_string()));
            info!("Marked record {id} as paid");
        }
        self.rebuild();
        self.set_status_message(format!("Record {id} marked as paid"));
    }

    fn copy_to_clipboard(&mut self, content: String) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => {
                    warn!("Error copying to clipboard: {e:?}");
                    self.set_status_message("Clipboard unavailable");
                }
            },
            None => self.set_status_message("Clipboard unavailable"),
        }
    }

    fn copy_cell(&mut self) {
        let cell = match (self.selected_record(), self.selected_field()) {
            (Some(record), Some(field)) => record.get(field).display(),
            _ => return,
        };
        trace!("Cell content: {cell}");
        self.copy_to_clipboard(cell);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);
        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_row(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let content = self
            .visible
            .names()
            .iter()
            .map(|field| Self::wrap_cell_content(&record.get(field).display()))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content);
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn close_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.uidata.show_popup = false;
        self.uidata.last_update = Instant::now();
    }

    fn clear_filter(&mut self) {
        if self.filter.is_active() {
            self.filter = FilterState::default();
            self.refilter(true);
            self.set_status_message("Filter cleared");
        }
    }

    // -------------------- command line input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?}");
        if mode == CMDMode::FilterInColumn && self.selected_field().is_none() {
            self.set_status_message("No column selected");
            return;
        }
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        self.last_input = self.input.get();
        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.active_cmdinput = true;
        self.uidata.last_update = Instant::now();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        }
        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.last_update = Instant::now();
    }

    fn handle_cmd_input(&mut self) {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.uidata.active_cmdinput = false;

        let cmd_input = self.last_input.input.clone();
        let canceled = self.last_input.canceled;
        let mode = self.cmd_mode.take();
        if canceled {
            return;
        }
        match mode {
            Some(CMDMode::FilterAll) => {
                self.filter = FilterState::across_all(&cmd_input);
                self.refilter(true);
                self.set_status_message(format!("{} matches", self.filtered.len()));
            }
            Some(CMDMode::FilterInColumn) => {
                let Some(field) = self.selected_field().map(str::to_string) else {
                    return;
                };
                match FilterState::scoped(&cmd_input, &field, &self.catalog) {
                    Ok(filter) => {
                        self.filter = filter;
                        self.refilter(true);
                        self.set_status_message(format!("{} matches", self.filtered.len()));
                    }
                    Err(e) => self.set_status_message(format!("{e:?}")),
                }
            }
            Some(CMDMode::GotoPage) => match cmd_input.trim().parse::<usize>() {
                Ok(page) => {
                    let moved = self.pager.set_page(page, self.filtered.len());
                    if moved {
                        self.cursor_row = 0;
                    } else if page != self.pager.current() {
                        self.set_status_message(format!("Page {page} out of range"));
                    }
                    self.rebuild();
                }
                Err(_) => self.set_status_message(format!("Not a page number: {cmd_input}")),
            },
            None => {
                info!("Cmd input without mode: {cmd_input}");
            }
        }
    }
}
