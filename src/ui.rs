use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::Line,
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Widget},
};

use crate::domain::{CMDMode, CvaConfig};
use crate::model::UIData;

pub const CMDLINE_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;

pub struct TableUI {
    _config: CvaConfig,
}

impl TableUI {
    pub fn new(config: &CvaConfig) -> Self {
        Self {
            _config: config.clone(),
        }
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let [table_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(STATUSLINE_HEIGHT),
            Constraint::Length(CMDLINE_HEIGHT),
        ])
        .areas(frame.area());

        if let Some(error) = &uidata.error {
            self.draw_error(error, table_area, frame);
        } else {
            self.draw_table(uidata, table_area, frame);
        }
        self.draw_statusline(uidata, status_area, frame);
        self.draw_cmdline(uidata, cmd_area, frame);

        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_table(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let title = Line::from(format!(" {} ", uidata.title).bold());
        let pages = Line::from(format!(
            " Pagina {}/{} ({} registros) ",
            uidata.page, uidata.total_pages, uidata.nrows
        ));
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(pages.centered())
            .border_set(border::THICK);

        if uidata.loading && uidata.columns.iter().all(|c| c.data.is_empty()) {
            Paragraph::new("Cargando ...")
                .centered()
                .block(block)
                .render(area, frame.buffer_mut());
            return;
        }

        let header = Row::new(
            uidata
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let style = if i == uidata.cursor_column {
                        Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                    } else {
                        Style::default().add_modifier(Modifier::BOLD)
                    };
                    Cell::from(c.name.clone()).style(style)
                })
                .collect::<Vec<Cell>>(),
        );

        let nrows = uidata.columns.iter().map(|c| c.data.len()).max().unwrap_or(0);
        let rows: Vec<Row> = if let Some(placeholder) = &uidata.placeholder {
            // One full-width row instead of per-field cells.
            vec![Row::new(vec![Cell::from(placeholder.clone())])]
        } else {
            (0..nrows)
                .map(|r| {
                    Row::new(
                        uidata
                            .columns
                            .iter()
                            .map(|c| Cell::from(c.data.get(r).cloned().unwrap_or_default()))
                            .collect::<Vec<Cell>>(),
                    )
                })
                .collect()
        };

        let widths: Vec<Constraint> = uidata
            .columns
            .iter()
            .map(|c| Constraint::Length(c.width as u16 + 1))
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().bg(Color::DarkGray));

        let mut state = TableState::default();
        if uidata.placeholder.is_none() && nrows > 0 {
            state.select(Some(uidata.cursor_row));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_error(&self, error: &str, area: Rect, frame: &mut Frame) {
        let block = Block::bordered()
            .title(Line::from(" Error ".bold().red()).centered())
            .border_set(border::THICK)
            .border_style(Style::default().fg(Color::Red));
        Paragraph::new(error.to_string())
            .centered()
            .block(block)
            .render(area, frame.buffer_mut());
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let mut parts: Vec<String> = Vec::new();
        if uidata.loading {
            parts.push("[cargando]".to_string());
        }
        if !uidata.filter_echo.is_empty() {
            parts.push(format!("filtro: {}", uidata.filter_echo));
        }
        parts.push(uidata.status_message.clone());
        Paragraph::new(parts.join("  "))
            .style(Style::default().fg(Color::Yellow))
            .render(area, frame.buffer_mut());
    }

    fn draw_cmdline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if !uidata.active_cmdinput {
            Paragraph::new(" ? for help").dim().render(area, frame.buffer_mut());
            return;
        }
        let prompt = match uidata.cmd_mode {
            Some(CMDMode::FilterAll) => "/",
            Some(CMDMode::FilterInColumn) => "f:",
            Some(CMDMode::GotoPage) => ":",
            None => ">",
        };
        Paragraph::new(format!("{prompt}{}", uidata.cmdinput.input))
            .render(area, frame.buffer_mut());
        let cursor_x = area.x + prompt.len() as u16 + uidata.cmdinput.cursor as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let area = frame.area();
        let width = (area.width * 3 / 4).max(20).min(area.width);
        let height = (message.lines().count() as u16 + 2).min(area.height);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        };
        frame.render_widget(Clear, popup);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::THICK);
        Paragraph::new(message.to_string())
            .block(block)
            .render(popup, frame.buffer_mut());
    }
}
