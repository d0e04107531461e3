use std::io::Error;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum CvaError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownField(String),
    UnknownDataset(String),
}

impl From<Error> for CvaError {
    fn from(err: Error) -> Self {
        CvaError::IoError(err)
    }
}

impl From<PolarsError> for CvaError {
    fn from(err: PolarsError) -> Self {
        CvaError::PolarsError(err)
    }
}

/// How the pager treats a request for a page outside [1, total_pages].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagePolicy {
    #[default]
    Clamp,
    Reject,
}

#[derive(Debug, Clone)]
pub struct CvaConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    pub page_policy: PagePolicy,
    pub max_column_width: usize,
}

impl Default for CvaConfig {
    fn default() -> Self {
        CvaConfig {
            event_poll_time: 100,
            page_size: 10,
            page_policy: PagePolicy::Clamp,
            max_column_width: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    FilterAll,
    FilterInColumn,
    GotoPage,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageNext,
    PagePrev,
    PageFirst,
    PageLast,
    GotoPage,
    FilterAll,
    FilterInColumn,
    ToggleColumn(usize),
    ToggleAllColumns,
    Refetch,
    MarkPaid,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
 cva key bindings

 q          quit
 Up/Down    move row cursor
 Left/Right select column (filter scope)
 n / N      next / previous page
 g / G      first / last page
 :          go to page number
 /          filter across visible columns
 f          filter in selected column
 1..9       toggle column visibility
 a          toggle all columns
 r          refetch data
 m          mark selected record as paid
 y / Y      copy cell / row to clipboard
 ?          this help
 Esc        close popup / clear filter
";
