use std::fmt;
use std::io::{Error, ErrorKind};
use std::time::Duration;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

use crate::view::LoadTicket;

pub const HELP_TEXT: &str = "\
q        quit
↑ ↓      move row            PgUp PgDn  move page
g G      first / last row    ← →        move column
s        sort current column (toggles ▲ / ▼)
1..9     sort column by number
/        search, Enter keeps the query, Esc clears it
r        reload the source
c        copy cell           y          copy row
?        help                Esc        close popup";

#[derive(Debug)]
pub enum TVError {
    IoError(Error),
    HttpError(reqwest::Error),
    HttpStatus(u16),
    LoadingFailed(String),
    InvalidSource(String),
    FileNotFound,
    PermissionDenied,
}

impl From<Error> for TVError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => TVError::FileNotFound,
            ErrorKind::PermissionDenied => TVError::PermissionDenied,
            _ => TVError::IoError(err),
        }
    }
}

impl From<reqwest::Error> for TVError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TVError::HttpStatus(status.as_u16()),
            None => TVError::HttpError(err),
        }
    }
}

impl fmt::Display for TVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TVError::IoError(e) => write!(f, "io error: {e}"),
            TVError::HttpError(e) => write!(f, "request failed: {e}"),
            TVError::HttpStatus(code) => write!(f, "server answered with HTTP {code}"),
            TVError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            TVError::InvalidSource(src) => write!(f, "invalid source: {src}"),
            TVError::FileNotFound => write!(f, "file not found"),
            TVError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl std::error::Error for TVError {}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub fetch_timeout: Option<Duration>,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 32,
            fetch_timeout: None,
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveLeft,
    MoveRight,
    SortColumn,
    SortColumnIdx(usize),
    Search,
    RawKey(KeyEvent),
    Reload,
    Resize(usize, usize),
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Loaded(LoadTicket, Result<String, TVError>),
}
