use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Instant;

use reqwest::blocking::Client;
use tracing::{debug, info, instrument, trace};

use crate::domain::{TVConfig, TVError};
use crate::view::LoadTicket;

pub type LoadResult = (LoadTicket, Result<String, TVError>);

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    /// `http(s)://` locators are fetched over the network, anything else is a
    /// local path with `~` and `$VAR` expanded.
    pub fn parse(raw: &str) -> Result<Self, TVError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TVError::InvalidSource("empty source".to_string()));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Source::Url(raw.to_string()));
        }

        let path = raw.strip_prefix("file://").unwrap_or(raw);
        let expanded =
            shellexpand::full(path).map_err(|e| TVError::InvalidSource(e.to_string()))?;
        Ok(Source::File(PathBuf::from(expanded.as_ref())))
    }

    /// Short name shown in the title bar.
    pub fn name(&self) -> String {
        match self {
            Source::Url(url) => url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(url)
                .to_string(),
            Source::File(path) => path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string(),
        }
    }
}

/// Single attempt, no retry.
#[instrument(skip(config))]
pub fn fetch(source: &Source, config: &TVConfig) -> Result<String, TVError> {
    match source {
        Source::Url(url) => {
            let client = Client::builder().timeout(config.fetch_timeout).build()?;
            fetch_url(&client, url)
        }
        Source::File(path) => {
            if fs::metadata(path)?.is_dir() {
                return Err(TVError::LoadingFailed(format!(
                    "{} is a directory",
                    path.display()
                )));
            }
            // Decoded lossily, like HTTP bodies
            Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
        }
    }
}

fn fetch_url(client: &Client, url: &str) -> Result<String, TVError> {
    trace!("GET {url}");
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.text()?)
}

/// Runs every fetch on its own thread and hands the results back over a
/// channel. A stalled request never holds a rayon worker.
pub struct Loader {
    config: TVConfig,
    sender: Sender<LoadResult>,
    receiver: Receiver<LoadResult>,
}

impl Loader {
    pub fn new(config: &TVConfig) -> Self {
        let (sender, receiver) = channel();
        Self {
            config: config.clone(),
            sender,
            receiver,
        }
    }

    pub fn spawn(&self, source: Source, ticket: LoadTicket) {
        let sender = self.sender.clone();
        let config = self.config.clone();
        debug!("Spawning load {ticket:?} for {source:?}");
        thread::spawn(move || {
            let start_time = Instant::now();
            let result = fetch(&source, &config);
            info!(
                "Load {ticket:?} finished in {}ms, ok: {}",
                start_time.elapsed().as_millis(),
                result.is_ok()
            );
            if sender.send((ticket, result)).is_err() {
                debug!("Load {ticket:?} finished after the receiver was dropped");
            }
        });
    }

    pub fn try_recv(&self) -> Option<LoadResult> {
        self.receiver.try_recv().ok()
    }
}
