use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use crate::dataset::Dataset;
use crate::domain::TVError;
use crate::filter::{Query, filter};
use crate::sort::{Direction, SortSpec, sort};

/// Identifies one load attempt. Only the most recently issued ticket may
/// replace the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loaded,
    Refined,
    Failed,
}

/// Header plus the filtered and sorted records, borrowed from the dataset.
#[derive(Debug)]
pub struct View<'a> {
    header: &'a [String],
    rows: Vec<&'a [String]>,
}

impl<'a> View<'a> {
    pub fn header(&self) -> &'a [String] {
        self.header
    }

    pub fn rows(&self) -> &[&'a [String]] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&'a [String]> {
        self.rows.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No records to show, either nothing loaded or nothing matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header first, then the records. Empty when there is no header.
    #[cfg(test)]
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        if self.header.is_empty() {
            return Vec::new();
        }
        std::iter::once(self.header)
            .chain(self.rows.iter().copied())
            .map(|r| r.to_vec())
            .collect()
    }
}

/// Owns the dataset, the query and the sort spec, and keeps the derived
/// selection in sync with them.
///
/// Every mutation recomputes `sort(filter(dataset, query), sort_spec)` from
/// scratch.
#[derive(Debug, Default)]
pub struct ViewCoordinator {
    dataset: Option<Dataset>,
    query: Query,
    sort_spec: SortSpec,
    selection: Vec<usize>,
    load_error: Option<TVError>,
    last_ticket: u64,
    pending: Option<LoadTicket>,
}

impl ViewCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the dataset and clears the query. The sort spec is kept.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        let malformed = dataset.malformed_rows();
        if !malformed.is_empty() {
            warn!(
                "{} rows do not match the header width of {} (first at record {})",
                malformed.len(),
                dataset.width(),
                malformed[0]
            );
        }
        if dataset.is_empty() {
            info!("Source contained no rows");
        } else {
            info!(
                "Dataset with {} columns and {} records",
                dataset.width(),
                dataset.records().len()
            );
        }

        self.dataset = Some(dataset);
        self.query = Query::default();
        self.load_error = None;
        self.recompute();
    }

    /// Returns false when the normalized query did not change.
    pub fn set_query(&mut self, raw: &str) -> bool {
        let query = Query::new(raw);
        if query == self.query {
            return false;
        }
        trace!("Query {:?} -> {:?}", self.query.as_str(), query.as_str());
        self.query = query;
        self.recompute();
        true
    }

    /// Sorts by `column`, flipping its direction on every call.
    pub fn toggle_sort(&mut self, column: usize) -> Direction {
        let direction = self.sort_spec.toggle(column);
        debug!("Sort column {column} {direction:?}");
        self.recompute();
        direction
    }

    pub fn current_view(&self) -> View<'_> {
        match &self.dataset {
            Some(dataset) => View {
                header: dataset.header().unwrap_or(&[]),
                rows: self
                    .selection
                    .iter()
                    .filter_map(|&idx| dataset.record(idx))
                    .map(|r| r.as_slice())
                    .collect(),
            },
            None => View {
                header: &[],
                rows: Vec::new(),
            },
        }
    }

    pub fn phase(&self) -> Phase {
        if self.load_error.is_some() {
            Phase::Failed
        } else if self.dataset.is_none() {
            Phase::Unloaded
        } else if !self.query.is_empty() || self.sort_spec.active().is_some() {
            Phase::Refined
        } else {
            Phase::Loaded
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort_spec
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn load_error(&self) -> Option<&TVError> {
        self.load_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a new load attempt and supersedes any attempt still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.last_ticket += 1;
        let ticket = LoadTicket(self.last_ticket);
        if let Some(previous) = self.pending.replace(ticket) {
            debug!("Load {previous:?} superseded by {ticket:?}");
        }
        ticket
    }

    /// Applies the outcome of a load. Results of superseded attempts are
    /// dropped and false is returned.
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<String, TVError>) -> bool {
        if self.pending != Some(ticket) {
            debug!("Discarding stale load {ticket:?}, waiting for {:?}", self.pending);
            return false;
        }
        self.pending = None;

        match result {
            Ok(text) => {
                let start_time = Instant::now();
                let dataset = Dataset::parse(&text);
                trace!(
                    "Parsed {} bytes in {}ms",
                    text.len(),
                    start_time.elapsed().as_millis()
                );
                self.set_dataset(dataset);
            }
            Err(e) => {
                error!("Load {ticket:?} failed: {e}");
                self.dataset = None;
                self.selection.clear();
                self.load_error = Some(e);
            }
        }
        true
    }

    fn recompute(&mut self) {
        let Some(dataset) = &self.dataset else {
            self.selection.clear();
            return;
        };

        let start_time = Instant::now();
        let filtered = filter(dataset, &self.query);
        self.selection = sort(dataset, filtered, &self.sort_spec);
        trace!(
            "Recomputed view: {} of {} records in {}ms",
            self.selection.len(),
            dataset.records().len(),
            start_time.elapsed().as_millis()
        );
    }
}
