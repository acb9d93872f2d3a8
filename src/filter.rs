use rayon::prelude::*;

use crate::dataset::{Dataset, Row};

// Below this many records a sequential scan is faster than spreading work over the pool.
const PARALLEL_THRESHOLD: usize = 4096;

/// A trimmed, lower-cased search term. Empty means no filter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(raw: &str) -> Self {
        Query(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substring match against any cell the row has.
    pub fn matches(&self, row: &Row) -> bool {
        self.is_empty() || row.iter().any(|cell| cell.to_lowercase().contains(&self.0))
    }
}

/// Record indices of `dataset` matching `query`, in dataset order.
///
/// The header is never part of the selection, so it is always retained.
pub fn filter(dataset: &Dataset, query: &Query) -> Vec<usize> {
    let records = dataset.records();
    if query.is_empty() {
        return (0..records.len()).collect();
    }

    if records.len() < PARALLEL_THRESHOLD {
        records
            .iter()
            .enumerate()
            .filter(|(_, row)| query.matches(row))
            .map(|(idx, _)| idx)
            .collect()
    } else {
        records
            .par_iter()
            .enumerate()
            .filter(|(_, row)| query.matches(row))
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Dataset {
        Dataset::parse("Name\tCity\nAlice\tBerlin\nBob\tVienna\nCarol\tbern\nDave\tOslo")
    }

    #[test]
    fn query_is_normalized() {
        assert_eq!(Query::new("  BoB ").as_str(), "bob");
        assert!(Query::new(" \t ").is_empty());
    }

    #[test]
    fn empty_query_is_identity() {
        let ds = people();
        assert_eq!(filter(&ds, &Query::new("")), vec![0, 1, 2, 3]);
    }

    #[test]
    fn case_insensitive_substring_on_any_cell() {
        let ds = people();
        assert_eq!(filter(&ds, &Query::new("BER")), vec![0, 2]);
        assert_eq!(filter(&ds, &Query::new("o")), vec![1, 2, 3]);
        assert_eq!(filter(&ds, &Query::new("zzz")), Vec::<usize>::new());
    }

    #[test]
    fn header_never_filtered_out() {
        let ds = people();
        // "name" only appears in the header, the selection is empty but the header stays
        assert!(filter(&ds, &Query::new("name")).is_empty());
        assert_eq!(ds.header().map(|h| h.len()), Some(2));
    }

    #[test]
    fn every_kept_row_matches_and_every_dropped_row_does_not() {
        let ds = people();
        let q = Query::new("e");
        let kept = filter(&ds, &q);
        for (idx, row) in ds.records().iter().enumerate() {
            let hit = row.iter().any(|c| c.to_lowercase().contains("e"));
            assert_eq!(kept.contains(&idx), hit, "row {idx}");
        }
    }

    #[test]
    fn zero_rows_ignores_query() {
        let ds = Dataset::parse("");
        assert!(filter(&ds, &Query::new("x")).is_empty());
        assert!(filter(&ds, &Query::new("")).is_empty());
    }

    #[test]
    fn short_rows_only_check_existing_cells() {
        let ds = Dataset::parse("a\tb\nfoo\nbar\tfoo");
        assert_eq!(filter(&ds, &Query::new("foo")), vec![0, 1]);
    }

    #[test]
    fn parallel_scan_keeps_order() {
        let mut text = String::from("id\tvalue");
        for i in 0..(PARALLEL_THRESHOLD * 2) {
            let value = if i % 3 == 0 { "hit" } else { "miss" };
            text.push_str(&format!("\n{i}\t{value}"));
        }
        let ds = Dataset::parse(&text);
        let kept = filter(&ds, &Query::new("HIT"));
        let expected: Vec<usize> = (0..PARALLEL_THRESHOLD * 2).filter(|i| i % 3 == 0).collect();
        assert_eq!(kept, expected);
    }
}
