use std::cmp::Ordering;
use std::collections::HashMap;

use feruca::Collator;

use crate::dataset::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

/// Last applied direction per column plus the column currently sorted by.
///
/// Directions are remembered per column: switching to another column and
/// back continues toggling from where that column left off.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SortSpec {
    directions: HashMap<usize, Direction>,
    active: Option<usize>,
}

impl SortSpec {
    /// Activates `column` and flips its direction. A column clicked for the
    /// first time starts ascending.
    pub fn toggle(&mut self, column: usize) -> Direction {
        let direction = self
            .directions
            .get(&column)
            .map_or(Direction::Ascending, |d| d.toggled());
        self.directions.insert(column, direction);
        self.active = Some(column);
        direction
    }

    pub fn active(&self) -> Option<(usize, Direction)> {
        let column = self.active?;
        self.directions.get(&column).map(|&d| (column, d))
    }

    pub fn direction(&self, column: usize) -> Option<Direction> {
        self.directions.get(&column).copied()
    }
}

/// Reorders `selection` (record indices of `dataset`) by the active column of `spec`.
///
/// A missing cell in a short row compares as the empty string.
pub fn sort(dataset: &Dataset, selection: Vec<usize>, spec: &SortSpec) -> Vec<usize> {
    let Some((column, direction)) = spec.active() else {
        return selection;
    };

    // Numeric prefixes are parsed once per row, not once per comparison
    let mut keyed: Vec<(usize, SortKey)> = selection
        .into_iter()
        .map(|idx| (idx, SortKey::new(cell_at(dataset, idx, column))))
        .collect();

    let mut collator = Collator::default();
    match direction {
        Direction::Ascending => stable_sort_by(&mut keyed, |(_, a), (_, b)| {
            a.compare(b, &mut collator)
        }),
        Direction::Descending => stable_sort_by(&mut keyed, |(_, a), (_, b)| {
            b.compare(a, &mut collator)
        }),
    }
    keyed.into_iter().map(|(idx, _)| idx).collect()
}

fn cell_at(dataset: &Dataset, idx: usize, column: usize) -> &str {
    dataset
        .record(idx)
        .and_then(|r| r.get(column))
        .map_or("", String::as_str)
}

#[derive(Debug, Clone, Copy)]
struct SortKey<'a> {
    text: &'a str,
    number: Option<f64>,
}

impl<'a> SortKey<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            number: parse_leading_float(text),
        }
    }

    fn compare(&self, other: &Self, collator: &mut Collator) -> Ordering {
        match (self.number, other.number) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => collator.collate(self.text, other.text),
        }
    }
}

/// Numeric when both cells start with a number, otherwise Unicode collation
/// with the root locale.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    SortKey::new(a).compare(&SortKey::new(b), &mut Collator::default())
}

/// Parses the longest numeric prefix of `cell`: `" 12.5kg"` is 12.5, `"kg"` is None.
pub fn parse_leading_float(cell: &str) -> Option<f64> {
    let s = cell.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

// Bottom-up merge sort. The cell comparator mixes numeric and lexical
// ordering and is not a total order, which std's sort is allowed to panic on.
fn stable_sort_by<T: Copy>(items: &mut Vec<T>, mut cmp: impl FnMut(&T, &T) -> Ordering) {
    let len = items.len();
    if len < 2 {
        return;
    }

    let mut buf = items.clone();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j) = (start, mid);
            for slot in buf[start..end].iter_mut() {
                // Take from the right run only when strictly smaller, keeps ties in input order
                if j < end && (i >= mid || cmp(&items[j], &items[i]) == Ordering::Less) {
                    *slot = items[j];
                    j += 1;
                } else {
                    *slot = items[i];
                    i += 1;
                }
            }
            start = end;
        }
        std::mem::swap(items, &mut buf);
        width *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(ds: &Dataset, order: &[usize], col: usize) -> Vec<String> {
        order
            .iter()
            .map(|&i| ds.record(i).unwrap()[col].clone())
            .collect()
    }

    fn single_column(values: &[&str]) -> Dataset {
        let mut text = String::from("v");
        for v in values {
            text.push('\n');
            text.push_str(v);
        }
        Dataset::parse(&text)
    }

    fn spec_for(column: usize, direction: Direction) -> SortSpec {
        let mut spec = SortSpec::default();
        spec.toggle(column);
        if direction == Direction::Descending {
            spec.toggle(column);
        }
        spec
    }

    #[test]
    fn toggle_starts_ascending_and_flips() {
        let mut spec = SortSpec::default();
        assert_eq!(spec.active(), None);
        assert_eq!(spec.toggle(1), Direction::Ascending);
        assert_eq!(spec.toggle(1), Direction::Descending);
        assert_eq!(spec.toggle(1), Direction::Ascending);
        assert_eq!(spec.active(), Some((1, Direction::Ascending)));
    }

    #[test]
    fn other_columns_keep_their_direction() {
        let mut spec = SortSpec::default();
        spec.toggle(0);
        spec.toggle(0);
        assert_eq!(spec.toggle(2), Direction::Ascending);
        assert_eq!(spec.active(), Some((2, Direction::Ascending)));
        assert_eq!(spec.direction(0), Some(Direction::Descending));
        // Returning to column 0 continues from its stored direction
        assert_eq!(spec.toggle(0), Direction::Ascending);
        assert_eq!(spec.direction(2), Some(Direction::Ascending));
    }

    #[test]
    fn numeric_aware_ascending() {
        let ds = single_column(&["10", "2", "abc"]);
        let order = sort(&ds, vec![0, 1, 2], &spec_for(0, Direction::Ascending));
        assert_eq!(column(&ds, &order, 0), vec!["2", "10", "abc"]);
    }

    #[test]
    fn descending_uses_reversed_comparator() {
        let ds = single_column(&["10", "2", "abc"]);
        let order = sort(&ds, vec![0, 1, 2], &spec_for(0, Direction::Descending));
        assert_eq!(column(&ds, &order, 0), vec!["abc", "10", "2"]);
    }

    #[test]
    fn ties_keep_input_order_in_both_directions() {
        let ds = Dataset::parse("k\tid\nb\t1\na\t2\nb\t3\na\t4");
        let asc = sort(&ds, vec![0, 1, 2, 3], &spec_for(0, Direction::Ascending));
        assert_eq!(column(&ds, &asc, 1), vec!["2", "4", "1", "3"]);
        let desc = sort(&ds, vec![0, 1, 2, 3], &spec_for(0, Direction::Descending));
        assert_eq!(column(&ds, &desc, 1), vec!["1", "3", "2", "4"]);
    }

    #[test]
    fn swapping_direction_swaps_distinct_pairs() {
        let ds = single_column(&["7", "x", "-1", "B", "0.5", "a", "7"]);
        let all: Vec<usize> = (0..ds.records().len()).collect();
        let asc = sort(&ds, all.clone(), &spec_for(0, Direction::Ascending));
        let desc = sort(&ds, all, &spec_for(0, Direction::Descending));
        let pos = |order: &[usize], idx: usize| order.iter().position(|&i| i == idx).unwrap();
        for a in 0..ds.records().len() {
            for b in 0..ds.records().len() {
                let ca = &ds.record(a).unwrap()[0];
                let cb = &ds.record(b).unwrap()[0];
                if compare_cells(ca, cb) == Ordering::Less {
                    assert!(pos(&asc, a) < pos(&asc, b));
                    assert!(pos(&desc, a) > pos(&desc, b));
                }
            }
        }
    }

    #[test]
    fn no_active_column_is_identity() {
        let ds = single_column(&["3", "1", "2"]);
        let order = sort(&ds, vec![0, 1, 2], &SortSpec::default());
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn sorts_only_the_given_selection() {
        let ds = single_column(&["3", "1", "2", "0"]);
        let order = sort(&ds, vec![2, 0, 1], &spec_for(0, Direction::Ascending));
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn inconsistent_comparator_keeps_every_row() {
        // 9 < 10 numerically, "10" < "5x" < "9" lexically
        let values: Vec<&str> = ["9", "10", "5x", "1a", "abc", "", "-2"]
            .iter()
            .cycle()
            .take(200)
            .copied()
            .collect();
        let ds = single_column(&values);
        let all: Vec<usize> = (0..values.len()).collect();
        for direction in [Direction::Ascending, Direction::Descending] {
            let mut order = sort(&ds, all.clone(), &spec_for(0, direction));
            order.sort_unstable();
            assert_eq!(order, all);
        }
    }

    #[test]
    fn missing_cells_compare_as_empty() {
        let ds = Dataset::parse("a\tb\nx\tb2\ny\nz\tb1");
        let order = sort(&ds, vec![0, 1, 2], &spec_for(1, Direction::Ascending));
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn leading_float_prefix() {
        assert_eq!(parse_leading_float("30"), Some(30.0));
        assert_eq!(parse_leading_float("  -1.5e3kg"), Some(-1500.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("+4."), Some(4.0));
        assert_eq!(parse_leading_float("1e"), Some(1.0));
        assert_eq!(parse_leading_float("2E+x"), Some(2.0));
        assert_eq!(parse_leading_float("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float(""), None);
        assert_eq!(parse_leading_float("NaN"), None);
    }

    #[test]
    fn text_comparison_ignores_case_first() {
        assert_eq!(compare_cells("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_cells("a", "A"), Ordering::Less);
        assert_eq!(compare_cells("same", "same"), Ordering::Equal);
        assert_eq!(compare_cells("-3", "2.5"), Ordering::Less);
        assert_eq!(compare_cells("10", "9"), Ordering::Greater);
    }

    #[test]
    fn accented_text_sorts_with_its_base_letter() {
        let ds = single_column(&["Zoe", "Émile", "Anna", "Fritz"]);
        let order = sort(&ds, vec![0, 1, 2, 3], &spec_for(0, Direction::Ascending));
        assert_eq!(column(&ds, &order, 0), vec!["Anna", "Émile", "Fritz", "Zoe"]);
        let order = sort(&ds, vec![0, 1, 2, 3], &spec_for(0, Direction::Descending));
        assert_eq!(column(&ds, &order, 0), vec!["Zoe", "Fritz", "Émile", "Anna"]);
    }

    #[test]
    fn collation_beyond_ascii() {
        assert_eq!(compare_cells("é", "f"), Ordering::Less);
        assert_eq!(compare_cells("e", "é"), Ordering::Less);
        assert_eq!(compare_cells("~", "a"), Ordering::Less);
        assert_eq!(compare_cells("Øresund", "Paris"), Ordering::Less);
    }
}
