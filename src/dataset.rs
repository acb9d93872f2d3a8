pub type Row = Vec<String>;

/// Parsed tab separated text. Row 0 is the header, every other row is a record.
///
/// Rows whose cell count differs from the header are kept as they are.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    /// Tab and newline are the only structural characters. No quoting, no
    /// escaping and no type coercion.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }

        let rows = text
            .split('\n')
            .map(|line| line.split('\t').map(|cell| cell.trim().to_string()).collect())
            .collect();
        Self { rows }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    pub fn records(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn record(&self, idx: usize) -> Option<&Row> {
        self.records().get(idx)
    }

    /// Number of header cells, 0 for an empty dataset.
    pub fn width(&self) -> usize {
        self.header().map_or(0, |h| h.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Record indices whose cell count differs from the header.
    pub fn malformed_rows(&self) -> Vec<usize> {
        let width = self.width();
        self.records()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.len() != width)
            .map(|(idx, _)| idx)
            .collect()
    }
}
