//! Delimited-text decoding for the spreadsheet feed, on top of the `csv`
//! crate.
//!
//! Records may have uneven widths; the normalizer decides what to do with
//! short rows. Blank and whitespace-only lines are skipped. Malformed input
//! never fails: an unterminated quote runs to end of input.

/// One decoded record: fields in column order.
pub type RawRow = Vec<String>;

/// Lazy row iterator over delimited text.
pub struct Decoder<'a> {
    records: csv::StringRecordsIntoIter<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        // A UTF-8 BOM from spreadsheet exports would otherwise stick to the
        // first header name.
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        Self {
            records: reader.into_records(),
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    if record.len() == 1 && record[0].trim().is_empty() {
                        continue;
                    }
                    return Some(record.iter().map(str::to_owned).collect());
                }
                Err(e) => tracing::warn!(error = %e, "skipping undecodable feed record"),
            }
        }
    }
}
