//! Helpers shared by the report parsers for slicing command output into lines,
//! tokens and columns.

/// Returns the non-blank lines of `text` together with their 1-based line numbers
pub fn lines(text: &str) -> impl Iterator<Item = (u64, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx as u64 + 1, line))
}

/// Separator lines, e.g. `----------- ---------`, as printed below sreport headers
pub fn is_separator(line: &str) -> bool {
    line.starts_with('-')
}

/// Returns true if `line` contains any of the given header labels
pub fn is_header(line: &str, labels: &[&str]) -> bool {
    labels.iter().any(|label| line.contains(label))
}

/// Splits a line on runs of whitespace
pub fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Returns the trimmed text found between the character offsets `start` and `end`
/// (or the end of the line if `end` is `None`). Offsets past the end of the line
/// result in an empty string, mirroring sreport's padding of short lines.
pub fn column(line: &str, start: usize, end: Option<usize>) -> &str {
    let offset = |n: usize| {
        line.char_indices()
            .nth(n)
            .map(|(idx, _)| idx)
            .unwrap_or(line.len())
    };

    let from = offset(start);
    let to = end.map(offset).unwrap_or(line.len());
    if from >= to {
        ""
    } else {
        line[from..to].trim()
    }
}

/// Creates a reader for the '|' delimited, header-less output of `squeue` and `sinfo`
pub fn pipe_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        // Field counts are validated by the individual parsers
        .flexible(true)
        // Job names may contain quotes
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}
