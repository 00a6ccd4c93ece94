/// Counts the number of distinct values, e.g. users owning a set of jobs
pub fn unique_values<'a, I>(iter: I) -> usize
where
    I: std::iter::Iterator<Item = &'a String>,
{
    let mut values = iter.collect::<Vec<_>>();
    values.sort_unstable();
    values.dedup();
    values.len()
}

/// Converts an iterator of format specifiers, e.g. `["i", "u"]`, to a `--format`
/// argument for `squeue` and `sinfo` (`%i|%u`)
pub fn format_string<'a, I, S>(iter: I) -> String
where
    I: Iterator<Item = &'a S>,
    S: ?Sized + AsRef<str> + 'a,
{
    iter.map(|v| format!("%{}", v.as_ref()))
        .collect::<Vec<_>>()
        // Join fields by a character that does not normally appear in values
        .join("|")
}

/// Rounds a value to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
