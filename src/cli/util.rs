use super::runner::OutputMode;

/// `data` for the first input, then `data2`, `data3`, ...
#[must_use]
pub fn default_table_name(index: usize) -> String {
    if index == 0 { "data".to_string() } else { format!("data{}", index + 1) }
}

/// Flatten repeated, comma-separated flag values; blanks are dropped.
#[must_use]
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[must_use]
pub fn parse_output_mode(s: Option<&str>) -> OutputMode {
    match s.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => OutputMode::Json,
        Some("plain") => OutputMode::Plain,
        _ => OutputMode::Human,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_defaults() {
        assert_eq!(default_table_name(0), "data");
        assert_eq!(default_table_name(1), "data2");
        assert_eq!(default_table_name(4), "data5");
    }

    #[test]
    fn lists_split_on_commas() {
        let v = vec!["a.csv, b.csv".to_string(), "c.csv".to_string(), " , ".to_string()];
        assert_eq!(split_list(&v), vec!["a.csv", "b.csv", "c.csv"]);
    }

    #[test]
    fn output_mode_parsing() {
        assert_eq!(parse_output_mode(Some("JSON")), OutputMode::Json);
        assert_eq!(parse_output_mode(Some("plain")), OutputMode::Plain);
        assert_eq!(parse_output_mode(None), OutputMode::Human);
    }
}
