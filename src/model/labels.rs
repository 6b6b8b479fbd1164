/// Split a free-text labels field on commas.
///
/// `"bug,ui"` gives two labels, `"bug"` one, `""` none. Pieces are trimmed,
/// empty pieces and repeats are dropped, first occurrence order is kept.
/// Commas inside a label name cannot be escaped.
pub fn parse_labels(value: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for piece in value.split(',') {
        let piece = piece.trim();
        if piece.is_empty() || labels.iter().any(|l| l == piece) {
            continue;
        }
        labels.push(piece.to_string());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_values_split() {
        assert_eq!(parse_labels("bug,ui"), ["bug", "ui"]);
    }

    #[test]
    fn single_value_is_one_label() {
        assert_eq!(parse_labels("bug"), ["bug"]);
    }

    #[test]
    fn empty_value_is_no_labels() {
        assert!(parse_labels("").is_empty());
    }

    #[test]
    fn whitespace_and_repeats() {
        assert_eq!(parse_labels(" bug , urgent,bug,"), ["bug", "urgent"]);
    }

    #[test]
    fn multi_word_labels_survive() {
        assert_eq!(parse_labels("help wanted,good first issue"), ["help wanted", "good first issue"]);
    }
}
