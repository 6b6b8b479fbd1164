use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::util::records::parse_records;

const PALETTE_CSV: &str = include_str!("../../etc/color-blind-safe.csv");

// Last resort if the bundled file ever ships empty.
const FALLBACK: &str = "0072b2";

static PALETTE: OnceLock<Vec<String>> = OnceLock::new();

/// The color-blind-safe palette, parsed from the bundled CSV on first use.
pub fn palette() -> &'static [String] {
    PALETTE.get_or_init(|| {
        parse_records(PALETTE_CSV.as_bytes())
            .unwrap_or_default()
            .iter()
            .map(|r| normalize_color(r.get("color")))
            .filter(|c| !c.is_empty())
            .collect()
    })
}

/// Strip whitespace and a leading `#`.
pub fn normalize_color(color: &str) -> String {
    color.trim().trim_start_matches('#').to_string()
}

/// Keep an explicit color, otherwise draw one uniformly from the palette.
pub fn resolve_color<R: Rng + ?Sized>(color: &str, rng: &mut R) -> String {
    let color = normalize_color(color);
    if !color.is_empty() {
        return color;
    }
    palette()
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| FALLBACK.to_string())
}
