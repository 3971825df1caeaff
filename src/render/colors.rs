//! Color tables for the grid chrome.

/// Rotating background palette assigned to distinct group values.
pub const GROUP_PALETTE: &[&str] = &[
    "#cfdffe", "#d0f1fd", "#c2f5e8", "#ffdaf6", "#fee2d5", "#ffeab6", "#d1f7c4", "#ede2fe",
    "#eeeeee",
];

/// Mix a hex color towards white; used for nested group header bands.
pub fn lighten(hex: &str, amount: f64) -> String {
    let Some((r, g, b)) = parse_hex(hex) else {
        return hex.to_string();
    };
    let blend = |c: f64| c + (255.0 - c) * amount.clamp(0.0, 1.0);
    format_hex(blend(r), blend(g), blend(b))
}

fn parse_hex(hex: &str) -> Option<(f64, f64, f64)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(f64::from)
    };
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_hex(r: f64, g: f64, b: f64) -> String {
    format!(
        "#{:02x}{:02x}{:02x}",
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8
    )
}
