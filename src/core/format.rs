//! Local currency display formatting

/// Unit label appended to rial amounts.
pub const RIAL_UNIT: &str = "ریال";

/// Renders a local-currency amount for display.
pub trait PriceFormatter: Send + Sync {
    fn format(&self, amount: f64) -> String;
}

/// Whole-rial amounts with `,` thousands grouping and a trailing unit label.
#[derive(Debug, Clone)]
pub struct RialFormatter {
    unit: String,
}

impl RialFormatter {
    pub fn new(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
        }
    }
}

impl Default for RialFormatter {
    fn default() -> Self {
        Self::new(RIAL_UNIT)
    }
}

impl PriceFormatter for RialFormatter {
    fn format(&self, amount: f64) -> String {
        format!("{} {}", group_thousands(amount), self.unit)
    }
}

/// Rounds half away from zero and inserts `,` every three digits.
pub fn group_thousands(amount: f64) -> String {
    let rounded = amount.round();
    let mut grouped = String::new();
    if rounded < 0.0 {
        grouped.push('-');
    }
    grouped.push_str(&group_digits(&format!("{:.0}", rounded.abs())));
    grouped
}

/// Like [`group_thousands`] but keeps the fractional digits, so `42075.5`
/// renders as `42,075.5`.
pub fn group_decimal(amount: f64) -> String {
    let plain = amount.abs().to_string();
    let (whole, fraction) = match plain.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::new();
    if amount < 0.0 {
        grouped.push('-');
    }
    grouped.push_str(&group_digits(whole));
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
