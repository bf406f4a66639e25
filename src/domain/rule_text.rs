//! Building blocks of the alert rule language evaluated by the alert service.

/// Exchange segment every instrument is quoted on.
pub const EXCHANGE: &str = "NSE";

/// `LastTradedPrice('NSE:SYMBOL')`
pub fn last_traded_price(symbol: &str) -> String {
    format!("LastTradedPrice('{EXCHANGE}:{symbol}')")
}

/// Render a number the way rule text expects it: integral values carry no
/// fractional part and negative zero prints as `0`.
pub fn format_number(value: f64) -> String {
    let value = value + 0.0;
    format!("{value}")
}

/// Normalise a trading symbol as typed on the command line.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ltp_reference() {
        assert_eq!(last_traded_price("INFY"), "LastTradedPrice('NSE:INFY')");
    }

    #[test]
    fn integral_numbers_have_no_fraction() {
        assert_eq!(format_number(12000.0), "12000");
        assert_eq!(format_number(-5.0), "-5");
        assert_eq!(format_number(1520.35), "1520.35");
        assert_eq!(format_number(0.003), "0.003");
    }

    #[test]
    fn negative_zero_prints_plain() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-1.0 * 0.0), "0");
    }

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol(" tatasteel "), "TATASTEEL");
    }
}
