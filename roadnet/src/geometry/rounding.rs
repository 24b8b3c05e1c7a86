// Coordinates are stored with three decimals, rounded half away from zero on the shortest decimal
// form of the value (so 1.0005 becomes 1.001 even though its binary value sits just below).

pub const DECIMALS: usize = 3;

pub fn round3(v: f64) -> f64 {
    if !v.is_finite() {
        return v;
    }
    if v == 0.0 {
        return 0.0;
    }
    let text = format!("{}", v.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some(parts) => parts,
        None => return v,
    };
    if frac_part.len() <= DECIMALS {
        return v;
    }
    let digits = format!("{}{}", int_part, &frac_part[..DECIMALS]);
    let mut scaled: u64 = match digits.parse() {
        Ok(n) => n,
        Err(_) => return (v * 1000.0).round() / 1000.0,
    };
    if frac_part.as_bytes()[DECIMALS] >= b'5' {
        scaled += 1;
    }
    let r = scaled as f64 / 1000.0;
    if r == 0.0 {
        0.0
    } else if v < 0.0 {
        -r
    } else {
        r
    }
}

/// Text form used in the wire format: always carries a decimal point, like the game writes it.
pub fn format_coord(v: f64) -> String {
    let s = format!("{}", v);
    if !v.is_finite() || s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round3(1.0005), 1.001);
        assert_eq!(round3(2.0004), 2.0);
        assert_eq!(round3(-1.0005), -1.001);
        assert_eq!(round3(0.1 + 0.2), 0.3);
        assert_eq!(round3(123.456), 123.456);
        assert_eq!(round3(-0.0004), 0.0);
        assert_eq!(round3(5.0), 5.0);
    }

    #[test]
    fn test_round_is_idempotent() {
        for v in [1.2345, -87.6545, 1024.9999, 0.0015] {
            let once = round3(v);
            assert_eq!(round3(once), once);
        }
    }

    #[test]
    fn test_format_coord() {
        assert_eq!(format_coord(3.0), "3.0");
        assert_eq!(format_coord(-12.5), "-12.5");
        assert_eq!(format_coord(0.001), "0.001");
    }
}
