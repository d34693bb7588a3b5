/// Twips are the base coordinate unit of the container format (1/20 px).
pub const TWIPS_PER_PIXEL: f64 = 20.0;

pub fn twips_to_px(twips: i32) -> f64 {
    twips as f64 / TWIPS_PER_PIXEL
}

pub fn px_to_twips(px: f64) -> i32 {
    (px * TWIPS_PER_PIXEL) as i32
}

/// Case-insensitive compare for variable/label lookups.
/// The legacy script language is case-insensitive up to container version 6.
pub fn name_eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twips_round_trip() {
        assert_eq!(px_to_twips(twips_to_px(400)), 400);
        assert_eq!(twips_to_px(20), 1.0);
    }

    #[test]
    fn test_name_eq() {
        assert!(name_eq("GoTo", "goto", false));
        assert!(!name_eq("GoTo", "goto", true));
    }
}
