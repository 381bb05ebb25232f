//! Error handling foundation for the social-login crates.
//!
//! Only the `Result` alias lives here. Each crate owns its domain error
//! enums and wraps them in a rootcause `Report` at layer boundaries.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_carries_value() {
        let ok: Result<&str> = Ok("idn");
        assert_eq!(ok.expect("should be ok"), "idn");
    }
}
