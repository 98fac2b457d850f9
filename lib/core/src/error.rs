//! Error handling foundation for pushbox.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enum and wraps it in a rootcause `Report` at its boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_defaults_to_unit_context() {
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.expect("should be ok"), 7);
    }
}
