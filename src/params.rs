use crate::error::ChatError;

pub const MAX_TOKENS_RANGE: (u32, u32) = (1, 32768);
pub const TEMPERATURE_RANGE: (f32, f32) = (0.1, 4.0);
pub const TOP_P_RANGE: (f32, f32) = (0.1, 1.0);

/// Sampling parameters for one request. Only constructible through `new`,
/// so a held config is always in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationConfig {
    pub fn new(max_tokens: u32, temperature: f32, top_p: f32) -> Result<Self, ChatError> {
        if !(MAX_TOKENS_RANGE.0..=MAX_TOKENS_RANGE.1).contains(&max_tokens) {
            return Err(ChatError::invalid(
                "max_tokens",
                f64::from(max_tokens),
                f64::from(MAX_TOKENS_RANGE.0),
                f64::from(MAX_TOKENS_RANGE.1),
            ));
        }
        if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&temperature) {
            return Err(ChatError::invalid(
                "temperature",
                f64::from(temperature),
                f64::from(TEMPERATURE_RANGE.0),
                f64::from(TEMPERATURE_RANGE.1),
            ));
        }
        if !(TOP_P_RANGE.0..=TOP_P_RANGE.1).contains(&top_p) {
            return Err(ChatError::invalid(
                "top_p",
                f64::from(top_p),
                f64::from(TOP_P_RANGE.0),
                f64::from(TOP_P_RANGE.1),
            ));
        }
        Ok(GenerationConfig {
            max_tokens,
            temperature,
            top_p,
        })
    }

    /// Slider defaults from the hosted demo this client talks to.
    pub fn from_env() -> Result<Self, ChatError> {
        let max_tokens = env_or("ZEPHYR_MAX_TOKENS", 17012u32)?;
        let temperature = env_or("ZEPHYR_TEMPERATURE", 0.7f32)?;
        let top_p = env_or("ZEPHYR_TOP_P", 0.95f32)?;
        Self::new(max_tokens, temperature, top_p)
    }
}

/// An unset variable falls back to the default; a set but unparseable one is
/// an error, not a silent fallback.
fn env_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ChatError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ChatError::InvalidOverride { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_range_triple() {
        let config = GenerationConfig::new(17012, 0.7, 0.95).unwrap();
        assert_eq!(config.max_tokens, 17012);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 0.95);
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(GenerationConfig::new(1, 0.1, 0.1).is_ok());
        assert!(GenerationConfig::new(32768, 4.0, 1.0).is_ok());
    }

    #[test]
    fn rejects_max_tokens_out_of_range() {
        for bad in [0u32, 32769, 100_000] {
            match GenerationConfig::new(bad, 0.7, 0.95) {
                Err(ChatError::InvalidParameter { name, .. }) => assert_eq!(name, "max_tokens"),
                other => panic!("expected InvalidParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        for bad in [0.0f32, 0.05, 4.1, -1.0] {
            match GenerationConfig::new(2048, bad, 0.95) {
                Err(ChatError::InvalidParameter { name, .. }) => assert_eq!(name, "temperature"),
                other => panic!("expected InvalidParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_top_p_out_of_range() {
        for bad in [0.0f32, 0.05, 1.01, 2.0] {
            match GenerationConfig::new(2048, 0.7, bad) {
                Err(ChatError::InvalidParameter { name, .. }) => assert_eq!(name, "top_p"),
                other => panic!("expected InvalidParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn unparseable_env_override_is_an_error() {
        std::env::set_var("ZEPHYR_TEMPERATURE", "abc");
        let result = GenerationConfig::from_env();
        std::env::remove_var("ZEPHYR_TEMPERATURE");
        match result {
            Err(ChatError::InvalidOverride { key, value }) => {
                assert_eq!(key, "ZEPHYR_TEMPERATURE");
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidOverride, got {other:?}"),
        }
    }

    #[test]
    fn error_message_names_the_bounds() {
        let err = GenerationConfig::new(0, 0.7, 0.95).unwrap_err();
        assert_eq!(err.to_string(), "max_tokens must be between 1 and 32768, got 0");
    }
}
