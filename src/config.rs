//! Engine configuration.

/// Runtime knobs for a solve. The solver itself is deterministic; the only
/// knob is how chatty it is on stderr.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Diagnostics verbosity: 0 silent, 1 decisions, 2 checks, 3 debug.
    pub verbosity: u8,
}

impl EngineConfig {
    /// Read configuration from the environment. The binary has no command
    /// line of its own (the wire protocol owns stdin), so verbosity comes
    /// from `CADENCE_VERBOSITY`. Unset or unparsable values mean silent.
    pub fn from_env() -> Self {
        let verbosity = std::env::var("CADENCE_VERBOSITY")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        Self { verbosity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_silent() {
        assert_eq!(EngineConfig::default().verbosity, 0);
    }
}
