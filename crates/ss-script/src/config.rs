/// Configuration for the script interpreter.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Logic-significant statements one instance may evaluate per tick.
    pub token_budget: usize,
    /// Maximum length of a parent chain of entity/item calls.
    pub max_call_depth: usize,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            token_budget: 10,
            max_call_depth: 64,
            max_events: 0,
        }
    }
}

impl SimConfig {
    /// Set the per-tick token budget.
    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    /// Set the maximum call chain length.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.token_budget, 10);
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.max_events, 0);
    }

    #[test]
    fn config_builder_chain() {
        let config = SimConfig::default()
            .with_token_budget(3)
            .with_max_call_depth(4)
            .with_max_events(500);
        assert_eq!(config.token_budget, 3);
        assert_eq!(config.max_call_depth, 4);
        assert_eq!(config.max_events, 500);
    }
}
