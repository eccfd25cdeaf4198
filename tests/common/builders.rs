//! Test data builders for creating test objects

use scope_engine::config::{ScopeParameters, TriggerSettings};
use scope_engine::types::{Channel, TriggerEdge};

/// Builder for creating test ScopeParameters
pub struct ParamsBuilder {
    params: ScopeParameters,
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: ScopeParameters::default(),
        }
    }

    pub fn tdiv(mut self, tdiv: f64) -> Self {
        self.params.tdiv = tdiv;
        self
    }

    pub fn ydiv(mut self, y1div: f64, y2div: f64) -> Self {
        self.params.y1div = y1div;
        self.params.y2div = y2div;
        self
    }

    pub fn rising(mut self, channel: Channel, level: f64) -> Self {
        self.params.trigger = TriggerSettings {
            channel,
            edge: TriggerEdge::Rising,
            level,
        };
        self
    }

    pub fn falling(mut self, channel: Channel, level: f64) -> Self {
        self.params.trigger = TriggerSettings {
            channel,
            edge: TriggerEdge::Falling,
            level,
        };
        self
    }

    pub fn calibration(mut self, y1_vps: f64, y2_vps: f64) -> Self {
        self.params.y1_vps = y1_vps;
        self.params.y2_vps = y2_vps;
        self
    }

    pub fn navg(mut self, navg: u32) -> Self {
        self.params.navg = navg;
        self
    }

    pub fn build(self) -> ScopeParameters {
        self.params
    }
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let params = ParamsBuilder::new()
            .tdiv(1e-3)
            .falling(Channel::Two, -1500.0)
            .calibration(2e-4, 1.0)
            .navg(8)
            .build();

        assert_eq!(params.tdiv, 1e-3);
        assert_eq!(params.trigger.channel, Channel::Two);
        assert_eq!(params.trigger.edge, TriggerEdge::Falling);
        assert_eq!(params.y1_vps, 2e-4);
        assert_eq!(params.navg, 8);
        assert!(params.validate().is_ok());
    }
}
