//! Breakout and delivery tuning

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct BreakoutConfig {
    /// Outbound message buffer per connection
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Cap on rooms per breakout, applied on top of `ceil(live / 2)`
    pub max_rooms: Option<usize>,

    /// Fixed RNG seed for reproducible room composition
    pub shuffle_seed: Option<u64>,
}

impl BreakoutConfig {
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 || self.channel_capacity > 65_536 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        if self.max_rooms == Some(0) {
            return Err(ValidationError::InvalidMaxRooms);
        }
        if self.shuffle_seed.is_some() && *environment == Environment::Production {
            return Err(ValidationError::SeedInProduction);
        }
        Ok(())
    }
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_rooms: None,
            shuffle_seed: None,
        }
    }
}

fn default_channel_capacity() -> usize {
    128
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BreakoutConfig::default();
        assert_eq!(config.channel_capacity, 128);
        assert!(config.validate(&Environment::Production).is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = BreakoutConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidChannelCapacity)
        );
    }

    #[test]
    fn zero_max_rooms_is_rejected() {
        let config = BreakoutConfig {
            max_rooms: Some(0),
            ..Default::default()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidMaxRooms)
        );
    }

    #[test]
    fn seed_only_outside_production() {
        let config = BreakoutConfig {
            shuffle_seed: Some(7),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Staging).is_ok());
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::SeedInProduction)
        );
    }
}
