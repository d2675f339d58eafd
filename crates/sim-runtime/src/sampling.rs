use crate::config::{ConfigError, SimParams};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use sim_core::{AllocationStrategy, OrderStatus, Priority};
use std::collections::BTreeMap;

/// Weighted draw over a fixed set of values.
#[derive(Clone, Debug)]
pub struct Categorical<T> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Copy> Categorical<T> {
    /// Build from `(value, weight)` pairs; order of the pairs fixes the
    /// mapping from random draws to values.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (T, f64)>,
        name: &'static str,
    ) -> Result<Self, ConfigError> {
        let (items, weights): (Vec<T>, Vec<f64>) = pairs.into_iter().unzip();
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::InvalidWeights(name));
        }
        let index = WeightedIndex::new(&weights).map_err(|_| ConfigError::InvalidWeights(name))?;
        Ok(Self { items, index })
    }

    pub fn from_map(map: &BTreeMap<T, f64>, name: &'static str) -> Result<Self, ConfigError>
    where
        T: Ord,
    {
        Self::from_pairs(map.iter().map(|(k, w)| (*k, *w)), name)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.items[self.index.sample(rng)]
    }
}

/// Pre-built weighted samplers for one run.
#[derive(Clone, Debug)]
pub struct Samplers {
    pub priority: Categorical<Priority>,
    pub status: Categorical<OrderStatus>,
    pub allocation: Categorical<AllocationStrategy>,
    pub hour: Categorical<u32>,
}

impl Samplers {
    pub fn from_params(params: &SimParams) -> Result<Self, ConfigError> {
        let o = &params.orders;
        let hours = (o.first_hour..).zip(o.hour_weights.iter().copied());
        Ok(Self {
            priority: Categorical::from_map(&o.priority_weights, "orders.priority_weights")?,
            status: Categorical::from_map(&o.status_weights, "orders.status_weights")?,
            allocation: Categorical::from_map(&o.allocation_weights, "orders.allocation_weights")?,
            hour: Categorical::from_pairs(hours, "orders.hour_weights")?,
        })
    }
}
