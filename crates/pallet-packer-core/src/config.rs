use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Packing and search configuration.
/// Key notes:
///   - pallet extents default to a Euro pallet footprint with a 1400 mm stack limit
///   - `stability` selects how the center-of-mass tolerance tightens as a pallet fills
///   - the evolutionary parameters are shared by every order in a batch run
///     Schedules for the lateral center-of-mass tolerance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StabilitySchedule {
    /// Tolerance steps down with the number of items already on the pallet.
    CountBased,
    /// Tolerance shrinks with the fill height, loosened for the first items.
    FillBased,
}

impl FromStr for StabilitySchedule {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" | "countbased" => Ok(Self::CountBased),
            "fill" | "fillbased" => Ok(Self::FillBased),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Pallet length in mm (X axis).
    pub pallet_length: f64,
    /// Pallet width in mm (Y axis).
    pub pallet_width: f64,
    /// Maximum stack height in mm (Z axis).
    pub pallet_max_height: f64,
    /// Allow 90° rotation about the vertical axis where beneficial.
    pub allow_rotation: bool,
    /// Base pallet budget per order; raised to `ceil(items / 50)` for large orders.
    pub base_max_pallets: usize,

    /// Center-of-mass tolerance schedule.
    #[serde(default = "default_stability")]
    pub stability: StabilitySchedule,

    // evolutionary search
    /// Initial population size (seed orderings plus random permutations).
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Survivors kept each generation (μ).
    #[serde(default = "default_survivors")]
    pub survivors: usize,
    /// Offspring generated each generation (λ).
    #[serde(default = "default_offspring")]
    pub offspring: usize,
    /// Probability of the single-point crossover branch.
    #[serde(default = "default_crossover_prob")]
    pub crossover_prob: f64,
    /// Probability of the clone-and-swap-mutate branch (complement of crossover).
    #[serde(default = "default_mutation_prob")]
    pub mutation_prob: f64,
    /// Hard generation limit.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop after this many generations without improvement.
    #[serde(default = "default_stagnation_limit")]
    pub stagnation_limit: usize,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            pallet_length: 1200.0,
            pallet_width: 800.0,
            pallet_max_height: 1400.0,
            allow_rotation: true,
            base_max_pallets: 5,
            stability: default_stability(),
            population_size: default_population_size(),
            survivors: default_survivors(),
            offspring: default_offspring(),
            crossover_prob: default_crossover_prob(),
            mutation_prob: default_mutation_prob(),
            max_generations: default_max_generations(),
            stagnation_limit: default_stagnation_limit(),
        }
    }
}

impl PackerConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Pallet extents are zero, negative, or non-finite
    /// - The evolutionary parameters cannot drive a search
    /// - Branch probabilities fall outside [0, 1]
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::PalletPackerError;

        let dims = [self.pallet_length, self.pallet_width, self.pallet_max_height];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(PalletPackerError::InvalidDimensions {
                length: self.pallet_length,
                width: self.pallet_width,
                height: self.pallet_max_height,
            });
        }

        if self.base_max_pallets == 0 {
            return Err(PalletPackerError::InvalidConfig(
                "base_max_pallets must be at least 1".into(),
            ));
        }

        if self.survivors < 2 {
            return Err(PalletPackerError::InvalidConfig(format!(
                "survivors ({}) must be at least 2 to sample parent pairs",
                self.survivors
            )));
        }

        if self.population_size < self.survivors {
            return Err(PalletPackerError::InvalidConfig(format!(
                "population_size ({}) must be >= survivors ({})",
                self.population_size, self.survivors
            )));
        }

        if self.offspring == 0 {
            return Err(PalletPackerError::InvalidConfig(
                "offspring must be at least 1".into(),
            ));
        }

        for (name, p) in [
            ("crossover_prob", self.crossover_prob),
            ("mutation_prob", self.mutation_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(PalletPackerError::InvalidConfig(format!(
                    "{name} ({p}) must lie in [0, 1]"
                )));
            }
        }

        if self.max_generations == 0 {
            return Err(PalletPackerError::InvalidConfig(
                "max_generations must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn pallet_volume(&self) -> f64 {
        self.pallet_length * self.pallet_width * self.pallet_max_height
    }
}

fn default_stability() -> StabilitySchedule {
    StabilitySchedule::CountBased
}
fn default_population_size() -> usize {
    100
}
fn default_survivors() -> usize {
    15
}
fn default_offspring() -> usize {
    30
}
fn default_crossover_prob() -> f64 {
    0.7
}
fn default_mutation_prob() -> f64 {
    0.3
}
fn default_max_generations() -> usize {
    30
}
fn default_stagnation_limit() -> usize {
    8
}

/// Builder for `PackerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn with_pallet_dimensions(mut self, length: f64, width: f64, max_height: f64) -> Self {
        self.cfg.pallet_length = length;
        self.cfg.pallet_width = width;
        self.cfg.pallet_max_height = max_height;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn base_max_pallets(mut self, v: usize) -> Self {
        self.cfg.base_max_pallets = v;
        self
    }
    pub fn stability(mut self, v: StabilitySchedule) -> Self {
        self.cfg.stability = v;
        self
    }
    pub fn population_size(mut self, v: usize) -> Self {
        self.cfg.population_size = v;
        self
    }
    pub fn survivors(mut self, v: usize) -> Self {
        self.cfg.survivors = v;
        self
    }
    pub fn offspring(mut self, v: usize) -> Self {
        self.cfg.offspring = v;
        self
    }
    pub fn crossover_prob(mut self, v: f64) -> Self {
        self.cfg.crossover_prob = v;
        self
    }
    pub fn mutation_prob(mut self, v: f64) -> Self {
        self.cfg.mutation_prob = v;
        self
    }
    pub fn max_generations(mut self, v: usize) -> Self {
        self.cfg.max_generations = v;
        self
    }
    pub fn stagnation_limit(mut self, v: usize) -> Self {
        self.cfg.stagnation_limit = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}

impl PackerConfig {
    /// Create a fluent builder for `PackerConfig`.
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }
}
