/// The three objective scores of an evaluated ordering.
///
/// `het` is minimized; `comp` and `vol` are maximized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fitness {
    pub het: f64,
    pub comp: f64,
    pub vol: f64,
}

impl Fitness {
    /// Pareto dominance: weakly better on all three objectives and strictly
    /// better on at least one.
    pub fn dominates(&self, other: &Fitness) -> bool {
        let weakly = self.het <= other.het && self.comp >= other.comp && self.vol >= other.vol;
        let strictly = self.het < other.het || self.comp > other.comp || self.vol > other.vol;
        weakly && strictly
    }

    /// Objective value along one axis, for crowding-distance sweeps.
    pub fn axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.het,
            1 => self.comp,
            _ => self.vol,
        }
    }

    /// Scalar used for stagnation tracking; lower is better.
    pub fn composite(&self) -> f64 {
        -self.vol - self.comp + self.het
    }
}

/// One search state: a permutation of the order's product types plus
/// NSGA-II bookkeeping. `genes` holds indices into the product table.
#[derive(Debug, Clone)]
pub struct Individual {
    pub genes: Vec<usize>,
    pub fitness: Option<Fitness>,
    pub valid: bool,
    pub rank: usize,
    pub crowding: f64,
}

impl Individual {
    pub fn new(genes: Vec<usize>) -> Self {
        Self {
            genes,
            fitness: None,
            valid: false,
            rank: usize::MAX,
            crowding: 0.0,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominance_needs_strict_improvement() {
        let a = Fitness {
            het: 0.5,
            comp: 0.5,
            vol: 0.5,
        };
        let same = a;
        assert!(!a.dominates(&same));

        let better_vol = Fitness { vol: 0.6, ..a };
        assert!(better_vol.dominates(&a));
        assert!(!a.dominates(&better_vol));
    }

    #[test]
    fn dominance_respects_objective_directions() {
        let a = Fitness {
            het: 0.5,
            comp: 0.5,
            vol: 0.5,
        };
        // Lower heterogeneity dominates; higher does not.
        let lower_het = Fitness { het: 0.4, ..a };
        assert!(lower_het.dominates(&a));
        let higher_het = Fitness { het: 0.6, ..a };
        assert!(!higher_het.dominates(&a));
    }

    #[test]
    fn incomparable_pair_has_no_dominance() {
        let a = Fitness {
            het: 0.4,
            comp: 0.5,
            vol: 0.5,
        };
        let b = Fitness {
            het: 0.5,
            comp: 0.6,
            vol: 0.5,
        };
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }
}
