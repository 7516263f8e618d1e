use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::PackerConfig;
use crate::ga::evaluator::{Evaluation, Evaluator};
use crate::ga::individual::{Fitness, Individual};
use crate::ga::seeds::{seed_orderings, ProductSummary};
use crate::model::Item;

/// Minimum improvement of the composite objective that resets the
/// stagnation counter.
const IMPROVEMENT_EPS: f64 = 1e-4;

/// Outcome of one order's evolutionary search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Best valid individual found across all generations.
    pub best: Individual,
    /// Deterministic re-application of the best ordering to fresh pallets.
    pub evaluation: Evaluation,
    /// Generations actually run before the limit or stagnation stop.
    pub generations: usize,
}

/// μ+λ NSGA-II-style search over product orderings for a single order.
///
/// Three objectives: minimize heterogeneity, maximize compactness, maximize
/// volume utilization. Selection is elitist (non-dominated fronts plus
/// crowding distance); offspring come from single-point crossover or a
/// clone-and-swap mutation, exclusively.
pub struct Search<'a, R: Rng> {
    cfg: &'a PackerConfig,
    evaluator: Evaluator<'a>,
    products: &'a [ProductSummary],
    rng: R,
}

impl<'a, R: Rng> Search<'a, R> {
    pub fn new(
        cfg: &'a PackerConfig,
        products: &'a [ProductSummary],
        groups: &'a [Vec<Item>],
        budget: usize,
        rng: R,
    ) -> Self {
        Self {
            cfg,
            evaluator: Evaluator::new(cfg, groups, budget),
            products,
            rng,
        }
    }

    /// Runs the search; `None` when no ordering ever fits the pallet
    /// budget.
    pub fn run(mut self) -> Option<SearchOutcome> {
        let k = self.products.len();
        if k == 0 {
            return None;
        }

        let mut population = self.initial_population(k);
        self.evaluate_all(&mut population);

        let mut incumbent: Option<Individual> = None;
        let mut best_composite = f64::INFINITY;
        update_incumbent(&population, &mut incumbent, &mut best_composite);

        let mut stagnation = 0usize;
        let mut generations = 0usize;

        for gen in 0..self.cfg.max_generations {
            generations = gen + 1;

            assign_fronts_and_crowding(&mut population);
            let survivors = select_survivors(population, self.cfg.survivors);
            let offspring = self.make_offspring(&survivors, k);

            population = survivors;
            population.extend(offspring);
            self.evaluate_all(&mut population);

            let improved = update_incumbent(&population, &mut incumbent, &mut best_composite);
            if improved {
                stagnation = 0;
            } else {
                stagnation += 1;
                if stagnation >= self.cfg.stagnation_limit {
                    debug!(generation = gen, "search stagnated");
                    break;
                }
            }
        }

        let best = incumbent?;
        // Re-apply the winning ordering to fresh pallets rather than trusting
        // any state retained during the search.
        let evaluation = self.evaluator.evaluate(&best.genes);
        debug_assert!(evaluation.valid);
        Some(SearchOutcome {
            best,
            evaluation,
            generations,
        })
    }

    /// Ten heuristic seeds plus uniform-random permutations up to the
    /// configured population size. Duplicates are allowed.
    fn initial_population(&mut self, k: usize) -> Vec<Individual> {
        let mut population: Vec<Individual> = seed_orderings(self.products)
            .into_iter()
            .map(Individual::new)
            .collect();
        while population.len() < self.cfg.population_size {
            let mut genes: Vec<usize> = (0..k).collect();
            genes.shuffle(&mut self.rng);
            population.push(Individual::new(genes));
        }
        population
    }

    fn evaluate_all(&mut self, population: &mut [Individual]) {
        for ind in population.iter_mut().filter(|i| !i.is_evaluated()) {
            let eval = self.evaluator.evaluate(&ind.genes);
            ind.valid = eval.valid;
            ind.fitness = Some(eval.fitness);
        }
    }

    /// λ children from the survivor pool: with `crossover_prob` a
    /// single-point crossover of two parents, otherwise a clone of one
    /// parent with two positions swapped. The branches are exclusive.
    fn make_offspring(&mut self, survivors: &[Individual], k: usize) -> Vec<Individual> {
        let mut offspring = Vec::with_capacity(self.cfg.offspring);
        while offspring.len() < self.cfg.offspring {
            let genes = if k >= 2 && self.rng.gen::<f64>() < self.cfg.crossover_prob {
                let a = &survivors[self.rng.gen_range(0..survivors.len())];
                let b = &survivors[self.rng.gen_range(0..survivors.len())];
                crossover(&a.genes, &b.genes, self.rng.gen_range(1..k))
            } else {
                let parent = &survivors[self.rng.gen_range(0..survivors.len())];
                let mut genes = parent.genes.clone();
                if k >= 2 {
                    let i = self.rng.gen_range(0..k);
                    let j = self.rng.gen_range(0..k);
                    genes.swap(i, j);
                }
                genes
            };
            offspring.push(Individual::new(genes));
        }
        offspring
    }
}

/// Child = parent1's prefix up to `point`, then parent2's remaining genes in
/// parent2's order.
fn crossover(parent1: &[usize], parent2: &[usize], point: usize) -> Vec<usize> {
    let mut child: Vec<usize> = parent1[..point].to_vec();
    child.extend(parent2.iter().copied().filter(|g| !parent1[..point].contains(g)));
    child
}

/// The incumbent is the valid individual maximizing volume utilization,
/// breaking ties by compactness descending, then heterogeneity ascending.
/// Returns whether the composite objective improved meaningfully.
fn update_incumbent(
    population: &[Individual],
    incumbent: &mut Option<Individual>,
    best_composite: &mut f64,
) -> bool {
    let mut improved = false;
    for ind in population.iter().filter(|i| i.valid) {
        let fit = ind.fitness.expect("valid individuals are evaluated");
        let replace = match incumbent.as_ref().and_then(|b| b.fitness) {
            None => true,
            Some(best) => {
                fit.vol > best.vol
                    || (fit.vol == best.vol
                        && (fit.comp > best.comp
                            || (fit.comp == best.comp && fit.het < best.het)))
            }
        };
        if replace {
            *incumbent = Some(ind.clone());
        }
        if *best_composite - fit.composite() >= IMPROVEMENT_EPS {
            *best_composite = fit.composite();
            improved = true;
        }
    }
    improved
}

/// Classical O(M·N²) front partition. Invalid individuals are assigned a
/// terminal front dominated by every valid one; they receive no crowding.
fn assign_fronts_and_crowding(population: &mut [Individual]) {
    let valid_idx: Vec<usize> = (0..population.len())
        .filter(|&i| population[i].valid)
        .collect();

    let fitness: Vec<Fitness> = valid_idx
        .iter()
        .map(|&i| population[i].fitness.expect("evaluated"))
        .collect();

    let n = valid_idx.len();
    let mut dominated_by: Vec<usize> = vec![0; n];
    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if fitness[i].dominates(&fitness[j]) {
                dominates[i].push(j);
                dominated_by[j] += 1;
            } else if fitness[j].dominates(&fitness[i]) {
                dominates[j].push(i);
                dominated_by[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_by[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominates[i] {
                dominated_by[j] -= 1;
                if dominated_by[j] == 0 {
                    next.push(j);
                }
            }
        }
        fronts.push(std::mem::take(&mut current));
        current = next;
    }

    for (rank, front) in fronts.iter().enumerate() {
        let crowding = crowding_distances(front, &fitness);
        for (pos, &i) in front.iter().enumerate() {
            let idx = valid_idx[i];
            population[idx].rank = rank;
            population[idx].crowding = crowding[pos];
        }
    }

    let terminal = fronts.len();
    for ind in population.iter_mut().filter(|i| !i.valid) {
        ind.rank = terminal;
        ind.crowding = 0.0;
    }
}

/// Per-front crowding distance summed over the three objective axes.
/// Boundary individuals get +∞; interior ones accumulate normalized gaps.
fn crowding_distances(front: &[usize], fitness: &[Fitness]) -> Vec<f64> {
    let len = front.len();
    let mut crowding = vec![0.0f64; len];
    if len <= 2 {
        return vec![f64::INFINITY; len];
    }
    for axis in 0..3 {
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| {
            fitness[front[a]]
                .axis(axis)
                .total_cmp(&fitness[front[b]].axis(axis))
        });
        let low = fitness[front[order[0]]].axis(axis);
        let high = fitness[front[order[len - 1]]].axis(axis);
        let range = high - low;
        crowding[order[0]] = f64::INFINITY;
        crowding[order[len - 1]] = f64::INFINITY;
        if range > 0.0 {
            for w in 1..len - 1 {
                let prev = fitness[front[order[w - 1]]].axis(axis);
                let next = fitness[front[order[w + 1]]].axis(axis);
                crowding[order[w]] += (next - prev) / range;
            }
        }
    }
    crowding
}

/// Elitist μ-selection: whole fronts while they fit, then the overflow front
/// by descending crowding distance.
fn select_survivors(mut population: Vec<Individual>, mu: usize) -> Vec<Individual> {
    population.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| b.crowding.total_cmp(&a.crowding))
    });
    population.truncate(mu);
    population
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(het: f64, comp: f64, vol: f64) -> Fitness {
        Fitness { het, comp, vol }
    }

    fn evaluated(genes: Vec<usize>, fitness: Fitness, valid: bool) -> Individual {
        let mut ind = Individual::new(genes);
        ind.fitness = Some(fitness);
        ind.valid = valid;
        ind
    }

    #[test]
    fn crossover_preserves_permutation() {
        let p1 = vec![0, 1, 2, 3, 4];
        let p2 = vec![4, 3, 2, 1, 0];
        for point in 1..5 {
            let child = crossover(&p1, &p2, point);
            let mut sorted = child.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            assert_eq!(&child[..point], &p1[..point]);
        }
    }

    #[test]
    fn crossover_keeps_parent2_relative_order() {
        let p1 = vec![0, 1, 2, 3];
        let p2 = vec![3, 2, 1, 0];
        let child = crossover(&p1, &p2, 2);
        // Remaining genes {2, 3} appear in parent2's order: 3 before 2.
        assert_eq!(child, vec![0, 1, 3, 2]);
    }

    #[test]
    fn fronts_partition_by_dominance() {
        let mut pop = vec![
            evaluated(vec![0], fit(0.2, 0.8, 0.9), true),
            evaluated(vec![0], fit(0.2, 0.8, 0.5), true),
            evaluated(vec![0], fit(0.9, 0.1, 0.1), true),
        ];
        assign_fronts_and_crowding(&mut pop);
        assert_eq!(pop[0].rank, 0);
        assert_eq!(pop[1].rank, 1);
        // Dominated by both others on every axis.
        assert_eq!(pop[2].rank, 2);
    }

    #[test]
    fn invalid_individuals_fall_to_terminal_front() {
        let mut pop = vec![
            evaluated(vec![0], fit(0.5, 0.5, 0.5), true),
            evaluated(vec![0], crate::ga::evaluator::WORST_FITNESS, false),
        ];
        assign_fronts_and_crowding(&mut pop);
        assert!(pop[1].rank > pop[0].rank);
    }

    #[test]
    fn boundary_individuals_get_infinite_crowding() {
        let front = vec![0, 1, 2];
        let fitness = vec![
            fit(0.1, 0.1, 0.1),
            fit(0.5, 0.5, 0.5),
            fit(0.9, 0.9, 0.9),
        ];
        let crowd = crowding_distances(&front, &fitness);
        assert!(crowd[0].is_infinite());
        assert!(crowd[2].is_infinite());
        assert!(crowd[1].is_finite());
        // Middle gap spans the full range on each axis.
        assert!((crowd[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn survivors_prefer_lower_rank_then_higher_crowding() {
        let mut a = evaluated(vec![0], fit(0.1, 0.9, 0.9), true);
        a.rank = 0;
        a.crowding = 1.0;
        let mut b = evaluated(vec![1], fit(0.2, 0.8, 0.8), true);
        b.rank = 0;
        b.crowding = 2.0;
        let mut c = evaluated(vec![2], fit(0.3, 0.7, 0.7), true);
        c.rank = 1;
        c.crowding = f64::INFINITY;

        let survivors = select_survivors(vec![a, b, c], 2);
        assert_eq!(survivors[0].genes, vec![1]);
        assert_eq!(survivors[1].genes, vec![0]);
    }

    #[test]
    fn incumbent_breaks_ties_by_comp_then_het() {
        let pop = vec![
            evaluated(vec![0], fit(0.5, 0.5, 0.9), true),
            evaluated(vec![1], fit(0.5, 0.7, 0.9), true),
            evaluated(vec![2], fit(0.3, 0.7, 0.9), true),
        ];
        let mut incumbent = None;
        let mut best = f64::INFINITY;
        update_incumbent(&pop, &mut incumbent, &mut best);
        assert_eq!(incumbent.unwrap().genes, vec![2]);
    }
}
