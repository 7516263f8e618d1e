pub mod evaluator;
pub mod individual;
pub mod nsga2;
pub mod seeds;

pub use evaluator::{Evaluation, Evaluator};
pub use individual::{Fitness, Individual};
pub use nsga2::{Search, SearchOutcome};
pub use seeds::{seed_orderings, summarize_products, ProductSummary};
