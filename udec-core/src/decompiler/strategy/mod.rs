//! Decompile strategies.
//!
//! Ordered, independent rewrite passes over a function's tree table. Each
//! strategy reads the current table and replaces zero or more whole tree
//! entries; strategies communicate only through the table. A pattern that
//! does not match is skipped for that node, never an error.

pub mod local_renumber;
pub mod local_substitution;
pub mod loop_breaker;
pub mod loop_finder;
pub mod tree_inliner;

use crate::decompiler::ir::function::Function;

/// A single rewrite pass over a function's tree table.
pub trait DecompileStrategy {
    fn name(&self) -> &'static str;

    /// Run the pass, replacing whole tree entries in the function's table.
    fn run(&self, function: &mut Function);
}

/// The standard pass sequence, in order.
pub fn default_pipeline() -> Vec<Box<dyn DecompileStrategy>> {
    vec![
        Box::new(local_renumber::LocalRenumberStrategy),
        Box::new(loop_finder::LoopFinderStrategy),
        Box::new(loop_breaker::LoopBreakerStrategy),
        Box::new(local_substitution::LocalSubstitutionStrategy),
        Box::new(tree_inliner::TreeInlinerStrategy),
    ]
}

/// Run the standard pass sequence and flatten any blocks the rewrites
/// nested along the way.
pub fn run_default_pipeline(function: &mut Function) {
    for strategy in default_pipeline() {
        log::debug!("running strategy: {}", strategy.name());
        strategy.run(function);
    }
    function.table.clean();
}
