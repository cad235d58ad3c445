//! Commands of the modification chain.

mod format;
mod guards;
mod insert;

pub use format::{DiscardFormatCommand, FormatCommand};
pub use guards::{CheckDependencyPresent, CheckParentPackaging};
pub use insert::{CompositeDependencyManagement, SimpleDependencyManagement, SimpleInsert, SimpleUpgrade};

use pomkit_project::ProjectModel;

use crate::chain::Chain;

/// A fresh modification chain.
///
/// `DiscardFormatCommand` sits after `FormatCommand` so that, on the reverse
/// pass, it decides whether anything changed before formatting is restored.
pub fn modify_chain() -> Chain<ProjectModel> {
    Chain::new(vec![
        Box::new(CheckDependencyPresent),
        Box::new(CheckParentPackaging),
        Box::new(FormatCommand),
        Box::new(DiscardFormatCommand),
        Box::new(SimpleUpgrade),
        Box::new(SimpleDependencyManagement),
        Box::new(CompositeDependencyManagement),
        Box::new(SimpleInsert),
    ])
}
