pub mod details;
pub mod filters;
pub mod loaders;
pub mod paper;
pub mod plan;
pub mod question;

pub use details::PaperDetails;
pub use filters::Filters;
pub use loaders::{load_all_plans, load_toml_to_plan};
pub use paper::{Paper, PaperItem};
pub use plan::{PaperPlan, PlanEntry, PlanStep};
pub use question::{Question, QuestionKind};
