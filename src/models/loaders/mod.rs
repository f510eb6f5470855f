pub mod toml_loader;

pub use toml_loader::{load_all_plans, load_toml_to_plan};
