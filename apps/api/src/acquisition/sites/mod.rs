//! Concrete site adapters. Built-ins are looked up by name; `template`
//! adapters come from configuration.

pub mod bayt;
pub mod hire_lebanese;
pub mod jobs_for_lebanon;
pub mod template;

use std::sync::Arc;

use super::adapter::SiteAdapter;

pub use bayt::Bayt;
pub use hire_lebanese::HireLebanese;
pub use jobs_for_lebanon::JobsForLebanon;
pub use template::{TemplateAdapter, TemplateSource};

#[cfg(test)]
pub const BUILTIN_SOURCES: [&str; 3] = [JobsForLebanon::NAME, HireLebanese::NAME, Bayt::NAME];

/// Looks up a built-in adapter by its source name.
pub fn builtin(name: &str) -> Option<Arc<dyn SiteAdapter>> {
    match name {
        JobsForLebanon::NAME => Some(Arc::new(JobsForLebanon::new())),
        HireLebanese::NAME => Some(Arc::new(HireLebanese::new())),
        Bayt::NAME => Some(Arc::new(Bayt::new())),
        _ => None,
    }
}
