use std::sync::OnceLock;

use filament_core::FilamentError;

/// Transforms template markup before it is parsed, e.g. to sanitize it.
pub trait MarkupPolicy: Send + Sync {
    fn create_html(&self, markup: &str) -> String;
}

static POLICY: OnceLock<Box<dyn MarkupPolicy>> = OnceLock::new();

/// Install the process-wide markup policy. It can only be set once.
pub fn set_markup_policy(policy: impl MarkupPolicy + 'static) -> Result<(), FilamentError> {
    POLICY
        .set(Box::new(policy))
        .map_err(|_| FilamentError::AlreadyConfigured("markup policy"))
}

pub(crate) fn apply_policy(markup: String) -> String {
    match POLICY.get() {
        Some(policy) => policy.create_html(&markup),
        None => markup,
    }
}
