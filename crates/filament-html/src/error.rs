use filament_core::FilamentError;
use filament_dom::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("malformed template markup: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Core(#[from] FilamentError),
}
