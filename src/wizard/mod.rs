mod controller;
mod stage;

pub use controller::WizardController;
pub use stage::{Action, Stage};
