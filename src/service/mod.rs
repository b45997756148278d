pub mod absences;
pub mod analytics;
pub mod settings;
pub mod validation;
