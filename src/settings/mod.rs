// Settings module

pub mod settings;

pub use settings::AppSettings;
