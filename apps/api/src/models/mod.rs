pub mod screening;
pub mod settings;
