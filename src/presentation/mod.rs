// Presentation layer - View models and the HTTP surface
pub mod app_state;
pub mod format;
pub mod handlers;
pub mod views;
