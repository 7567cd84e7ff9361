// Domain layer - Widget configuration model and section layout
pub mod dashboard;
pub mod draft;
pub mod layout;
pub mod resize;
pub mod schema;
pub mod widget;
