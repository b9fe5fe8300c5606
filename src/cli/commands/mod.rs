pub mod api;
pub mod certificates;
pub mod contacts;
pub mod email;
pub mod registry;
