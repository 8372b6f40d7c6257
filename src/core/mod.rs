pub mod engine;
pub mod events;
pub mod modal;
pub mod model;
pub mod poller;
pub mod presenter;
pub mod selection;
pub mod status;
