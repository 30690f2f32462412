pub mod json_api;

pub use json_api::{
    handle_request_json, Command, CommandRequest, CommandResponse, CommandResult,
    NotificationView, PlayerView, StateView,
};
