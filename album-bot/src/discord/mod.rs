mod gateway;
mod rest;

pub use gateway::{DispatchState, Gateway};
pub use rest::DiscordClient;
