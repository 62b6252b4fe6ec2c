pub mod appmessage;
pub mod dispatch;
pub mod events;
pub mod location;
pub mod pipeline;
pub mod resolver;
pub mod settings;
pub mod trigger;
pub mod weather;
