pub mod appmessage;
pub mod health;
