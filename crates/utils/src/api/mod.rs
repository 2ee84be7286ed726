pub mod oauth;
pub mod users;
