pub mod accessor;
pub mod camera;
pub mod config;
pub mod onvif;
pub mod validator;
