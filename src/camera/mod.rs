pub mod client;
pub mod lifecycle;

pub use client::{CameraClient, ClientError};
pub use lifecycle::OnvifLifecycle;
