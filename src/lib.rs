// ================================
// src/lib.rs
// ================================
pub mod config; // TOML settings, CONFIG_PATH
pub mod fingers; // finger state + markers
pub mod interactive; // interactive marker server
pub mod node;
pub mod stamp;
pub mod tf_static; // /tf_static broadcaster

pub use config::GripperConfig;
pub use fingers::{Finger, FingerAction, GripperFingers};
pub use interactive::{InteractiveMarkerServer, ServerState};
pub use node::GripperNode;
