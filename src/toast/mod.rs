//! Per-toast lifecycle: display roles and the controller that owns a
//! toast's timer, flags and transitions.

mod controller;
mod role;

pub use controller::{ControllerDeps, Phase, ToastController, ToastProps, ToastState};
pub use role::{Placement, role_for};
