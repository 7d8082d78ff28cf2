pub mod permission;
pub mod position;
pub mod staff;
pub mod staff_permission;
