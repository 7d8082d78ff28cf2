pub mod health;
pub mod permissions;
pub mod positions;
pub mod staff;
