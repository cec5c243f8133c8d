pub mod backup;
pub mod failover;
pub mod health;
pub mod state;
pub mod validate;
