pub mod config;
pub mod control;
pub mod latest;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod session;
pub mod vision;

#[cfg(test)]
mod testing;
