pub mod config;
pub mod head;
pub mod input;
pub mod messages;
pub mod motor;
pub mod pwm;
pub mod runtime;
pub mod selftest;
