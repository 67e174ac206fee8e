pub mod activities;
pub mod clients;
pub mod health;
pub mod schedule;
