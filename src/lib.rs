#![no_std]

pub mod config;
pub mod control;
pub mod hardware;
pub mod mqtt;
pub mod network;
