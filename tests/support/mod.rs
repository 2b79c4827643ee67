#![allow(dead_code)]

pub mod agent;
pub mod memory;
pub mod opportunity;
pub mod runtime;
pub mod selector;
pub mod strategy;
