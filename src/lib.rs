#[macro_use]
extern crate lazy_static;

pub mod permutation;
pub mod symmetry;
pub mod group;
pub mod combination;
pub mod configuration;
pub mod enumeration;
pub mod cache;
pub mod burnside;
pub mod config;
pub mod dispatch;
pub mod sites;
