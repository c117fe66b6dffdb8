mod strategy;

pub use strategy::{ActiveStrategy, strategy_middleware};
