pub mod generate;
pub mod health;
pub mod history;
pub mod metrics;
