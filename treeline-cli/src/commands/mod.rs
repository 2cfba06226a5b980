pub mod export;
pub mod upgrade;
