pub mod ambito;
pub mod amount;
pub mod classify;
pub mod dolarhoy;
pub mod fetch;
pub mod types;
