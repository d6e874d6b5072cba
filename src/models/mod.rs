pub mod slot;
pub mod workshop;
