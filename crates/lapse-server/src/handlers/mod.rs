pub mod cycle;
pub mod health;
pub mod subjects;
