pub mod cleaning;
pub mod data;
pub mod features;
pub mod model;
pub mod teams;
