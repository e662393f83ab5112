pub mod datatype;
pub mod entity;
pub mod repository;
pub mod transform;
