pub mod albums;
pub mod assets;
pub mod maintenance;
pub mod mutations;
pub mod posts;
