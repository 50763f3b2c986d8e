pub mod status;
pub mod view;

pub use status::*;
pub use view::*;
