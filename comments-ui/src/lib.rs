pub mod components;
pub mod effects;
pub mod interop;

pub use components::*;
pub use effects::*;
pub use interop::*;
