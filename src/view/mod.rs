pub mod opener;
pub mod primary;

pub use opener::OpenerRef;
pub use primary::{PrimaryView, PrimaryWindow};
