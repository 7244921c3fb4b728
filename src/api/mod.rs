// Thin namespace wrapper for API-layer components
pub mod app {
    pub use crate::app::*;
}

pub mod auth {
    pub use crate::auth::*;
}

pub mod handlers {
    pub use crate::handlers::*;
}
