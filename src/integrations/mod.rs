//! Delivery destinations.

pub mod delivery {
    pub use crate::delivery::*;
}

pub mod google_auth {
    pub use crate::google_auth::*;
}

pub mod notion_client {
    pub use crate::notion_client::*;
}

pub mod sheets_client {
    pub use crate::sheets_client::*;
}

pub mod webhook_client {
    pub use crate::webhook_client::*;
}
