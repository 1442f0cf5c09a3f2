// HTTP routes
pub mod health;
pub mod query;
pub mod reports;
pub mod status;
pub mod stream;

pub use health::*;
pub use query::*;
pub use reports::*;
pub use status::*;
pub use stream::*;
