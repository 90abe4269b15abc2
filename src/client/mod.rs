//! External collaborators: market data, news, judgment, execution, index

pub mod clob;
pub mod gamma;
pub mod index;
pub mod judge;
pub mod news;

pub use clob::ClobClient;
pub use gamma::GammaClient;
pub use index::{IndexAllocation, IndexSource, IndexStatus, StaticIndexSource};
pub use judge::{Judge, JudgeClient, JudgeRequest};
pub use news::{NewsClient, NewsSignal, NewsSource};
